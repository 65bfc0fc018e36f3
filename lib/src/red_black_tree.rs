use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use std::{
    cmp::Ordering,
    collections::VecDeque,
    fmt::{self, Display},
    mem::size_of,
};

use crate::{
    get_helper, get_mut_helper, is_nil, is_not_nil, trace, DataIndex, Get, NodeArena, Payload,
    RedBlackTreeError, TreeReadOperations, TreeWriteOperations, NIL,
};

pub const RBTREE_OVERHEAD_BYTES: usize = 16;

// Overview of all the structs and traits in this file. Skips some internal helpers.
//
// Public
//  struct RedBlackTree<V: Payload>
//    fn new() -> Self
//    GetRedBlackTreeReadOnlyData
//    TreeReadOperations
//    TreeWriteOperations
//    Display (level order)
//  trait GetRedBlackTreeReadOnlyData
//    fn data(&self) -> &[u8];
//    fn root_index(&self) -> DataIndex;
//    RedBlackTreeReadOperationsHelpers
//    TreeReadOperations
//    RedBlackTreeTestHelpers
//  trait RedBlackTreeReadOperationsHelpers
//    fn get_node<V: Payload>(&self, index: DataIndex) -> &RBNode<V>;
//    fn get_value<V: Payload>(&self, index: DataIndex) -> &V;
//    fn has_left<V: Payload>(&self, index: DataIndex) -> bool;
//    fn has_right<V: Payload>(&self, index: DataIndex) -> bool;
//    fn get_left_index<V: Payload>(&self, index: DataIndex) -> DataIndex;
//    fn get_right_index<V: Payload>(&self, index: DataIndex) -> DataIndex;
//    fn get_parent_index<V: Payload>(&self, index: DataIndex) -> DataIndex;
//    fn get_color<V: Payload>(&self, index: DataIndex) -> Color;
//    fn is_left_child<V: Payload>(&self, index: DataIndex) -> bool;
//    fn is_right_child<V: Payload>(&self, index: DataIndex) -> bool;
//    fn get_sibling_index<V: Payload>(&self, index: DataIndex, parent_index: DataIndex)
//  struct RBNode<V>
//    fn new(value: V) -> Self
//    fn get_value(&self) -> &V
//    fn get_color(&self) -> Color
//    fn set_color(&mut self, color: Color)
//  enum Color
//
// Internal
//  trait GetRedBlackTreeData
//    fn data_mut(&mut self) -> &mut [u8];
//    fn set_root_index(&mut self, root_index: DataIndex);
//    RedBlackTreeWriteOperationsHelpers
//  trait RedBlackTreeWriteOperationsHelpers
//    fn set_color<V: Payload>(&mut self, index: DataIndex, color: Color);
//    fn set_parent_index<V: Payload>(&mut self, index: DataIndex, parent_index: DataIndex);
//    fn set_left_index<V: Payload>(&mut self, index: DataIndex, left_index: DataIndex);
//    fn set_right_index<V: Payload>(&mut self, index: DataIndex, right_index: DataIndex);
//    fn rotate_left<V: Payload>(&mut self, index: DataIndex);
//    fn rotate_right<V: Payload>(&mut self, index: DataIndex);
// trait RedBlackTreeTestHelpers (test only)
//    fn depth<V: Payload>(&self, index: DataIndex) -> i32;
//    fn debug_print<V: Payload>(&self);
//    fn verify_rb_tree<V: Payload>(&self);
//    fn num_black_nodes_through_root<V: Payload>(&self, index: DataIndex) -> i32;

/// A Red-Black tree of unique values which supports insert O(log n) and
/// lookup O(log n). Nodes live in an arena owned by the tree and are
/// addressed by their byte offset in it. Nodes are never removed.
///
/// The payload size must be a multiple of 4 bytes so that a node carries no
/// padding. Smaller payloads are rejected when the tree is built.
///
/// ```compile_fail
/// use redblack::RedBlackTree;
///
/// let _tree: RedBlackTree<u16> = RedBlackTree::new();
/// ```
///
/// Links and colors can only be changed through insert and rotate.
///
/// ```compile_fail
/// use redblack::{GetRedBlackTreeData, RedBlackTree};
///
/// let mut tree: RedBlackTree<i32> = RedBlackTree::new();
/// tree.set_root_index(3);
/// ```
pub struct RedBlackTree<V: Payload> {
    /// The address within data that the root node starts. NIL when empty.
    root_index: DataIndex,
    /// Owned storage for every node that was ever inserted.
    nodes: NodeArena<RBNode<V>>,
}

impl<V: Payload> Default for RedBlackTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

// Specific to red black trees and not all data structures. Implementing this
// gets a lot of other stuff for free.
pub trait GetRedBlackTreeReadOnlyData {
    fn data(&self) -> &[u8];
    fn root_index(&self) -> DataIndex;
}

impl<V: Payload> GetRedBlackTreeReadOnlyData for RedBlackTree<V> {
    fn data(&self) -> &[u8] {
        self.nodes.data()
    }
    fn root_index(&self) -> DataIndex {
        self.root_index
    }
}

// Write access to the arena and root. Kept inside the crate so that only
// insert and rotate can relink nodes.
pub(crate) trait GetRedBlackTreeData {
    fn data_mut(&mut self) -> &mut [u8];
    fn set_root_index(&mut self, root_index: DataIndex);
}

impl<V: Payload> GetRedBlackTreeData for RedBlackTree<V> {
    fn data_mut(&mut self) -> &mut [u8] {
        self.nodes.data_mut()
    }
    fn set_root_index(&mut self, root_index: DataIndex) {
        self.root_index = root_index;
    }
}

pub trait RedBlackTreeReadOperationsHelpers {
    fn get_node<V: Payload>(&self, index: DataIndex) -> &RBNode<V>;
    fn get_value<V: Payload>(&self, index: DataIndex) -> &V;
    fn has_left<V: Payload>(&self, index: DataIndex) -> bool;
    fn has_right<V: Payload>(&self, index: DataIndex) -> bool;
    fn get_left_index<V: Payload>(&self, index: DataIndex) -> DataIndex;
    fn get_right_index<V: Payload>(&self, index: DataIndex) -> DataIndex;
    fn get_parent_index<V: Payload>(&self, index: DataIndex) -> DataIndex;
    fn get_color<V: Payload>(&self, index: DataIndex) -> Color;
    fn is_left_child<V: Payload>(&self, index: DataIndex) -> bool;
    fn is_right_child<V: Payload>(&self, index: DataIndex) -> bool;
    fn get_sibling_index<V: Payload>(&self, index: DataIndex, parent_index: DataIndex)
        -> DataIndex;
}

impl<T> RedBlackTreeReadOperationsHelpers for T
where
    T: GetRedBlackTreeReadOnlyData,
{
    fn get_node<V: Payload>(&self, index: DataIndex) -> &RBNode<V> {
        debug_assert_ne!(index, NIL);
        get_helper::<RBNode<V>>(self.data(), index)
    }
    fn get_value<V: Payload>(&self, index: DataIndex) -> &V {
        debug_assert_ne!(index, NIL);
        let node: &RBNode<V> = get_helper::<RBNode<V>>(self.data(), index);
        &node.value
    }
    fn has_left<V: Payload>(&self, index: DataIndex) -> bool {
        debug_assert_ne!(index, NIL);
        let node: &RBNode<V> = get_helper::<RBNode<V>>(self.data(), index);
        node.left != NIL
    }
    fn has_right<V: Payload>(&self, index: DataIndex) -> bool {
        debug_assert_ne!(index, NIL);
        let node: &RBNode<V> = get_helper::<RBNode<V>>(self.data(), index);
        node.right != NIL
    }
    fn get_left_index<V: Payload>(&self, index: DataIndex) -> DataIndex {
        if index == NIL {
            return NIL;
        }
        let node: &RBNode<V> = get_helper::<RBNode<V>>(self.data(), index);
        node.left
    }
    fn get_right_index<V: Payload>(&self, index: DataIndex) -> DataIndex {
        if index == NIL {
            return NIL;
        }
        let node: &RBNode<V> = get_helper::<RBNode<V>>(self.data(), index);
        node.right
    }
    fn get_parent_index<V: Payload>(&self, index: DataIndex) -> DataIndex {
        if index == NIL {
            return NIL;
        }
        let node: &RBNode<V> = get_helper::<RBNode<V>>(self.data(), index);
        node.parent
    }
    /// Absent nodes count as Black.
    fn get_color<V: Payload>(&self, index: DataIndex) -> Color {
        if index == NIL {
            return Color::Black;
        }
        let node: &RBNode<V> = get_helper::<RBNode<V>>(self.data(), index);
        node.color
    }

    fn is_left_child<V: Payload>(&self, index: DataIndex) -> bool {
        let parent_index: DataIndex = self.get_parent_index::<V>(index);
        if parent_index == NIL {
            return false;
        }
        self.get_left_index::<V>(parent_index) == index
    }
    fn is_right_child<V: Payload>(&self, index: DataIndex) -> bool {
        let parent_index: DataIndex = self.get_parent_index::<V>(index);
        if parent_index == NIL {
            return false;
        }
        self.get_right_index::<V>(parent_index) == index
    }

    fn get_sibling_index<V: Payload>(
        &self,
        index: DataIndex,
        parent_index: DataIndex,
    ) -> DataIndex {
        debug_assert_ne!(parent_index, NIL);
        let parent_left_child_index: DataIndex = self.get_left_index::<V>(parent_index);
        if parent_left_child_index == index {
            self.get_right_index::<V>(parent_index)
        } else {
            parent_left_child_index
        }
    }
}

pub(crate) trait RedBlackTreeWriteOperationsHelpers {
    fn set_color<V: Payload>(&mut self, index: DataIndex, color: Color);
    fn set_parent_index<V: Payload>(&mut self, index: DataIndex, parent_index: DataIndex);
    fn set_left_index<V: Payload>(&mut self, index: DataIndex, left_index: DataIndex);
    fn set_right_index<V: Payload>(&mut self, index: DataIndex, right_index: DataIndex);
    fn rotate_left<V: Payload>(&mut self, index: DataIndex);
    fn rotate_right<V: Payload>(&mut self, index: DataIndex);
}

impl<T> RedBlackTreeWriteOperationsHelpers for T
where
    T: GetRedBlackTreeData + RedBlackTreeReadOperationsHelpers + GetRedBlackTreeReadOnlyData,
{
    fn set_color<V: Payload>(&mut self, index: DataIndex, color: Color) {
        if index == NIL {
            return;
        }
        let node: &mut RBNode<V> = get_mut_helper::<RBNode<V>>(self.data_mut(), index);
        node.color = color;
    }
    fn set_parent_index<V: Payload>(&mut self, index: DataIndex, parent_index: DataIndex) {
        if index == NIL {
            return;
        }
        let node: &mut RBNode<V> = get_mut_helper::<RBNode<V>>(self.data_mut(), index);
        node.parent = parent_index;
    }
    fn set_left_index<V: Payload>(&mut self, index: DataIndex, left_index: DataIndex) {
        if index == NIL {
            return;
        }
        let node: &mut RBNode<V> = get_mut_helper::<RBNode<V>>(self.data_mut(), index);
        node.left = left_index;
    }
    fn set_right_index<V: Payload>(&mut self, index: DataIndex, right_index: DataIndex) {
        if index == NIL {
            return;
        }
        let node: &mut RBNode<V> = get_mut_helper::<RBNode<V>>(self.data_mut(), index);
        node.right = right_index;
    }

    fn rotate_left<V: Payload>(&mut self, index: DataIndex) {
        // Left rotate of G
        //
        //         GG                     GG
        //         |                      |
        //         G                      P
        //       /   \                  /   \
        //      U     P     --->      G      X
        //          /   \           /   \
        //        Y      X        U       Y

        let g_index: DataIndex = index;
        let p_index: DataIndex = self.get_right_index::<V>(g_index);
        let y_index: DataIndex = self.get_left_index::<V>(p_index);
        let gg_index: DataIndex = self.get_parent_index::<V>(index);
        trace!("TREE rotate left G={g_index} P={p_index} Y={y_index} GG={gg_index}");

        // P
        {
            // Does not use the helpers to avoid redundant NIL checks.
            let p_node: &mut RBNode<V> = get_mut_helper::<RBNode<V>>(self.data_mut(), p_index);
            p_node.parent = gg_index;
            p_node.left = g_index;
        }

        // Y
        self.set_parent_index::<V>(y_index, g_index);

        // G
        {
            let g_node: &mut RBNode<V> = get_mut_helper::<RBNode<V>>(self.data_mut(), g_index);
            g_node.parent = p_index;
            g_node.right = y_index;
        }

        // GG
        if gg_index != NIL {
            if self.get_left_index::<V>(gg_index) == g_index {
                self.set_left_index::<V>(gg_index, p_index);
            } else {
                self.set_right_index::<V>(gg_index, p_index);
            }
        }

        // Root
        if self.root_index() == g_index {
            trace!("TREE root {g_index}->{p_index}");
            self.set_root_index(p_index);
        }
    }

    fn rotate_right<V: Payload>(&mut self, index: DataIndex) {
        // Right rotate of G
        //
        //         GG                     GG
        //         |                      |
        //         G                      P
        //       /   \                  /   \
        //      P     U     --->      X       G
        //    /  \                          /   \
        //  X     Y                       Y       U

        let g_index: DataIndex = index;
        let p_index: DataIndex = self.get_left_index::<V>(g_index);
        let y_index: DataIndex = self.get_right_index::<V>(p_index);
        let gg_index: DataIndex = self.get_parent_index::<V>(index);
        trace!("TREE rotate right G={g_index} P={p_index} Y={y_index} GG={gg_index}");

        // P
        {
            let p_node: &mut RBNode<V> = get_mut_helper::<RBNode<V>>(self.data_mut(), p_index);
            p_node.parent = gg_index;
            p_node.right = g_index;
        }

        // Y
        self.set_parent_index::<V>(y_index, g_index);

        // G
        {
            let g_node: &mut RBNode<V> = get_mut_helper::<RBNode<V>>(self.data_mut(), g_index);
            g_node.parent = p_index;
            g_node.left = y_index;
        }

        // GG
        if gg_index != NIL {
            if self.get_left_index::<V>(gg_index) == g_index {
                self.set_left_index::<V>(gg_index, p_index);
            } else {
                self.set_right_index::<V>(gg_index, p_index);
            }
        }

        // Root
        if self.root_index() == g_index {
            trace!("TREE root {g_index}->{p_index}");
            self.set_root_index(p_index);
        }
    }
}

impl<V: Payload> TreeReadOperations<V> for RedBlackTree<V> {
    /// Get the current root index.
    fn get_root_index(&self) -> DataIndex {
        self.root_index
    }

    fn is_empty(&self) -> bool {
        is_nil!(self.root_index)
    }

    /// Lookup the index of a given value.
    fn lookup_index(&self, value: &V) -> DataIndex {
        let mut current_index: DataIndex = self.root_index;
        while is_not_nil!(current_index) {
            let current_value: &V = self.get_value::<V>(current_index);
            current_index = match value.cmp(current_value) {
                Ordering::Less => self.get_left_index::<V>(current_index),
                Ordering::Greater => self.get_right_index::<V>(current_index),
                Ordering::Equal => return current_index,
            };
        }
        NIL
    }

    fn contains(&self, value: &V) -> bool {
        is_not_nil!(self.lookup_index(value))
    }

    fn lookup_max_index(&self) -> DataIndex {
        let mut current_index: DataIndex = self.root_index;
        if current_index == NIL {
            return NIL;
        }
        loop {
            let right_index: DataIndex = self.get_right_index::<V>(current_index);
            if right_index == NIL {
                return current_index;
            }
            current_index = right_index;
        }
    }

    fn lookup_min_index(&self) -> DataIndex {
        let mut current_index: DataIndex = self.root_index;
        if current_index == NIL {
            return NIL;
        }
        loop {
            let left_index: DataIndex = self.get_left_index::<V>(current_index);
            if left_index == NIL {
                return current_index;
            }
            current_index = left_index;
        }
    }
}

#[cfg(test)]
pub trait RedBlackTreeTestHelpers {
    fn depth<V: Payload>(&self, index: DataIndex) -> i32;
    fn debug_print<V: Payload>(&self);
    fn verify_rb_tree<V: Payload>(&self);
    fn num_black_nodes_through_root<V: Payload>(&self, index: DataIndex) -> i32;
}

#[cfg(test)]
impl<T> RedBlackTreeTestHelpers for T
where
    T: GetRedBlackTreeReadOnlyData,
{
    // Only used in printing, so can be slow
    fn depth<V: Payload>(&self, index: DataIndex) -> i32 {
        let mut depth = -1;
        let mut current_index: DataIndex = index;
        while current_index != NIL {
            current_index = self.get_parent_index::<V>(current_index);
            depth += 1;
        }
        depth
    }

    fn debug_print<V: Payload>(&self) {
        trace!("====== RedBlackTree ======");

        // Pre-order, right subtree first so that the output reads like the
        // tree turned on its side.
        let mut stack: Vec<DataIndex> = Vec::new();
        if is_not_nil!(self.root_index()) {
            stack.push(self.root_index());
        }
        while let Some(index) = stack.pop() {
            let node: &RBNode<V> = self.get_node::<V>(index);
            let mut row_str: String = String::new();

            row_str += &"  ".repeat(self.depth::<V>(index) as usize);
            row_str += if node.parent == NIL {
                "- "
            } else if self.is_left_child::<V>(index) {
                "└ "
            } else {
                "┌ "
            };

            let color: char = if node.color == Color::Black { 'B' } else { 'R' };
            row_str += &format!("{color}:{index}:{node}");
            trace!("{}", row_str);

            if is_not_nil!(node.left) {
                stack.push(node.left);
            }
            if is_not_nil!(node.right) {
                stack.push(node.right);
            }
        }

        trace!("==========================");
    }

    fn verify_rb_tree<V: Payload>(&self) {
        let root_index: DataIndex = self.root_index();
        if root_index == NIL {
            return;
        }
        assert_eq!(self.get_color::<V>(root_index), Color::Black);
        assert_eq!(self.get_parent_index::<V>(root_index), NIL);

        // Verify that all nodes missing a child have the same number of black
        // nodes to the root.
        let mut num_black: Option<i32> = None;

        // Node with the exclusive bounds its value must fall between.
        let mut stack: Vec<(DataIndex, Option<V>, Option<V>)> = vec![(root_index, None, None)];
        while let Some((index, lower, upper)) = stack.pop() {
            let node: &RBNode<V> = self.get_node::<V>(index);

            if let Some(lower) = lower {
                assert!(lower < node.value, "{} is not above {}", node.value, lower);
            }
            if let Some(upper) = upper {
                assert!(node.value < upper, "{} is not below {}", node.value, upper);
            }

            // Verify that all red nodes only have black children
            if node.color == Color::Red {
                assert_eq!(self.get_color::<V>(node.left), Color::Black);
                assert_eq!(self.get_color::<V>(node.right), Color::Black);
            }

            if node.left == NIL || node.right == NIL {
                let through_root: i32 = self.num_black_nodes_through_root::<V>(index);
                match num_black {
                    Some(num_black) => assert_eq!(num_black, through_root),
                    None => num_black = Some(through_root),
                }
            }

            if node.left != NIL {
                assert_eq!(self.get_parent_index::<V>(node.left), index);
                stack.push((node.left, lower, Some(node.value)));
            }
            if node.right != NIL {
                assert_eq!(self.get_parent_index::<V>(node.right), index);
                stack.push((node.right, Some(node.value), upper));
            }
        }
    }

    fn num_black_nodes_through_root<V: Payload>(&self, index: DataIndex) -> i32 {
        let mut num_black_nodes: i32 = 0;
        let mut current_index: DataIndex = index;

        while current_index != NIL {
            if self.get_color::<V>(current_index) == Color::Black {
                num_black_nodes += 1;
            }
            current_index = self.get_parent_index::<V>(current_index);
        }
        num_black_nodes
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    Black = 0,
    Red = 1,
}
unsafe impl Zeroable for Color {
    fn zeroed() -> Self {
        unsafe { core::mem::zeroed() }
    }
}

#[derive(Debug, Copy, Clone, Zeroable)]
#[repr(C)]
/// Node in a RedBlack tree. The first 16 bytes are used for maintaining the
/// RedBlack and BST properties, the rest is the value. The value must fill
/// whole 4 byte words, otherwise the node would end in padding.
pub struct RBNode<V> {
    pub(crate) left: DataIndex,
    pub(crate) right: DataIndex,
    pub(crate) parent: DataIndex,
    pub(crate) color: Color,

    pub(crate) _unused_padding: [u8; 3],
    pub(crate) value: V,
}
unsafe impl<V: Payload> Pod for RBNode<V> {}
impl<V: Payload> Get for RBNode<V> {}

const_assert_eq!(size_of::<RBNode<()>>(), RBTREE_OVERHEAD_BYTES);

impl<V: Payload> Ord for RBNode<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.value).cmp(&(other.value))
    }
}

impl<V: Payload> PartialOrd for RBNode<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V: Payload> PartialEq for RBNode<V> {
    fn eq(&self, other: &Self) -> bool {
        (self.value) == (other.value)
    }
}

impl<V: Payload> Eq for RBNode<V> {}

impl<V: Payload> Display for RBNode<V> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.value)
    }
}

impl<V: Payload> RBNode<V> {
    // Pod views of a node must never expose uninitialized padding bytes.
    const NO_PADDING: () = assert!(
        size_of::<RBNode<V>>() == RBTREE_OVERHEAD_BYTES + size_of::<V>(),
        "payload size must be a multiple of 4 bytes"
    );

    /// A detached node. New nodes start Red.
    pub fn new(value: V) -> Self {
        let () = Self::NO_PADDING;
        RBNode {
            left: NIL,
            right: NIL,
            parent: NIL,
            color: Color::Red,
            _unused_padding: [0; 3],
            value,
        }
    }
    pub fn get_value(&self) -> &V {
        &self.value
    }
    pub fn get_color(&self) -> Color {
        self.color
    }
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }
    pub fn is_black(&self) -> bool {
        self.color == Color::Black
    }
    pub fn is_red(&self) -> bool {
        self.color == Color::Red
    }
    pub fn get_left_index(&self) -> DataIndex {
        self.left
    }
    pub fn get_right_index(&self) -> DataIndex {
        self.right
    }
    pub fn get_parent_index(&self) -> DataIndex {
        self.parent
    }
}

impl<V: Payload> TreeWriteOperations<V> for RedBlackTree<V> {
    /// Insert and rebalance. Rejects duplicate values without touching the
    /// tree.
    fn insert(&mut self, value: V) -> Result<(), RedBlackTreeError> {
        trace!("TREE insert {value}");

        // Case where this is now the root
        if is_nil!(self.root_index) {
            let mut root_node: RBNode<V> = RBNode::new(value);
            root_node.set_color(Color::Black);
            self.root_index = self.nodes.allocate(root_node)?;
            return Ok(());
        }

        // Case where we walk the tree to add then will go back and fix coloring
        let new_node: RBNode<V> = RBNode::new(value);
        let (parent_index, side) = self.find_insert_position(&new_node)?;
        let index: DataIndex = self.nodes.allocate(new_node)?;

        self.set_parent_index::<V>(index, parent_index);
        if side == Ordering::Less {
            self.set_left_index::<V>(parent_index, index);
        } else {
            self.set_right_index::<V>(parent_index, index);
        }

        // A new Red leaf under a Black parent breaks nothing.
        if self.get_color::<V>(parent_index) == Color::Red {
            // Avoid recursion by doing a loop here.
            let mut node_to_fix: DataIndex = index;
            loop {
                node_to_fix = self.insert_fix(node_to_fix)?;
                if is_nil!(node_to_fix) {
                    break;
                }
            }
        }

        let root_index: DataIndex = self.root_index;
        self.set_color::<V>(root_index, Color::Black);

        #[cfg(test)]
        self.verify_rb_tree::<V>();

        Ok(())
    }

    /// Move child into the position of parent. Right rotation when child is
    /// the left child, left rotation when it is the right child. Colors are
    /// left alone.
    fn rotate(&mut self, child: DataIndex, parent: DataIndex) -> Result<(), RedBlackTreeError> {
        if !self.is_node_index(child)
            || !self.is_node_index(parent)
            || self.get_parent_index::<V>(child) != parent
        {
            return Err(RedBlackTreeError::InvalidRotation);
        }

        if self.get_left_index::<V>(parent) == child {
            self.rotate_right::<V>(parent);
        } else if self.get_right_index::<V>(parent) == child {
            self.rotate_left::<V>(parent);
        } else {
            return Err(RedBlackTreeError::InvalidRotation);
        }
        Ok(())
    }
}

impl<V: Payload> RedBlackTree<V> {
    pub fn new() -> Self {
        let () = RBNode::<V>::NO_PADDING;
        RedBlackTree::<V> {
            root_index: NIL,
            nodes: NodeArena::new(),
        }
    }

    /// Whether index addresses a node in this tree's arena.
    fn is_node_index(&self, index: DataIndex) -> bool {
        is_not_nil!(index)
            && (index as usize) < self.nodes.data().len()
            && (index as usize) % size_of::<RBNode<V>>() == 0
    }

    /// Walk down from the root to the empty slot where node_to_insert
    /// belongs. Returns the parent of that slot and which side it is on.
    fn find_insert_position(
        &self,
        node_to_insert: &RBNode<V>,
    ) -> Result<(DataIndex, Ordering), RedBlackTreeError> {
        let mut current_parent_index: DataIndex = self.root_index;
        loop {
            let current_parent: &RBNode<V> = self.get_node::<V>(current_parent_index);
            let side: Ordering = node_to_insert.cmp(current_parent);
            let next_index: DataIndex = match side {
                Ordering::Less => current_parent.get_left_index(),
                Ordering::Greater => current_parent.get_right_index(),
                Ordering::Equal => {
                    trace!("TREE duplicate at {current_parent_index}");
                    return Err(RedBlackTreeError::DuplicateValue);
                }
            };
            if is_nil!(next_index) {
                return Ok((current_parent_index, side));
            }
            current_parent_index = next_index;
        }
    }

    /// Repair a Red node sitting under a Red parent. Returns the next node
    /// that needs repair or NIL when done.
    fn insert_fix(&mut self, index_to_fix: DataIndex) -> Result<DataIndex, RedBlackTreeError> {
        // Caller forces the root Black.
        if self.root_index == index_to_fix {
            return Ok(NIL);
        }

        let parent_index: DataIndex = self.get_parent_index::<V>(index_to_fix);
        if self.get_color::<V>(parent_index) == Color::Black {
            return Ok(NIL);
        }

        // Parent is Red so it cannot be the root.
        let grandparent_index: DataIndex = self.get_parent_index::<V>(parent_index);
        debug_assert_ne!(grandparent_index, NIL);

        let uncle_index: DataIndex = self.get_sibling_index::<V>(parent_index, grandparent_index);
        let uncle_color: Color = self.get_color::<V>(uncle_index);

        trace!("FIX uncle index={uncle_index} color={uncle_color:?}");

        // Case 1: Uncle is red. Push the red up and try again two levels higher.
        if uncle_color == Color::Red {
            self.set_color::<V>(parent_index, Color::Black);
            self.set_color::<V>(uncle_index, Color::Black);
            self.set_color::<V>(grandparent_index, Color::Red);

            return Ok(grandparent_index);
        }

        let parent_is_left: bool = self.is_left_child::<V>(parent_index);
        let current_is_left: bool = self.is_left_child::<V>(index_to_fix);

        trace!("FIX G={grandparent_index} P={parent_index} Pi={parent_is_left} Ci={current_is_left}");

        match (current_is_left, parent_is_left) {
            // Case 2.1: Uncle is black, left left
            (true, true) => {
                self.rotate(parent_index, grandparent_index)?;
                self.set_color::<V>(parent_index, Color::Black);
                self.set_color::<V>(grandparent_index, Color::Red);
            }
            // Case 2.2: Uncle is black, left right
            (false, true) => {
                self.rotate(index_to_fix, parent_index)?;
                self.rotate(index_to_fix, grandparent_index)?;
                self.set_color::<V>(index_to_fix, Color::Black);
                self.set_color::<V>(grandparent_index, Color::Red);
            }
            // Case 2.3: Uncle is black, right right
            (false, false) => {
                self.rotate(parent_index, grandparent_index)?;
                self.set_color::<V>(parent_index, Color::Black);
                self.set_color::<V>(grandparent_index, Color::Red);
            }
            // Case 2.4: Uncle is black, right left
            (true, false) => {
                self.rotate(index_to_fix, parent_index)?;
                self.rotate(index_to_fix, grandparent_index)?;
                self.set_color::<V>(index_to_fix, Color::Black);
                self.set_color::<V>(grandparent_index, Color::Red);
            }
        }
        Ok(NIL)
    }
}

/// Level order, left before right: "[v1, v2, v3]". An empty tree is "[]".
impl<V: Payload> Display for RedBlackTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut queue: VecDeque<DataIndex> = VecDeque::new();
        if is_not_nil!(self.root_index) {
            queue.push_back(self.root_index);
        }
        let mut first: bool = true;
        while let Some(index) = queue.pop_front() {
            let node: &RBNode<V> = self.get_node::<V>(index);
            if is_not_nil!(node.left) {
                queue.push_back(node.left);
            }
            if is_not_nil!(node.right) {
                queue.push_back(node.right);
            }
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", node.value)?;
            first = false;
        }
        write!(f, "]")
    }
}
