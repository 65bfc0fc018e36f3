use std::collections::BTreeSet;

use proptest::prelude::*;
use redblack::{
    Color, DataIndex, RedBlackTree, RedBlackTreeError, RedBlackTreeReadOperationsHelpers,
    TreeReadOperations, TreeWriteOperations, NIL,
};

fn tree_from(values: &[i32]) -> RedBlackTree<i32> {
    let mut tree: RedBlackTree<i32> = RedBlackTree::new();
    for value in values {
        tree.insert(*value).unwrap();
    }
    tree
}

fn root_color(tree: &RedBlackTree<i32>) -> Color {
    tree.get_color::<i32>(tree.get_root_index())
}

fn child_colors(tree: &RedBlackTree<i32>) -> (Color, Color) {
    let root_index: DataIndex = tree.get_root_index();
    (
        tree.get_color::<i32>(tree.get_left_index::<i32>(root_index)),
        tree.get_color::<i32>(tree.get_right_index::<i32>(root_index)),
    )
}

/// Walks the subtree at index and checks order, links and coloring. Returns
/// the black height of the subtree.
fn check_subtree(
    tree: &RedBlackTree<i32>,
    index: DataIndex,
    lower: Option<i32>,
    upper: Option<i32>,
    values: &mut Vec<i32>,
) -> usize {
    if index == NIL {
        return 0;
    }
    let value: i32 = *tree.get_value::<i32>(index);
    if let Some(lower) = lower {
        assert!(lower < value);
    }
    if let Some(upper) = upper {
        assert!(value < upper);
    }

    let left_index: DataIndex = tree.get_left_index::<i32>(index);
    let right_index: DataIndex = tree.get_right_index::<i32>(index);
    if left_index != NIL {
        assert_eq!(tree.get_parent_index::<i32>(left_index), index);
        assert!(tree.is_left_child::<i32>(left_index));
    }
    if right_index != NIL {
        assert_eq!(tree.get_parent_index::<i32>(right_index), index);
        assert!(tree.is_right_child::<i32>(right_index));
    }

    let color: Color = tree.get_color::<i32>(index);
    if color == Color::Red {
        assert_eq!(tree.get_color::<i32>(left_index), Color::Black);
        assert_eq!(tree.get_color::<i32>(right_index), Color::Black);
    }

    let left_height: usize = check_subtree(tree, left_index, lower, Some(value), values);
    values.push(value);
    let right_height: usize = check_subtree(tree, right_index, Some(value), upper, values);
    assert_eq!(left_height, right_height);

    left_height + usize::from(color == Color::Black)
}

/// Checks every tree invariant and returns the values in order.
fn check_tree(tree: &RedBlackTree<i32>) -> Vec<i32> {
    let mut values: Vec<i32> = Vec::new();
    let root_index: DataIndex = tree.get_root_index();
    if root_index == NIL {
        assert!(tree.is_empty());
        return values;
    }
    assert_eq!(root_color(tree), Color::Black);
    assert_eq!(tree.get_parent_index::<i32>(root_index), NIL);
    check_subtree(tree, root_index, None, None, &mut values);
    values
}

/// Renders the tree breadth first from the node links alone.
fn level_order(tree: &RedBlackTree<i32>) -> String {
    let mut rows: Vec<Vec<DataIndex>> = Vec::new();
    let mut row: Vec<DataIndex> = vec![tree.get_root_index()];
    row.retain(|index| *index != NIL);
    while !row.is_empty() {
        let next: Vec<DataIndex> = row
            .iter()
            .flat_map(|index| {
                [
                    tree.get_left_index::<i32>(*index),
                    tree.get_right_index::<i32>(*index),
                ]
            })
            .filter(|index| *index != NIL)
            .collect();
        rows.push(row);
        row = next;
    }

    let listed: Vec<String> = rows
        .iter()
        .flatten()
        .map(|index| tree.get_value::<i32>(*index).to_string())
        .collect();
    format!("[{}]", listed.join(", "))
}

#[test]
fn test_uncle_red_recolors() {
    let tree: RedBlackTree<i32> = tree_from(&[23, 41, 7, 6]);
    assert_eq!(root_color(&tree), Color::Black);
    assert_eq!(child_colors(&tree), (Color::Black, Color::Black));
    let left_index: DataIndex = tree.get_left_index::<i32>(tree.get_root_index());
    assert_eq!(
        tree.get_color::<i32>(tree.get_left_index::<i32>(left_index)),
        Color::Red
    );
    assert_eq!(tree.to_string(), "[23, 7, 41, 6]");
    check_tree(&tree);
}

#[test]
fn test_left_left_rotates_right() {
    let tree: RedBlackTree<i32> = tree_from(&[69, 33, 31]);
    assert_eq!(root_color(&tree), Color::Black);
    assert_eq!(child_colors(&tree), (Color::Red, Color::Red));
    assert_eq!(tree.to_string(), "[33, 31, 69]");
    check_tree(&tree);
}

#[test]
fn test_left_right_rotates_twice() {
    let tree: RedBlackTree<i32> = tree_from(&[69, 33, 43]);
    assert_eq!(root_color(&tree), Color::Black);
    assert_eq!(child_colors(&tree), (Color::Red, Color::Red));
    assert_eq!(tree.to_string(), "[43, 33, 69]");
    check_tree(&tree);
}

#[test]
fn test_right_right_rotates_left() {
    let tree: RedBlackTree<i32> = tree_from(&[33, 43, 53]);
    assert_eq!(root_color(&tree), Color::Black);
    assert_eq!(child_colors(&tree), (Color::Red, Color::Red));
    assert_eq!(tree.to_string(), "[43, 33, 53]");
    check_tree(&tree);
}

#[test]
fn test_empty_tree_renders_brackets() {
    let tree: RedBlackTree<i32> = RedBlackTree::new();
    assert_eq!(tree.to_string(), "[]");
    assert!(check_tree(&tree).is_empty());
}

#[test]
fn test_rejections_leave_tree_unchanged() {
    let mut tree: RedBlackTree<i32> = tree_from(&[23, 41, 7, 6]);
    let before: String = tree.to_string();
    let root_before: DataIndex = tree.get_root_index();

    assert_eq!(tree.insert(41), Err(RedBlackTreeError::DuplicateValue));
    assert_eq!(tree.insert_option(Some(6)), Err(RedBlackTreeError::DuplicateValue));
    assert_eq!(tree.insert_option(None), Err(RedBlackTreeError::NullValue));

    assert_eq!(tree.to_string(), before);
    assert_eq!(tree.get_root_index(), root_before);
    assert_eq!(check_tree(&tree), vec![6, 7, 23, 41]);
}

#[test]
fn test_public_rotate_rejects_unrelated_nodes() {
    let mut tree: RedBlackTree<i32> = tree_from(&[23, 41, 7, 6]);
    let index_6: DataIndex = tree.lookup_index(&6);
    let index_23: DataIndex = tree.lookup_index(&23);
    let index_41: DataIndex = tree.lookup_index(&41);

    assert_eq!(tree.rotate(index_6, index_23), Err(RedBlackTreeError::InvalidRotation));
    assert_eq!(tree.rotate(index_6, index_41), Err(RedBlackTreeError::InvalidRotation));

    tree.rotate(index_41, index_23).unwrap();
    assert_eq!(tree.get_root_index(), index_41);
    assert_eq!(tree.to_string(), "[41, 23, 7, 6]");
    assert_eq!(tree.get_parent_index::<i32>(index_23), index_41);
}

#[test]
fn test_rotate_rejects_handles_off_node_boundaries() {
    let mut tree: RedBlackTree<i32> = tree_from(&[23, 41, 7, 6]);
    let before: String = tree.to_string();
    let root_index: DataIndex = tree.get_root_index();

    assert_eq!(tree.rotate(3, root_index), Err(RedBlackTreeError::InvalidRotation));
    assert_eq!(tree.rotate(root_index, 3), Err(RedBlackTreeError::InvalidRotation));
    assert_eq!(tree.rotate(NIL, root_index), Err(RedBlackTreeError::InvalidRotation));
    assert_eq!(tree.rotate(4_000, root_index), Err(RedBlackTreeError::InvalidRotation));
    assert_eq!(tree.to_string(), before);

    tree.insert(99).unwrap();
    assert_eq!(check_tree(&tree), vec![6, 7, 23, 41, 99]);
}

proptest! {
    #[test]
    fn prop_insert_keeps_invariants(values in prop::collection::vec(any::<i32>(), 0..300)) {
        let mut tree: RedBlackTree<i32> = RedBlackTree::new();
        let mut model: BTreeSet<i32> = BTreeSet::new();

        for value in values {
            let result: Result<(), RedBlackTreeError> = tree.insert(value);
            if model.insert(value) {
                prop_assert_eq!(result, Ok(()));
            } else {
                prop_assert_eq!(result, Err(RedBlackTreeError::DuplicateValue));
            }
            prop_assert_eq!(root_color(&tree), Color::Black);
        }

        let in_order: Vec<i32> = check_tree(&tree);
        prop_assert_eq!(in_order, model.iter().copied().collect::<Vec<i32>>());
        for value in model.iter() {
            prop_assert!(tree.contains(value));
        }
    }

    #[test]
    fn prop_display_matches_level_order(
        values in prop::collection::btree_set(-1000i32..1000, 1..100)
            .prop_map(|set| set.into_iter().collect::<Vec<i32>>())
            .prop_shuffle()
    ) {
        let tree: RedBlackTree<i32> = tree_from(&values);

        let rendered: String = tree.to_string();
        prop_assert_eq!(&rendered, &tree.to_string());
        prop_assert_eq!(&rendered, &level_order(&tree));

        let mut sorted: Vec<i32> = values.clone();
        sorted.sort();
        prop_assert_eq!(check_tree(&tree), sorted);
    }
}
