use std::fmt::Display;

use bytemuck::{Pod, Zeroable};

use crate::{DataIndex, RedBlackTreeError};

/// Handle that does not point at any node. Stands in for an absent parent,
/// child or root.
pub const NIL: DataIndex = DataIndex::MAX;

#[macro_export]
macro_rules! is_nil {
    ($v: expr) => {
        $v == NIL
    };
}

#[macro_export]
macro_rules! is_not_nil {
    ($v: expr) => {
        $v != NIL
    };
}

pub trait Payload: Zeroable + Pod + PartialOrd + Ord + PartialEq + Eq + Display {}
impl<T: Zeroable + Pod + PartialOrd + Ord + PartialEq + Eq + Display> Payload for T {}

// Point queries over an ordered tree. Read and write operations are separate
// traits so that read only code does not need a mutable tree.
pub trait TreeReadOperations<V: Payload> {
    fn get_root_index(&self) -> DataIndex;
    fn is_empty(&self) -> bool;
    fn lookup_index(&self, value: &V) -> DataIndex;
    fn contains(&self, value: &V) -> bool;
    fn lookup_max_index(&self) -> DataIndex;
    fn lookup_min_index(&self) -> DataIndex;
}

pub trait TreeWriteOperations<V: Payload> {
    fn insert(&mut self, value: V) -> Result<(), RedBlackTreeError>;
    fn rotate(&mut self, child: DataIndex, parent: DataIndex) -> Result<(), RedBlackTreeError>;

    /// Insert where the value may be absent. None is rejected with NullValue
    /// and leaves the tree as it was.
    fn insert_option(&mut self, value: Option<V>) -> Result<(), RedBlackTreeError> {
        self.insert(value.ok_or(RedBlackTreeError::NullValue)?)
    }
}
