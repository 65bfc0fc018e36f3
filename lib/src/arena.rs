use std::mem::{align_of, size_of};

use bytemuck::{Pod, Zeroable};

use crate::{get_mut_helper, trace, DataIndex, Get, RedBlackTreeError, NIL};

const WORD_BYTES: usize = 16;

/// Backing storage unit. Its alignment is what lets any node slot be viewed
/// as a typed node through bytemuck.
#[derive(Default, Copy, Clone)]
#[repr(C, align(16))]
struct ArenaWord([u8; WORD_BYTES]);
unsafe impl Zeroable for ArenaWord {}
unsafe impl Pod for ArenaWord {}

// NodeArena is an append only region of fixed size blocks. Blocks are handed
// out in order and never returned, so the block at index i * size_of::<T>()
// is the i-th allocation.
pub struct NodeArena<T: Get> {
    /// Aligned words that hold all of the blocks.
    words: Vec<ArenaWord>,
    /// Index in data where the next block will be placed.
    next_index: DataIndex,

    /// Placeholder for holding the block type.
    phantom: std::marker::PhantomData<T>,
}

impl<T: Get> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Get> NodeArena<T> {
    // Evaluated when new() is instantiated for T, so an over aligned block
    // type fails to build instead of failing on first access.
    const BLOCK_ALIGN_FITS: () = assert!(
        align_of::<T>() <= WORD_BYTES,
        "block alignment exceeds arena word alignment"
    );

    /// Blocks must not need more than 16 byte alignment.
    ///
    /// ```compile_fail
    /// #[derive(Clone, Copy)]
    /// #[repr(C, align(32))]
    /// struct Wide([u8; 32]);
    /// unsafe impl bytemuck::Zeroable for Wide {}
    /// unsafe impl bytemuck::Pod for Wide {}
    /// impl redblack::Get for Wide {}
    ///
    /// let _arena: redblack::NodeArena<Wide> = redblack::NodeArena::new();
    /// ```
    pub fn new() -> Self {
        let () = Self::BLOCK_ALIGN_FITS;
        NodeArena {
            words: Vec::new(),
            next_index: 0,
            phantom: std::marker::PhantomData,
        }
    }

    /// Bytes currently holding blocks.
    pub fn data(&self) -> &[u8] {
        &bytemuck::cast_slice::<ArenaWord, u8>(&self.words)[..self.next_index as usize]
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        let end: usize = self.next_index as usize;
        &mut bytemuck::cast_slice_mut::<ArenaWord, u8>(&mut self.words)[..end]
    }

    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    /// Number of blocks handed out so far.
    pub fn num_blocks(&self) -> usize {
        self.next_index as usize / size_of::<T>()
    }

    /// Store a block at the end of the arena and return where it lives.
    pub fn allocate(&mut self, block: T) -> Result<DataIndex, RedBlackTreeError> {
        let index: usize = self.next_index as usize;
        let end: usize = index + size_of::<T>();
        if end >= NIL as usize {
            return Err(RedBlackTreeError::ArenaFull);
        }

        let num_words: usize = end.div_ceil(WORD_BYTES);
        if num_words > self.words.len() {
            let target: usize = num_words.max(self.words.len() * 2);
            self.words.resize(target, ArenaWord::zeroed());
        }

        let index: DataIndex = self.next_index;
        self.next_index = end as DataIndex;
        *get_mut_helper::<T>(self.data_mut(), index) = block;
        trace!("ARENA allocate {index}");
        Ok(index)
    }
}
