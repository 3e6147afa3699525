//! In-memory mirror of the data-block region: `MAX_BLOCKS` blocks of
//! `BLOCK_SIZE` bytes, addressed as (block, offset) pairs. Reads never
//! touch the backing device; the persistence layer copies the whole
//! region in and out during loads and commits.

use fatsim_api::types::{BLOCK_SIZE, DISK_SIZE};

/// The data blocks of the volume, as one flat allocation.
#[derive(Clone, PartialEq, Eq)]
pub struct BlockStore {
    data: Vec<u8>,
}

impl BlockStore {
    /// A zeroed store.
    pub fn new() -> BlockStore {
        BlockStore {
            data: vec![0; DISK_SIZE],
        }
    }

    /// Adopt the data region read from an image. The caller guarantees the
    /// length.
    pub fn from_raw(data: Vec<u8>) -> BlockStore {
        debug_assert_eq!(data.len(), DISK_SIZE);
        BlockStore { data }
    }

    /// The whole region, for persistence.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// A byte range inside one block.
    pub fn read(&self, block: u32, offset: usize, len: usize) -> &[u8] {
        debug_assert!(offset + len <= BLOCK_SIZE);
        let base = block as usize * BLOCK_SIZE + offset;
        &self.data[base..base + len]
    }

    /// The full contents of one block.
    pub fn block(&self, block: u32) -> &[u8] {
        self.read(block, 0, BLOCK_SIZE)
    }

    /// Copy `data` into one block at `offset`. The range must fit in the
    /// block.
    pub fn write(&mut self, block: u32, offset: usize, data: &[u8]) {
        debug_assert!(offset + data.len() <= BLOCK_SIZE);
        let base = block as usize * BLOCK_SIZE + offset;
        self.data[base..base + data.len()].copy_from_slice(data);
    }

    /// Zero one block.
    pub fn zero_block(&mut self, block: u32) {
        self.zero_tail(block, 0);
    }

    /// Zero one block from `offset` to its end.
    pub fn zero_tail(&mut self, block: u32, offset: usize) {
        debug_assert!(offset <= BLOCK_SIZE);
        let base = block as usize * BLOCK_SIZE;
        for b in self.data[base + offset..base + BLOCK_SIZE].iter_mut() {
            *b = 0;
        }
    }

    /// Fill the entire store with `byte`. Used by the reformat operation
    /// to stamp a sentinel over old contents.
    pub fn fill(&mut self, byte: u8) {
        for b in self.data.iter_mut() {
            *b = byte;
        }
    }
}

impl Default for BlockStore {
    fn default() -> BlockStore {
        BlockStore::new()
    }
}

// A custom Debug that does not dump 64 MiB into test failures.
impl std::fmt::Debug for BlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "BlockStore({} bytes)", self.data.len())
    }
}
