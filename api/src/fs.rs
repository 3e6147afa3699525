//! The traits a mounted volume implements, one per operational seam:
//! mounting and formatting, raw block primitives, file operations and
//! directory operations. Each earlier trait is a supertrait of the later
//! ones, so a full filesystem implements all four.
//!
//! The trait docs below are the behavioral contract of the filesystem; the
//! engine crate provides the single implementation, and the tests are
//! written against these descriptions.

use super::{
    controller::Device,
    types::{Block, EntryInfo, Listing},
};
use std::{error, path::Path};

/// Mounting, formatting and persistence control.
///
/// A volume owns the complete image: the FAT, the directory table, the
/// block store and the cursor marking the current directory. Every
/// mutating operation of the subtraits updates the in-memory image first
/// and then commits it to the backing device as one full rewrite; read
/// operations touch only the in-memory image.
pub trait VolumeSupport: Sized {
    /// The error type of the implementation. All operations of the
    /// subtraits report failures through this type.
    type Error: error::Error;

    /// Create a fresh volume at `path`: an all-FREE FAT, a directory
    /// table holding only the root (name `/`, parent −1), a zeroed block
    /// store, and the cursor on the root. The formatted image is committed
    /// before this returns. Errors if the backing file already exists.
    fn format<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>;

    /// Adopt the image held by an existing `Device`. The device geometry
    /// must match the canonical layout. A malformed root record (slot 0
    /// not named `/` or with a parent) is reported as a warning, not an
    /// error; the image is adopted as-is. The cursor starts at the root
    /// regardless of where a previous session left it.
    fn mount(dev: Device) -> Result<Self, Self::Error>;

    /// Open the image at `path`, formatting when the file is absent and
    /// mounting when it is present. This is what a session calls at
    /// startup; a failure here is fatal to the caller.
    fn open<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error>;

    /// Unmount the volume, thereby consuming it.
    /// Returns the `Device` backing it.
    fn unmount(self) -> Device;

    /// Reformat in place: every FAT entry back to FREE, every directory
    /// slot zeroed, the block store filled with the `0xFF` sentinel, and
    /// the root reinstalled as in [`format`](VolumeSupport::format).
    /// Commits the rewritten image.
    fn partition(&mut self) -> Result<(), Self::Error>;
}

/// Raw block primitives, operating below the file layer.
pub trait BlockSupport: VolumeSupport {
    /// Read block `i` of the data region out of the in-memory image.
    /// Errors if `i` is out of range. The returned [`Block`] also reports
    /// its trailing free bytes for dump purposes.
    fn read_block(&self, i: u64) -> Result<Block, Self::Error>;

    /// Place raw data into block `i`. The target block must currently be
    /// FREE (else the operation fails), and `content` must fit in one
    /// block. The block is zeroed, the content copied in, and the block's
    /// FAT entry set to the end-of-chain marker — the block then belongs
    /// to no file; it is a raw data placement.
    fn write_block(&mut self, i: u64, content: &[u8]) -> Result<(), Self::Error>;
}

/// Operations on the files of the current directory.
///
/// All name lookups are linear scans of the current directory; names are
/// unique within one directory across files and child directories
/// combined. Every write-side operation commits the image on success, and
/// also after the documented partial writes.
pub trait FileSupport: BlockSupport {
    /// Create a file named `name`. Fails when the current directory is
    /// full, when the name is already taken, when the name is malformed,
    /// or when no free block is left. The new file always owns one block;
    /// at most the first block's worth of `content` is stored, and the
    /// size records what was stored. Longer initial content belongs to
    /// [`write`](FileSupport::write).
    fn create(&mut self, name: &str, content: &[u8]) -> Result<(), Self::Error>;

    /// Overwrite the file's content with `content`, growing or shrinking
    /// its chain as needed. Fails upfront when `content` exceeds the
    /// maximum file size. When the volume runs out of blocks mid-write,
    /// the bytes written so far are kept, the size is set to that count,
    /// the image is committed, and the out-of-space failure is reported.
    fn write(&mut self, name: &str, content: &[u8]) -> Result<(), Self::Error>;

    /// Append `content` at the end of the file. The whole request is
    /// admitted or refused upfront against the maximum file size; an
    /// out-of-space failure mid-append keeps and commits the partial
    /// write, advancing the size by the bytes actually written.
    fn append(&mut self, name: &str, content: &[u8]) -> Result<(), Self::Error>;

    /// Shrink the file to `new_size` bytes. Growing is not supported and
    /// fails. The kept tail block is zeroed beyond the new size, and the
    /// blocks past it return to the free pool. Truncating to 0 keeps the
    /// start block, zeroed.
    fn truncate(&mut self, name: &str, new_size: u64) -> Result<(), Self::Error>;

    /// Read the file's full content. Walks the chain until `size` bytes
    /// are emitted, stopping early at end-of-chain — a short chain is a
    /// consistency violation that reads tolerate.
    fn read(&self, name: &str) -> Result<Vec<u8>, Self::Error>;

    /// Delete the named entry. A child directory is deleted recursively
    /// (post-order, every contained file's chain returned to the free
    /// pool); a file's chain is freed and its slot removed. Removal
    /// preserves the order of the remaining entries.
    fn remove(&mut self, name: &str) -> Result<(), Self::Error>;

    /// Rename a file or child directory. Fails when `new` is already
    /// taken in the current directory, malformed, or when `old` does not
    /// exist.
    fn rename(&mut self, old: &str, new: &str) -> Result<(), Self::Error>;

    /// Move the file named `name` into the child directory named `dir`.
    /// Both are resolved in the current directory. The file record moves
    /// by value; the FAT chain and blocks are untouched. Fails when the
    /// target is full or already holds the name.
    fn move_file(&mut self, name: &str, dir: &str) -> Result<(), Self::Error>;

    /// Metadata for the named file or child directory.
    fn stat(&self, name: &str) -> Result<EntryInfo, Self::Error>;
}

/// Operations on the directory tree itself.
pub trait DirSupport: FileSupport {
    /// Create a child directory in the current directory. Fails when the
    /// name is taken (by a file or a child), malformed, or when the
    /// directory table is exhausted. Directory slots are allocated at a
    /// monotonically increasing watermark and never reclaimed.
    fn mkdir(&mut self, name: &str) -> Result<(), Self::Error>;

    /// Change the current directory. `".."` moves to the parent and fails
    /// (non-fatally) at the root; any other name is looked up among the
    /// children. Single-component only; there is no path traversal.
    fn cd(&mut self, name: &str) -> Result<(), Self::Error>;

    /// List the current directory: child directories first, then files
    /// with their sizes. Non-mutating.
    fn list(&self) -> Result<Listing, Self::Error>;
}
