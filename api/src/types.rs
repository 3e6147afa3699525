//! Types shared between the device layer and the filesystem engine:
//! canonical volume constants, the buffer/block abstractions, the on-disk
//! record types and the image layout derived from them.
//!
//! The image is a single contiguous snapshot:
//!
//! ```text
//! 0                 FAT            MAX_BLOCKS x i32
//! FAT_REGION_SIZE   dir count      i32
//! DIR_TABLE_OFFSET  directories    MAX_DIRECTORIES x DirectoryRecord
//! DATA_OFFSET       block store    MAX_BLOCKS x BLOCK_SIZE
//! ```
//!
//! All integers are little-endian. Records are written with `bincode`'s
//! legacy encoding (fixed-size integers, little-endian), with the wide
//! arrays going through [`serde_fixed`](../serde_fixed/index.html) so that
//! no length prefixes appear on disk. The total image size is stable and
//! independent of contents.

use super::error;
use super::error::APIError;
use lazy_static::lazy_static;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::prelude::*;
use std::io::{Cursor, SeekFrom};

/// Size of the simulated disk in bytes (the data-block region only).
pub const DISK_SIZE: usize = 64 * 1024 * 1024;
/// Size of one block in bytes.
pub const BLOCK_SIZE: usize = 1024;
/// Number of blocks on the simulated disk.
pub const MAX_BLOCKS: usize = DISK_SIZE / BLOCK_SIZE;
/// Capacity of an entry name in bytes, NUL terminator included.
pub const MAX_FILE_NAME: usize = 64;
/// Largest byte size a single file may reach (128 blocks).
pub const MAX_FILE_SIZE: usize = 128 * 1024;
/// Maximum number of files held by one directory.
pub const DIRECTORY_SIZE: usize = 128;
/// Capacity of the directory table.
pub const MAX_DIRECTORIES: usize = 100;

/// FAT sentinel for an unallocated block.
pub const FREE: i32 = -1;
/// FAT sentinel terminating a block chain.
pub const EOC: i32 = -2;

/// Index of the root directory in the directory table.
pub const ROOT_DIR_INDEX: usize = 0;
/// Name of the root directory.
pub const ROOT_NAME: &str = "/";
/// Default path of the backing image file.
pub const DISK_FILE: &str = "disk.fs";

/// Byte size of the FAT region at the start of the image.
pub const FAT_REGION_SIZE: usize = MAX_BLOCKS * std::mem::size_of::<i32>();
/// Byte offset of the directory table (the directory count sits right
/// before it).
pub const DIR_TABLE_OFFSET: usize = FAT_REGION_SIZE + std::mem::size_of::<i32>();

lazy_static! {
    /// Size of one serialized [`FileRecord`] in bytes.
    /// Measured at runtime by serializing a default record, so the layout
    /// offsets can never drift from the actual encoding.
    pub static ref FILE_RECORD_SIZE: usize =
        bincode::serialize(&FileRecord::default()).unwrap().len();
    /// Size of one serialized [`DirectoryRecord`] in bytes.
    pub static ref DIR_RECORD_SIZE: usize =
        bincode::serialize(&DirectoryRecord::default()).unwrap().len();
    /// Byte offset of the data-block region.
    pub static ref DATA_OFFSET: usize = DIR_TABLE_OFFSET + MAX_DIRECTORIES * *DIR_RECORD_SIZE;
    /// Total byte size of the image file.
    pub static ref IMAGE_SIZE: usize = *DATA_OFFSET + DISK_SIZE;
}

/// Buffer abstraction, representing some data on the heap.
/// Buffers back the [`Block`] type and carry the serialized metadata
/// region during commits and loads. They support raw byte-range reads and
/// writes as well as (de)serialization of record types at a given offset.
#[derive(Debug, PartialEq, Eq)]
pub struct Buffer {
    /// Contents of the buffer, as a boxed slice since buffers never grow.
    contents: Box<[u8]>,
}

impl Buffer {
    /// Create a new buffer, having the given `data` slice as its data
    pub fn new(data: Box<[u8]>) -> Buffer {
        Buffer { contents: data }
    }

    /// Create an all-zero buffer, with contents length of `len`
    pub fn new_zero(len: u64) -> Buffer {
        Buffer {
            contents: vec![0; len as usize].into_boxed_slice(),
        }
    }

    /// Size of the underlying data
    pub fn len(&self) -> u64 {
        self.contents.len() as u64
    }

    /// Whether this buffer has length zero
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    /// Return a reference to this buffer's contents
    pub fn contents_as_ref(&self) -> &[u8] {
        &self.contents
    }

    /// Reads data from the given buffer into the `data` buffer, starting at
    /// the given `offset`. If the function does not return an error, the
    /// number of bytes read is equal to `data.len()`.
    pub fn read_data(&self, data: &mut [u8], offset: u64) -> error::Result<()> {
        if offset + data.len() as u64 > self.len() {
            return Err(APIError::BlockInput(
                "Trying to read beyond the bounds of the buffer",
            ));
        }

        let mut c = Cursor::new(&self.contents);
        c.seek(SeekFrom::Start(offset))?;
        c.read_exact(data).map_err(|e| e.into())
    }

    /// Writes the given slice into the buffer at `offset`.
    /// If the function does not return an error, the number of bytes
    /// written is equal to `data.len()`.
    pub fn write_data(&mut self, data: &[u8], offset: u64) -> error::Result<()> {
        if offset + data.len() as u64 > self.len() {
            return Err(APIError::BlockInput(
                "Trying to write beyond the bounds of the buffer",
            ));
        }

        let mut c = Cursor::new(&mut self.contents[..]);
        c.seek(SeekFrom::Start(offset))?;
        c.write_all(data).map_err(|e| e.into())
    }

    /// Read any object that implements the `DeserializeOwned` trait from
    /// this buffer, starting at `offset`.
    pub fn deserialize_from<S>(&self, offset: u64) -> error::Result<S>
    where
        S: DeserializeOwned,
    {
        let mut c = Cursor::new(&self.contents);
        c.seek(SeekFrom::Start(offset))?;
        Ok(bincode::deserialize_from(c)?)
    }

    /// Write any object that implements the `Serialize` trait into this
    /// buffer at `offset`. Goes through `write_data` so that out-of-bounds
    /// writes error instead of silently extending the buffer.
    pub fn serialize_into<S>(&mut self, stru: &S, offset: u64) -> error::Result<()>
    where
        S: Serialize,
    {
        let stru_bin = bincode::serialize(stru)?;
        self.write_data(&stru_bin, offset)
    }
}

/// Block abstraction, representing one data block read from the volume.
/// The basic unit handed out by the block primitives (`rblock`), carrying
/// its index alongside the bytes.
#[derive(Debug, PartialEq, Eq)]
pub struct Block {
    /// Index of this block in the data region
    pub block_no: u64,
    /// Contents of the block; method calls are relayed to this buffer
    buf: Buffer,
}

impl Block {
    /// Create a new block, corresponding to block `block_no` on the
    /// volume, having the given `data` slice as its data
    pub fn new(block_no: u64, data: Box<[u8]>) -> Block {
        Block {
            block_no,
            buf: Buffer::new(data),
        }
    }

    /// Create an all-zero block, with contents length of `len`
    pub fn new_zero(block_no: u64, len: u64) -> Block {
        Block {
            block_no,
            buf: Buffer::new_zero(len),
        }
    }

    /// Size of the underlying block data
    pub fn len(&self) -> u64 {
        self.buf.len()
    }

    /// Whether this block has length zero
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Return a reference to this block's contents
    pub fn contents_as_ref(&self) -> &[u8] {
        self.buf.contents_as_ref()
    }

    /// Reads data from the given block into the `data` buffer, starting at
    /// the given `offset`.
    pub fn read_data(&self, data: &mut [u8], offset: u64) -> error::Result<()> {
        self.buf.read_data(data, offset)
    }

    /// Writes data from the given slice into the block at `offset`.
    pub fn write_data(&mut self, data: &[u8], offset: u64) -> error::Result<()> {
        self.buf.write_data(data, offset)
    }

    /// Number of trailing bytes of this block that are either NUL or fall
    /// outside the printable ASCII range. A reporting convenience for
    /// block dumps, not a semantic property of the block.
    pub fn trailing_free_bytes(&self) -> u64 {
        self.buf
            .contents_as_ref()
            .iter()
            .rev()
            .take_while(|&&b| b == 0 || !(0x20..=0x7e).contains(&b))
            .count() as u64
    }
}

/// A fixed-capacity, NUL-terminated entry name, the in-memory twin of the
/// 64-byte name field of the on-disk records. At most `MAX_FILE_NAME - 1`
/// bytes of the name are usable; the remainder is NUL padding.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EntryName([u8; MAX_FILE_NAME]);

impl EntryName {
    /// Validate and store a name. Returns `None` when the name is empty,
    /// contains a NUL byte, or does not leave room for the terminator.
    pub fn new(name: &str) -> Option<EntryName> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() >= MAX_FILE_NAME || bytes.contains(&0) {
            return None;
        }
        let mut buf = [0u8; MAX_FILE_NAME];
        buf[..bytes.len()].copy_from_slice(bytes);
        Some(EntryName(buf))
    }

    /// The name bytes up to the first NUL (or the full field when no
    /// terminator is present, which only happens on hand-crafted images).
    pub fn as_bytes(&self) -> &[u8] {
        let end = self
            .0
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_FILE_NAME);
        &self.0[..end]
    }

    /// Whether the name is the empty (all-NUL) name of a vacant slot.
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    /// Compare against a string name.
    pub fn matches(&self, name: &str) -> bool {
        self.as_bytes() == name.as_bytes()
    }
}

impl Default for EntryName {
    fn default() -> EntryName {
        EntryName([0; MAX_FILE_NAME])
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EntryName({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl Serialize for EntryName {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        crate::serde_fixed::serialize(&self.0, ser)
    }
}

impl<'de> Deserialize<'de> for EntryName {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<EntryName, D::Error> {
        crate::serde_fixed::deserialize(de).map(EntryName)
    }
}

/// One file inside a directory, exactly as stored on disk:
/// name (64 bytes) + size (i32) + start block (i32), 72 bytes in total.
///
/// `start_block` is the head of the file's FAT chain. Every live file owns
/// at least its start block, including files of size zero.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FileRecord {
    /// Name of the file, unique within its directory
    pub name: EntryName,
    /// Size of the file in bytes
    pub size: i32,
    /// First block of the file's chain
    pub start_block: i32,
}

/// One directory, exactly as stored on disk. The directory tree is formed
/// by table indices: `parent_index` points upward (−1 for the root) and
/// `children` holds the table indices of subdirectories. Only the first
/// `file_count` file slots and `child_count` child slots are meaningful.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    /// Name of the directory (the root is `"/"`)
    pub name: EntryName,
    /// Table index of the parent directory, −1 for the root
    pub parent_index: i32,
    /// Number of occupied file slots
    pub file_count: i32,
    /// File slots; ordered, compacted on removal
    #[serde(with = "crate::serde_fixed")]
    pub files: [FileRecord; DIRECTORY_SIZE],
    /// Number of occupied child slots
    pub child_count: i32,
    /// Table indices of child directories; ordered, compacted on removal
    #[serde(with = "crate::serde_fixed")]
    pub children: [i32; MAX_DIRECTORIES],
}

impl Default for DirectoryRecord {
    fn default() -> DirectoryRecord {
        DirectoryRecord {
            name: EntryName::default(),
            parent_index: -1,
            file_count: 0,
            files: [FileRecord::default(); DIRECTORY_SIZE],
            child_count: 0,
            children: [0; MAX_DIRECTORIES],
        }
    }
}

impl DirectoryRecord {
    /// The occupied file slots.
    pub fn files(&self) -> &[FileRecord] {
        &self.files[..self.file_count as usize]
    }

    /// The occupied child slots, as directory-table indices.
    pub fn children(&self) -> &[i32] {
        &self.children[..self.child_count as usize]
    }

    /// Slot of the file named `name`, if present.
    pub fn find_file(&self, name: &str) -> Option<usize> {
        self.files().iter().position(|f| f.name.matches(name))
    }

    /// Append a file record. The caller checks capacity beforehand.
    pub fn push_file(&mut self, file: FileRecord) {
        debug_assert!((self.file_count as usize) < DIRECTORY_SIZE);
        self.files[self.file_count as usize] = file;
        self.file_count += 1;
    }

    /// Remove and return the file at `slot`, shifting later slots down so
    /// the listing order of the remaining files is preserved.
    pub fn remove_file(&mut self, slot: usize) -> FileRecord {
        let removed = self.files[slot];
        let count = self.file_count as usize;
        self.files.copy_within(slot + 1..count, slot);
        self.files[count - 1] = FileRecord::default();
        self.file_count -= 1;
        removed
    }

    /// Append a child directory index. The caller checks capacity.
    pub fn push_child(&mut self, idx: i32) {
        debug_assert!((self.child_count as usize) < MAX_DIRECTORIES);
        self.children[self.child_count as usize] = idx;
        self.child_count += 1;
    }

    /// Remove the child slot at `pos`, shifting later slots down.
    pub fn remove_child_at(&mut self, pos: usize) {
        let count = self.child_count as usize;
        self.children.copy_within(pos + 1..count, pos);
        self.children[count - 1] = 0;
        self.child_count -= 1;
    }

    /// Reset the file and child counts. Used when a directory is deleted
    /// recursively; the slot itself is never reclaimed, so the stale
    /// record stays in the table but becomes unreachable.
    pub fn clear_entries(&mut self) {
        self.file_count = 0;
        self.child_count = 0;
    }
}

/// Contents of one directory, child directories first, as reported by the
/// listing operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Names of the child directories, in table order
    pub directories: Vec<String>,
    /// Names and byte sizes of the files, in slot order
    pub files: Vec<(String, u64)>,
}

/// Metadata for a single named entry, as reported by the info operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryInfo {
    /// A regular file
    File {
        /// File name
        name: String,
        /// Size in bytes
        size: u64,
        /// Head of the block chain
        start_block: u64,
        /// Number of blocks in the chain
        blocks: u64,
    },
    /// A child directory
    Directory {
        /// Directory name
        name: String,
        /// Number of files it holds
        files: u64,
        /// Number of child directories it holds
        subdirectories: u64,
    },
}
