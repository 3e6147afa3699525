//! Error taxonomy of the filesystem engine. Every variant is user-visible:
//! the REPL prints the `Display` form as its one-line report. None is
//! fatal except an image failure at mount time.

use fatsim_api::error::APIError;
use thiserror::Error;

/// Error type used by all volume operations
#[derive(Error, Debug)]
pub enum FsError {
    ///named file or directory absent in the current directory
    #[error("'{0}' not found in the current directory")]
    NotFound(String),

    ///duplicate name within the current directory
    #[error("an entry named '{0}' already exists here")]
    NameExists(String),

    ///name empty, 64 bytes or longer, or otherwise unstorable
    #[error("'{0}' is not a valid entry name (1 to 63 bytes)")]
    NameTooLong(String),

    ///target directory already holds the maximum number of files
    #[error("the directory is full")]
    DirFull,

    ///global directory table exhausted
    #[error("the directory table is full")]
    DirTableFull,

    ///the FAT has no free block left
    #[error("no free blocks left on the volume")]
    NoSpace,

    ///operation would exceed the maximum file size
    #[error("content exceeds the maximum file size")]
    TooLarge,

    ///truncate asked to grow the file
    #[error("truncate cannot grow a file")]
    Grow,

    ///block index out of range in a raw block operation
    #[error("block index {0} is out of range")]
    InvalidBlock(u64),

    ///raw block write against a block that is not free
    #[error("block {0} is already in use")]
    InUse(u64),

    ///`cd ..` at the root; advisory
    #[error("already at the root directory")]
    AtRoot,

    ///host-file open/read/write failed; fatal only at mount
    #[error("image failure: {0}")]
    Image(#[from] APIError),
}
