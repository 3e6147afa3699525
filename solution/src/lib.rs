//! FAT-style simulated filesystem engine.
//!
//! One host file plays the role of a raw 64 MiB disk; on top of it this
//! crate maintains a hierarchical namespace of directories and files bound
//! to physical blocks through a File Allocation Table. The whole image
//! (FAT, directory table, block store) lives in memory inside a single
//! [`Volume`](volume/struct.Volume.html) and is snapshotted back to the
//! host file after every mutation, so the next session observes the same
//! state.
//!
//! The operation surface is described by the traits in
//! [`fatsim_api::fs`](../fatsim_api/fs/index.html); `Volume` is the one
//! implementation. The `fatsim` binary wraps it in a line-oriented REPL.

#![deny(missing_docs)]

pub mod block_store;
pub mod dir_ops;
pub mod dir_table;
pub mod error_fs;
pub mod fat;
pub mod file_ops;
pub mod repl;
pub mod volume;
