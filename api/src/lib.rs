//! Device and type layer of the FAT simulator
//!
//! This crate contains everything the filesystem engine builds on: the
//! memory-mapped host-file device playing the role of the raw disk, the
//! buffer and block abstractions used to move bytes around, the on-disk
//! record types together with the canonical image layout, and the traits
//! describing the operations a mounted volume supports.
//!
//! The engine itself (allocator, directory tree, file operations, REPL)
//! lives in the sibling `fatsim_sol` crate.

#![deny(missing_docs)]

//Implementation of the controller layer
pub mod controller;
pub mod error;

//Basic modules for types and their on-disk encoding
pub mod serde_fixed;
pub mod types;

//Traits the engine implements
pub mod fs;
