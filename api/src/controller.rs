//! Implementation of the host-file device and a very simple controller
//! for it. The device plays the role of the raw disk: one file on the host
//! filesystem, memory mapped and wrapped in a [`Device`] struct, holding
//! the exact image layout described in [`types`](../types/index.html).
//!
//! The image is not uniformly block-sized: a metadata region of
//! `data_start` bytes (FAT, directory count, directory table) precedes the
//! data-block region. The controller therefore exposes raw byte-range
//! `read`/`write` for the persistence layer on top of which the engine
//! builds its block semantics.
//!
//! No provisions have been made to lock the backing file, so do not fiddle
//! with it while a volume is mounted; concurrent external mutation is
//! undefined behavior.

use super::error;
use super::error::APIError;
use memmap::MmapMut;
use std::{
    fs::{remove_file, OpenOptions},
    path::{Path, PathBuf},
};

/// Struct representing the state of the simulated disk.
/// The implementation of this structure is the controller that lets us
/// read and write byte ranges of the backing image.
#[derive(Debug)]
pub struct Device {
    /// Size of the blocks in the data region
    pub block_size: u64,
    /// Total number of blocks in the data region
    pub nblocks: u64,
    /// Byte offset where the data region starts; everything before it is
    /// filesystem metadata
    pub data_start: u64,
    /// Path to the host file used as a storage area to emulate the disk
    path: PathBuf,
    /// Memory-mapped contents of the above file. This is what is
    /// manipulated in the read and write functions.
    contents: MmapMut,
}

/// Small enum, used to specify whether we expect to open a new image
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum DiskState {
    /// Creating a new disk image
    New,
    /// Loading an old disk image
    Load,
}

// Import the components of this enum, so we can reuse them here
use self::DiskState::*;
impl DiskState {
    /// Convert a boolean (does the backing file exist) to a `DiskState`
    pub fn new(ex: bool) -> DiskState {
        match ex {
            true => Load,
            false => New,
        }
    }
}

impl Drop for Device {
    /// This implementation of drop makes sure all writes are persisted at
    /// the end, before we release ownership of the device.
    /// We only need to persist these writes if the file backing this disk
    /// actually still exists
    fn drop(&mut self) {
        if self.path.exists() {
            self.contents.flush().unwrap();
        }
    }
}

impl Device {
    /// Core function that handles both `new` and `load`, based on the
    /// value of the switch `ds`, representing whether we want to load or
    /// create an image
    pub fn create_device<P: AsRef<Path>>(
        path: P,
        block_size: u64,
        nblocks: u64,
        data_start: u64,
        ds: DiskState,
    ) -> error::Result<Device> {
        let path_buf = path.as_ref().to_path_buf();
        let mmapf = mmap_path(path, data_start + block_size * nblocks, ds)?;
        Ok(Device {
            block_size,
            nblocks,
            data_start,
            path: path_buf,
            contents: mmapf,
        })
    }

    /// Create a *new* device, given a `path` to store its image, the block
    /// geometry of the data region and the size of the metadata region
    /// preceding it. The new image contains 0 at each address.
    /// This function will return an error if the file represented by
    /// `path` already exists.
    pub fn new<P: AsRef<Path>>(
        path: P,
        block_size: u64,
        nblocks: u64,
        data_start: u64,
    ) -> error::Result<Device> {
        Device::create_device(path, block_size, nblocks, data_start, New)
    }

    /// Load an *existing* device with the given geometry.
    /// This function will return an error if the file represented by
    /// `path` does not yet exist, or if its size does not match the
    /// geometry.
    pub fn load<P: AsRef<Path>>(
        path: P,
        block_size: u64,
        nblocks: u64,
        data_start: u64,
    ) -> error::Result<Device> {
        Device::create_device(path, block_size, nblocks, data_start, Load)
    }

    /// Open the image at `path`, creating it when absent and loading it
    /// when present. Returns the device together with the state that was
    /// taken, so the caller knows whether a fresh image needs formatting.
    pub fn open<P: AsRef<Path>>(
        path: P,
        block_size: u64,
        nblocks: u64,
        data_start: u64,
    ) -> error::Result<(Device, DiskState)> {
        let ds = DiskState::new(path.as_ref().exists());
        let dev = Device::create_device(path, block_size, nblocks, data_start, ds)?;
        Ok((dev, ds))
    }

    /// End the lifetime of this device, and remove the file backing it.
    /// Assumes that you have not made any other links to the backing file.
    /// Panics if removing the file fails
    pub fn destruct(self) {
        remove_file(&self.path).unwrap();
    }

    /// Size of this device in bytes, metadata region included
    pub fn device_size(&self) -> u64 {
        self.data_start + self.block_size * self.nblocks
    }

    /// Path of the file backing this device
    pub fn device_path(&self) -> &Path {
        &self.path
    }

    /// Read `nb` bytes from the device starting at address `addr`.
    /// Results in an error if a read past the end of the device is
    /// attempted
    pub fn read(&self, addr: u64, nb: u64) -> error::Result<Box<[u8]>> {
        if addr + nb > self.device_size() {
            return Err(APIError::ControllerInput("Read past the end of the device"));
        }
        let start = addr as usize;
        let end = (addr + nb) as usize;
        Ok(self.contents[start..end].into())
    }

    /// Write the given buffer into the image at address `addr`.
    /// Fails if a write past the end of the device is attempted
    pub fn write(&mut self, addr: u64, b: &[u8]) -> error::Result<()> {
        if addr + b.len() as u64 > self.device_size() {
            return Err(APIError::ControllerInput(
                "Write past the end of the device",
            ));
        }
        let start = addr as usize;
        let end = (addr as usize) + b.len();
        self.contents[start..end].copy_from_slice(b);
        Ok(())
    }

    /// Flush the mapping to the host file. Called once per committed
    /// mutation, so the image on disk always holds the last committed
    /// state.
    pub fn sync(&self) -> error::Result<()> {
        self.contents.flush().map_err(|e| e.into())
    }
}

/// Either open or create the specified file path, mapping it into memory.
/// If the path already exists, check that the image it holds has the
/// expected size.
fn mmap_path<P: AsRef<Path>>(path: P, dsize: u64, ex: DiskState) -> error::Result<MmapMut> {
    let exists = DiskState::new(path.as_ref().exists());
    if exists != ex {
        if ex == Load {
            return Err(APIError::ControllerInput(
                "Tried to load a non-existing file path",
            ));
        } else {
            return Err(APIError::ControllerInput(
                "Tried to create a pre-existing file path",
            ));
        }
    }

    let f = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)?;

    if ex == Load {
        if f.metadata()?.len() != dsize {
            return Err(APIError::ControllerInput(
                "Device size does not match provided size",
            ));
        }
    } else {
        f.set_len(dsize)?; // The file is extended to dsize, filled with 0s.
    }

    let data = unsafe { memmap::MmapOptions::new().map_mut(&f)? };
    Ok(data)
}
