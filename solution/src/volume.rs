//! The volume: one owned image aggregating the FAT, the directory table,
//! the block store and the current-directory cursor, bound to the device
//! that persists it.
//!
//! Every mutating operation in the engine updates the in-memory image and
//! then calls [`Volume::commit`], which rewrites the full image into the
//! memory-mapped device and flushes it. Reads never touch the device; the
//! image is loaded once at mount time.

use crate::block_store::BlockStore;
use crate::dir_table::DirTable;
use crate::error_fs::FsError;
use crate::fat::{Fat, FatEntry};
use fatsim_api::controller::{Device, DiskState};
use fatsim_api::error::APIError;
use fatsim_api::fs::{BlockSupport, VolumeSupport};
use fatsim_api::types::{
    Block, Buffer, DirectoryRecord, BLOCK_SIZE, DATA_OFFSET, DIR_RECORD_SIZE, DIR_TABLE_OFFSET,
    FAT_REGION_SIZE, FREE, MAX_BLOCKS, MAX_DIRECTORIES, ROOT_DIR_INDEX,
};
use log::warn;
use std::path::Path;

/// A mounted volume. The one implementation of the `fatsim_api` traits.
#[derive(Debug)]
pub struct Volume {
    pub(crate) device: Device,
    pub(crate) fat: Fat,
    pub(crate) dirs: DirTable,
    pub(crate) store: BlockStore,
    pub(crate) cwd: usize,
}

impl Volume {
    /// Wrap a (fresh or wiped) device in a formatted image and commit it.
    fn format_device(device: Device) -> Result<Volume, FsError> {
        let mut vol = Volume {
            device,
            fat: Fat::new(),
            dirs: DirTable::formatted(),
            store: BlockStore::new(),
            cwd: ROOT_DIR_INDEX,
        };
        vol.commit()?;
        Ok(vol)
    }

    /// Snapshot the whole in-memory image into the device and flush it.
    /// This runs after every successful mutation (and after the documented
    /// partial writes), so the host file always holds the last committed
    /// state. Not crash-safe: a crash mid-rewrite can leave a torn image.
    pub fn commit(&mut self) -> Result<(), FsError> {
        let mut meta = Buffer::new_zero(*DATA_OFFSET as u64);

        let mut fat_bytes = Vec::with_capacity(FAT_REGION_SIZE);
        for e in self.fat.raw() {
            fat_bytes.extend_from_slice(&e.to_le_bytes());
        }
        meta.write_data(&fat_bytes, 0)?;

        meta.serialize_into(&(self.dirs.count() as i32), FAT_REGION_SIZE as u64)?;
        for (i, rec) in self.dirs.records().iter().enumerate() {
            meta.serialize_into(rec, (DIR_TABLE_OFFSET + i * *DIR_RECORD_SIZE) as u64)?;
        }

        self.device.write(0, meta.contents_as_ref())?;
        self.device
            .write(*DATA_OFFSET as u64, self.store.as_bytes())?;
        self.device.sync()?;
        Ok(())
    }

    /// Decode the image held by `device` into a volume.
    fn load_device(device: Device) -> Result<Volume, FsError> {
        let meta = Buffer::new(device.read(0, *DATA_OFFSET as u64)?);

        let mut entries = Vec::with_capacity(MAX_BLOCKS);
        for chunk in meta.contents_as_ref()[..FAT_REGION_SIZE].chunks_exact(4) {
            entries.push(i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }

        let count = meta.deserialize_from::<i32>(FAT_REGION_SIZE as u64)?;
        if count < 1 || count as usize > MAX_DIRECTORIES {
            return Err(FsError::Image(APIError::ControllerInput(
                "Directory count of the image is out of range",
            )));
        }

        let mut records = Vec::with_capacity(MAX_DIRECTORIES);
        for i in 0..MAX_DIRECTORIES {
            records.push(
                meta.deserialize_from::<DirectoryRecord>(
                    (DIR_TABLE_OFFSET + i * *DIR_RECORD_SIZE) as u64,
                )?,
            );
        }

        let data = device.read(*DATA_OFFSET as u64, fatsim_api::types::DISK_SIZE as u64)?;

        let dirs = DirTable::from_raw(records, count as usize);
        if !dirs.root_is_valid() {
            warn!("image slot 0 does not hold a well-formed root directory; mounting anyway");
        }

        Ok(Volume {
            device,
            fat: Fat::from_raw(entries),
            dirs,
            store: BlockStore::from_raw(data.into_vec()),
            cwd: ROOT_DIR_INDEX,
        })
    }

    pub(crate) fn cur(&self) -> &DirectoryRecord {
        self.dirs.record(self.cwd)
    }

    pub(crate) fn cur_mut(&mut self) -> &mut DirectoryRecord {
        self.dirs.record_mut(self.cwd)
    }

    /// Check the structural invariants of the in-memory image, fsck-style:
    /// chains terminate in EOC and cover exactly their file's size, no
    /// block is owned twice or left allocated without an owner, the
    /// reachable directory tree is parent/child symmetric, names are
    /// unique per directory, and the cursor is in range.
    ///
    /// Raw block placements made through
    /// [`write_block`](fatsim_api::fs::BlockSupport::write_block) are
    /// deliberate owner-less allocations and fail the no-orphan check.
    pub fn validate(&self) -> anyhow::Result<()> {
        use anyhow::{bail, ensure};

        let count = self.dirs.count();
        ensure!(
            count >= 1 && count <= MAX_DIRECTORIES,
            "directory count {} out of range",
            count
        );
        ensure!(self.cwd < count, "cursor {} outside the table", self.cwd);
        ensure!(self.dirs.root_is_valid(), "malformed root record");

        let mut owner = vec![false; MAX_BLOCKS];
        for d in 0..count {
            let rec = self.dirs.record(d);

            let mut names: Vec<&[u8]> = rec.files().iter().map(|f| f.name.as_bytes()).collect();
            for &c in rec.children() {
                names.push(self.dirs.record(c as usize).name.as_bytes());
            }
            let total = names.len();
            names.sort();
            names.dedup();
            ensure!(names.len() == total, "duplicate names in directory {}", d);

            for f in rec.files() {
                let size = f.size as usize;
                let expect = if size == 0 {
                    1
                } else {
                    (size + BLOCK_SIZE - 1) / BLOCK_SIZE
                };
                ensure!(
                    f.start_block >= 0 && (f.start_block as usize) < MAX_BLOCKS,
                    "start block of '{}' out of range",
                    f.name
                );
                let mut cur = f.start_block as u32;
                let mut got = 0;
                loop {
                    ensure!(!owner[cur as usize], "block {} owned twice", cur);
                    owner[cur as usize] = true;
                    got += 1;
                    ensure!(
                        got <= expect,
                        "chain of '{}' longer than its size needs",
                        f.name
                    );
                    match self.fat.get(cur) {
                        FatEntry::EndOfChain => break,
                        FatEntry::Free => bail!("chain of '{}' runs into a FREE entry", f.name),
                        FatEntry::Next(n) => {
                            ensure!((n as usize) < MAX_BLOCKS, "chain link {} out of range", n);
                            cur = n;
                        }
                    }
                }
                ensure!(
                    got == expect,
                    "chain of '{}' holds {} blocks for {} bytes",
                    f.name,
                    got,
                    size
                );
            }
        }

        for (i, &raw) in self.fat.raw().iter().enumerate() {
            if raw != FREE {
                ensure!(owner[i], "block {} allocated but reachable from no file", i);
            }
        }

        //Walk the reachable tree; every child index must appear exactly
        //once and point back to its parent.
        let mut seen = vec![false; count];
        seen[ROOT_DIR_INDEX] = true;
        let mut stack = vec![ROOT_DIR_INDEX];
        while let Some(d) = stack.pop() {
            for &c in self.dirs.record(d).children() {
                ensure!(
                    c >= 1 && (c as usize) < count,
                    "child index {} out of range",
                    c
                );
                let c = c as usize;
                ensure!(!seen[c], "directory {} referenced by two parents", c);
                ensure!(
                    self.dirs.record(c).parent_index == d as i32,
                    "parent/child mismatch at directory {}",
                    c
                );
                seen[c] = true;
                stack.push(c);
            }
        }

        Ok(())
    }
}

impl VolumeSupport for Volume {
    type Error = FsError;

    fn format<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error> {
        let device = Device::new(
            path,
            BLOCK_SIZE as u64,
            MAX_BLOCKS as u64,
            *DATA_OFFSET as u64,
        )?;
        Volume::format_device(device)
    }

    fn mount(dev: Device) -> Result<Self, Self::Error> {
        if dev.block_size != BLOCK_SIZE as u64
            || dev.nblocks != MAX_BLOCKS as u64
            || dev.data_start != *DATA_OFFSET as u64
        {
            return Err(FsError::Image(APIError::ControllerInput(
                "Device geometry does not match the volume layout",
            )));
        }
        Volume::load_device(dev)
    }

    fn open<P: AsRef<Path>>(path: P) -> Result<Self, Self::Error> {
        let (device, state) = Device::open(
            path,
            BLOCK_SIZE as u64,
            MAX_BLOCKS as u64,
            *DATA_OFFSET as u64,
        )?;
        match state {
            DiskState::New => Volume::format_device(device),
            DiskState::Load => Volume::load_device(device),
        }
    }

    fn unmount(self) -> Device {
        self.device
    }

    fn partition(&mut self) -> Result<(), Self::Error> {
        self.fat.init();
        self.dirs.reset();
        self.store.fill(0xff);
        self.cwd = ROOT_DIR_INDEX;
        self.commit()
    }
}

impl BlockSupport for Volume {
    fn read_block(&self, i: u64) -> Result<Block, Self::Error> {
        if i >= MAX_BLOCKS as u64 {
            return Err(FsError::InvalidBlock(i));
        }
        Ok(Block::new(i, self.store.block(i as u32).into()))
    }

    fn write_block(&mut self, i: u64, content: &[u8]) -> Result<(), Self::Error> {
        if i >= MAX_BLOCKS as u64 {
            return Err(FsError::InvalidBlock(i));
        }
        let block = i as u32;
        if self.fat.get(block) != FatEntry::Free {
            return Err(FsError::InUse(i));
        }
        if content.len() > BLOCK_SIZE {
            return Err(FsError::TooLarge);
        }
        self.store.zero_block(block);
        self.store.write(block, 0, content);
        self.fat.set(block, FatEntry::EndOfChain);
        self.commit()
    }
}

#[cfg(test)]
#[path = "../../api/fs-tests/volume_test.rs"]
mod volume_tests;

#[cfg(test)]
#[path = "../../api/fs-tests/block_test.rs"]
mod block_tests;
