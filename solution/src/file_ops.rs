//! File operations on the current directory: create, overwrite, append,
//! truncate, read, delete, rename, move. Lookups are linear scans of the
//! current directory's slots; every mutation ends in a full-image commit.

use crate::error_fs::FsError;
use crate::fat::FatEntry;
use crate::volume::Volume;
use fatsim_api::fs::FileSupport;
use fatsim_api::types::{
    EntryInfo, EntryName, FileRecord, BLOCK_SIZE, DIRECTORY_SIZE, MAX_FILE_SIZE,
};

impl Volume {
    /// Slot of the file named `name` in the current directory.
    fn file_slot(&self, name: &str) -> Result<usize, FsError> {
        self.cur()
            .find_file(name)
            .ok_or_else(|| FsError::NotFound(name.to_string()))
    }

    /// Last block of a shrunken chain: keep the block containing the new
    /// final byte, return the rest of the chain to the free pool, and zero
    /// the kept block's stale tail. `new_size` must not exceed what the
    /// chain currently covers. The chain always keeps at least its start
    /// block, so a file of size zero still owns one (zeroed) block.
    fn shrink_chain(&mut self, start: u32, new_size: usize) {
        let keep = if new_size == 0 {
            1
        } else {
            (new_size + BLOCK_SIZE - 1) / BLOCK_SIZE
        };
        let mut last = start;
        for _ in 0..keep - 1 {
            match self.fat.get(last) {
                FatEntry::Next(n) => last = n,
                _ => break,
            }
        }
        if let FatEntry::Next(tail) = self.fat.get(last) {
            self.fat.free_chain(tail);
        }
        self.fat.set(last, FatEntry::EndOfChain);
        if new_size == 0 {
            self.store.zero_block(last);
        } else if new_size % BLOCK_SIZE != 0 {
            self.store.zero_tail(last, new_size % BLOCK_SIZE);
        }
    }
}

impl FileSupport for Volume {
    fn create(&mut self, name: &str, content: &[u8]) -> Result<(), FsError> {
        let ename = EntryName::new(name).ok_or_else(|| FsError::NameTooLong(name.to_string()))?;
        if self.cur().file_count as usize >= DIRECTORY_SIZE {
            return Err(FsError::DirFull);
        }
        if self.dirs.name_in_use(self.cwd, name) {
            return Err(FsError::NameExists(name.to_string()));
        }
        let start = self.fat.find_free().ok_or(FsError::NoSpace)?;
        self.fat.set(start, FatEntry::EndOfChain);

        // Creation stores at most one block; longer content goes through
        // an explicit write so the chain machinery is in one place.
        let stored = content.len().min(BLOCK_SIZE);
        self.store.zero_block(start);
        self.store.write(start, 0, &content[..stored]);

        self.cur_mut().push_file(FileRecord {
            name: ename,
            size: stored as i32,
            start_block: start as i32,
        });
        self.commit()
    }

    fn write(&mut self, name: &str, content: &[u8]) -> Result<(), FsError> {
        let slot = self.file_slot(name)?;
        let n = content.len();
        if n > MAX_FILE_SIZE {
            return Err(FsError::TooLarge);
        }
        let start = self.cur().files[slot].start_block as u32;

        let mut cur = start;
        let mut written = 0;
        while written < n {
            let chunk = (n - written).min(BLOCK_SIZE);
            self.store.write(cur, 0, &content[written..written + chunk]);
            written += chunk;
            if written == n {
                break;
            }
            cur = match self.fat.get(cur) {
                FatEntry::Next(next) => next,
                _ => match self.fat.find_free() {
                    Some(free) => {
                        self.fat.link(cur, free);
                        free
                    }
                    None => {
                        // Out of space mid-write: keep what landed, record
                        // its size, persist, and report the failure.
                        self.cur_mut().files[slot].size = written as i32;
                        self.commit()?;
                        return Err(FsError::NoSpace);
                    }
                },
            };
        }

        // Whatever the old chain still holds past the new final byte goes
        // back to the free pool, and the kept tail is zeroed.
        self.shrink_chain(start, n);
        self.cur_mut().files[slot].size = n as i32;
        self.commit()
    }

    fn append(&mut self, name: &str, content: &[u8]) -> Result<(), FsError> {
        let slot = self.file_slot(name)?;
        let size = self.cur().files[slot].size as usize;
        let n = content.len();
        if size + n > MAX_FILE_SIZE {
            return Err(FsError::TooLarge);
        }
        if n == 0 {
            return Ok(());
        }
        let start = self.cur().files[slot].start_block as u32;

        // Walk to the chain block the next byte lands in, allocating the
        // boundary block when the size is an exact multiple of the block
        // size (the existing chain ends right before it).
        let mut cur = start;
        for _ in 0..size / BLOCK_SIZE {
            cur = match self.fat.get(cur) {
                FatEntry::Next(next) => next,
                _ => match self.fat.find_free() {
                    Some(free) => {
                        self.fat.link(cur, free);
                        free
                    }
                    None => return Err(FsError::NoSpace),
                },
            };
        }

        let mut offset = size % BLOCK_SIZE;
        let mut written = 0;
        loop {
            let chunk = (n - written).min(BLOCK_SIZE - offset);
            self.store
                .write(cur, offset, &content[written..written + chunk]);
            written += chunk;
            if written == n {
                break;
            }
            offset = 0;
            cur = match self.fat.find_free() {
                Some(free) => {
                    self.fat.link(cur, free);
                    free
                }
                None => {
                    self.cur_mut().files[slot].size = (size + written) as i32;
                    self.commit()?;
                    return Err(FsError::NoSpace);
                }
            };
        }

        self.cur_mut().files[slot].size = (size + n) as i32;
        self.commit()
    }

    fn truncate(&mut self, name: &str, new_size: u64) -> Result<(), FsError> {
        let slot = self.file_slot(name)?;
        let file = self.cur().files[slot];
        if new_size > file.size as u64 {
            return Err(FsError::Grow);
        }
        self.shrink_chain(file.start_block as u32, new_size as usize);
        self.cur_mut().files[slot].size = new_size as i32;
        self.commit()
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, FsError> {
        let slot = self.file_slot(name)?;
        let file = &self.cur().files[slot];
        let size = file.size as usize;

        let mut out = Vec::with_capacity(size);
        let mut remaining = size;
        for block in self.fat.chain(file.start_block as u32) {
            if remaining == 0 {
                break;
            }
            let chunk = remaining.min(BLOCK_SIZE);
            out.extend_from_slice(self.store.read(block, 0, chunk));
            remaining -= chunk;
        }
        // A chain shorter than the size is a consistency violation; the
        // read stops at the end of the chain and returns what exists.
        Ok(out)
    }

    fn remove(&mut self, name: &str) -> Result<(), FsError> {
        if let Some(child) = self.dirs.find_child(self.cwd, name) {
            self.remove_subtree(child);
            if let Some(pos) = self.dirs.child_position(self.cwd, child) {
                self.cur_mut().remove_child_at(pos);
            }
            return self.commit();
        }
        if let Some(slot) = self.cur().find_file(name) {
            let file = self.cur_mut().remove_file(slot);
            self.fat.free_chain(file.start_block as u32);
            return self.commit();
        }
        Err(FsError::NotFound(name.to_string()))
    }

    fn rename(&mut self, old: &str, new: &str) -> Result<(), FsError> {
        if self.dirs.name_in_use(self.cwd, new) {
            return Err(FsError::NameExists(new.to_string()));
        }
        let ename = EntryName::new(new).ok_or_else(|| FsError::NameTooLong(new.to_string()))?;
        if let Some(slot) = self.cur().find_file(old) {
            self.cur_mut().files[slot].name = ename;
        } else if let Some(child) = self.dirs.find_child(self.cwd, old) {
            self.dirs.record_mut(child).name = ename;
        } else {
            return Err(FsError::NotFound(old.to_string()));
        }
        self.commit()
    }

    fn move_file(&mut self, name: &str, dir: &str) -> Result<(), FsError> {
        let slot = self.file_slot(name)?;
        let target = self
            .dirs
            .find_child(self.cwd, dir)
            .ok_or_else(|| FsError::NotFound(dir.to_string()))?;
        if self.dirs.record(target).file_count as usize >= DIRECTORY_SIZE {
            return Err(FsError::DirFull);
        }
        if self.dirs.name_in_use(target, name) {
            return Err(FsError::NameExists(name.to_string()));
        }
        // Moves by value; the chain and blocks stay where they are.
        let file = self.cur_mut().remove_file(slot);
        self.dirs.record_mut(target).push_file(file);
        self.commit()
    }

    fn stat(&self, name: &str) -> Result<EntryInfo, FsError> {
        if let Some(slot) = self.cur().find_file(name) {
            let file = &self.cur().files[slot];
            return Ok(EntryInfo::File {
                name: file.name.to_string(),
                size: file.size as u64,
                start_block: file.start_block as u64,
                blocks: self.fat.chain_len(file.start_block as u32) as u64,
            });
        }
        if let Some(child) = self.dirs.find_child(self.cwd, name) {
            let rec = self.dirs.record(child);
            return Ok(EntryInfo::Directory {
                name: rec.name.to_string(),
                files: rec.file_count as u64,
                subdirectories: rec.child_count as u64,
            });
        }
        Err(FsError::NotFound(name.to_string()))
    }
}

#[cfg(test)]
#[path = "../../api/fs-tests/file_test.rs"]
mod tests;
