//! Directory operations: mkdir, cd, listing and the recursive subtree
//! delete backing `rm` on a directory.

use crate::error_fs::FsError;
use crate::volume::Volume;
use fatsim_api::fs::DirSupport;
use fatsim_api::types::{EntryName, Listing, ROOT_DIR_INDEX};

impl Volume {
    /// Post-order teardown of the subtree rooted at `idx`: free every
    /// file's chain, recurse into every child, then clear the record's
    /// counts. The slot itself is never reclaimed — the stale record stays
    /// in the table, unreachable once the parent drops its index.
    pub(crate) fn remove_subtree(&mut self, idx: usize) {
        for slot in 0..self.dirs.record(idx).file_count as usize {
            let start = self.dirs.record(idx).files[slot].start_block;
            self.fat.free_chain(start as u32);
        }
        let children: Vec<usize> = self
            .dirs
            .record(idx)
            .children()
            .iter()
            .map(|&c| c as usize)
            .collect();
        for child in children {
            self.remove_subtree(child);
        }
        self.dirs.record_mut(idx).clear_entries();
    }
}

impl DirSupport for Volume {
    fn mkdir(&mut self, name: &str) -> Result<(), FsError> {
        let ename = EntryName::new(name).ok_or_else(|| FsError::NameTooLong(name.to_string()))?;
        if self.dirs.name_in_use(self.cwd, name) {
            return Err(FsError::NameExists(name.to_string()));
        }
        self.dirs
            .alloc(ename, self.cwd)
            .ok_or(FsError::DirTableFull)?;
        self.commit()
    }

    fn cd(&mut self, name: &str) -> Result<(), FsError> {
        if name == ".." {
            if self.cwd == ROOT_DIR_INDEX {
                return Err(FsError::AtRoot);
            }
            self.cwd = self.cur().parent_index as usize;
            return Ok(());
        }
        match self.dirs.find_child(self.cwd, name) {
            Some(child) => {
                self.cwd = child;
                Ok(())
            }
            None => Err(FsError::NotFound(name.to_string())),
        }
    }

    fn list(&self) -> Result<Listing, FsError> {
        let rec = self.cur();
        Ok(Listing {
            directories: rec
                .children()
                .iter()
                .map(|&c| self.dirs.record(c as usize).name.to_string())
                .collect(),
            files: rec
                .files()
                .iter()
                .map(|f| (f.name.to_string(), f.size as u64))
                .collect(),
        })
    }
}

#[cfg(test)]
#[path = "../../api/fs-tests/dir_test.rs"]
mod tests;
