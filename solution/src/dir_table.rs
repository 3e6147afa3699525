//! The directory table: a fixed-capacity, indexed table of directory
//! records forming a tree through parent/child indices. Index 0 is always
//! the root; `count` is a monotonically increasing watermark of occupied
//! slots. Slots are never reclaimed — a recursively deleted directory
//! keeps its (cleared) record but becomes unreachable once its parent
//! drops the child index.

use fatsim_api::types::{DirectoryRecord, EntryName, MAX_DIRECTORIES, ROOT_DIR_INDEX, ROOT_NAME};

/// All directories of the volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTable {
    records: Vec<DirectoryRecord>,
    count: usize,
}

impl DirTable {
    /// A freshly formatted table: the root in slot 0, nothing else.
    pub fn formatted() -> DirTable {
        let mut table = DirTable {
            records: vec![DirectoryRecord::default(); MAX_DIRECTORIES],
            count: 0,
        };
        table.install_root();
        table
    }

    /// Adopt records and a count read from an image. The caller guarantees
    /// the record count and the range of `count`.
    pub fn from_raw(records: Vec<DirectoryRecord>, count: usize) -> DirTable {
        debug_assert_eq!(records.len(), MAX_DIRECTORIES);
        debug_assert!(count >= 1 && count <= MAX_DIRECTORIES);
        DirTable { records, count }
    }

    /// Reset every slot and reinstall the root. Used by the reformat
    /// operation.
    pub fn reset(&mut self) {
        for rec in self.records.iter_mut() {
            *rec = DirectoryRecord::default();
        }
        self.count = 0;
        self.install_root();
    }

    fn install_root(&mut self) {
        let root = &mut self.records[ROOT_DIR_INDEX];
        *root = DirectoryRecord::default();
        root.name = EntryName::new(ROOT_NAME).unwrap();
        root.parent_index = -1;
        self.count = 1;
    }

    /// Occupied-slot watermark.
    pub fn count(&self) -> usize {
        self.count
    }

    /// All `MAX_DIRECTORIES` records, for persistence.
    pub fn records(&self) -> &[DirectoryRecord] {
        &self.records
    }

    /// The record at table index `idx`.
    pub fn record(&self, idx: usize) -> &DirectoryRecord {
        &self.records[idx]
    }

    /// Mutable access to the record at table index `idx`.
    pub fn record_mut(&mut self, idx: usize) -> &mut DirectoryRecord {
        &mut self.records[idx]
    }

    /// Whether slot 0 holds a well-formed root (named `/`, no parent).
    pub fn root_is_valid(&self) -> bool {
        let root = &self.records[ROOT_DIR_INDEX];
        root.name.matches(ROOT_NAME) && root.parent_index == -1
    }

    /// Table index of the child of `dir` named `name`, if any.
    pub fn find_child(&self, dir: usize, name: &str) -> Option<usize> {
        self.records[dir]
            .children()
            .iter()
            .map(|&c| c as usize)
            .find(|&c| self.records[c].name.matches(name))
    }

    /// Position of `child` inside `dir`'s child list.
    pub fn child_position(&self, dir: usize, child: usize) -> Option<usize> {
        self.records[dir]
            .children()
            .iter()
            .position(|&c| c as usize == child)
    }

    /// Whether `name` is taken in `dir`, by a file or a child directory.
    /// Name uniqueness spans both kinds.
    pub fn name_in_use(&self, dir: usize, name: &str) -> bool {
        self.records[dir].find_file(name).is_some() || self.find_child(dir, name).is_some()
    }

    /// Allocate the next slot for a directory named `name` under `parent`,
    /// wiring up both sides of the parent/child relation. Returns `None`
    /// when the table is exhausted.
    pub fn alloc(&mut self, name: EntryName, parent: usize) -> Option<usize> {
        if self.count == MAX_DIRECTORIES {
            return None;
        }
        let idx = self.count;
        let rec = &mut self.records[idx];
        *rec = DirectoryRecord::default();
        rec.name = name;
        rec.parent_index = parent as i32;
        self.records[parent].push_child(idx as i32);
        self.count += 1;
        Some(idx)
    }
}
