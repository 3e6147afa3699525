use crate::error_fs::FsError;
use crate::fat::FatEntry;
use crate::volume::Volume;
use fatsim_api::fs::{DirSupport, FileSupport, VolumeSupport};
use fatsim_api::types::{EntryInfo, BLOCK_SIZE, DIRECTORY_SIZE, MAX_BLOCKS, MAX_FILE_SIZE};
use std::path::PathBuf;

#[path = "utils.rs"]
mod utils;

fn disk_prep_path(name: &str) -> PathBuf {
    utils::disk_prep_path(&("fs-images-file-".to_string() + name), "img")
}

fn fresh(name: &str) -> Volume {
    Volume::format(&disk_prep_path(name)).unwrap()
}

fn file_size(vol: &Volume, name: &str) -> u64 {
    match vol.stat(name).unwrap() {
        EntryInfo::File { size, .. } => size,
        other => panic!("expected a file, got {:?}", other),
    }
}

fn file_blocks(vol: &Volume, name: &str) -> u64 {
    match vol.stat(name).unwrap() {
        EntryInfo::File { blocks, .. } => blocks,
        other => panic!("expected a file, got {:?}", other),
    }
}

//A byte pattern that makes prefix checks meaningful
fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[test]
fn touch_write_read() {
    let mut vol = fresh("hello");

    vol.create("a", b"").unwrap();
    assert_eq!(vol.fat.get(0), FatEntry::EndOfChain);
    assert_eq!(vol.fat.free_blocks(), MAX_BLOCKS - 1);
    assert_eq!(file_size(&vol, "a"), 0);
    assert_eq!(vol.read("a").unwrap(), b"");

    vol.write("a", b"Hello").unwrap();
    assert_eq!(vol.read("a").unwrap(), b"Hello");
    assert_eq!(file_size(&vol, "a"), 5);
    assert_eq!(file_blocks(&vol, "a"), 1);
    //Still exactly one block in use
    assert_eq!(vol.fat.free_blocks(), MAX_BLOCKS - 1);

    vol.validate().unwrap();
    utils::disk_destruct(vol.unmount());
}

#[test]
fn create_checks_run_in_order() {
    let mut vol = fresh("create-errors");
    vol.create("a", b"").unwrap();

    //Duplicate name
    assert!(matches!(vol.create("a", b""), Err(FsError::NameExists(_))));
    //Malformed names never reach the directory
    assert!(matches!(vol.create("", b""), Err(FsError::NameTooLong(_))));
    let long = "x".repeat(64);
    assert!(matches!(
        vol.create(&long, b""),
        Err(FsError::NameTooLong(_))
    ));

    //A full directory wins over a duplicate name
    vol.dirs.record_mut(0).file_count = DIRECTORY_SIZE as i32;
    assert!(matches!(vol.create("a", b""), Err(FsError::DirFull)));
    vol.dirs.record_mut(0).file_count = 1;

    //A duplicate name wins over a full FAT
    for i in 0..MAX_BLOCKS {
        vol.fat.set(i as u32, FatEntry::EndOfChain);
    }
    assert!(matches!(vol.create("a", b""), Err(FsError::NameExists(_))));
    assert!(matches!(vol.create("b", b""), Err(FsError::NoSpace)));
    vol.fat.init();
    vol.fat.set(0, FatEntry::EndOfChain);

    vol.validate().unwrap();
    utils::disk_destruct(vol.unmount());
}

#[test]
fn create_stores_at_most_one_block() {
    let mut vol = fresh("create-cap");

    vol.create("big", &vec![b'y'; BLOCK_SIZE + 500]).unwrap();
    assert_eq!(file_size(&vol, "big"), BLOCK_SIZE as u64);
    assert_eq!(file_blocks(&vol, "big"), 1);
    assert_eq!(vol.read("big").unwrap(), vec![b'y'; BLOCK_SIZE]);

    vol.validate().unwrap();
    utils::disk_destruct(vol.unmount());
}

#[test]
fn write_spans_blocks() {
    let mut vol = fresh("two-blocks");

    vol.create("a", b"").unwrap();
    vol.write("a", &vec![b'x'; 2 * BLOCK_SIZE]).unwrap();
    assert_eq!(vol.fat.get(0), FatEntry::Next(1));
    assert_eq!(vol.fat.get(1), FatEntry::EndOfChain);
    let back = vol.read("a").unwrap();
    assert_eq!(back.len(), 2 * BLOCK_SIZE);
    assert!(back.iter().all(|&b| b == b'x'));

    vol.validate().unwrap();
    utils::disk_destruct(vol.unmount());
}

#[test]
fn write_boundary_sizes() {
    let mut vol = fresh("boundaries");
    vol.create("a", b"").unwrap();

    for &len in &[1, BLOCK_SIZE, BLOCK_SIZE + 1, MAX_FILE_SIZE] {
        let content = pattern(len);
        vol.write("a", &content).unwrap();
        assert_eq!(vol.read("a").unwrap(), content);
        assert_eq!(file_size(&vol, "a"), len as u64);
        let expect = (len + BLOCK_SIZE - 1) / BLOCK_SIZE;
        assert_eq!(file_blocks(&vol, "a"), expect as u64);
        vol.validate().unwrap();
    }

    //One byte over the cap is refused upfront
    let size_before = file_size(&vol, "a");
    assert!(matches!(
        vol.write("a", &vec![0u8; MAX_FILE_SIZE + 1]),
        Err(FsError::TooLarge)
    ));
    assert_eq!(file_size(&vol, "a"), size_before);

    utils::disk_destruct(vol.unmount());
}

#[test]
fn shrinking_write_frees_and_zeroes() {
    let mut vol = fresh("shrink");

    vol.create("a", b"").unwrap();
    vol.write("a", &vec![b'x'; 3000]).unwrap();
    assert_eq!(file_blocks(&vol, "a"), 3);

    vol.write("a", b"Hello").unwrap();
    assert_eq!(vol.read("a").unwrap(), b"Hello");
    assert_eq!(file_blocks(&vol, "a"), 1);
    assert_eq!(vol.fat.free_blocks(), MAX_BLOCKS - 1);
    //The stale tail of the kept block is gone
    assert!(vol.store.read(0, 5, BLOCK_SIZE - 5).iter().all(|&b| b == 0));

    //Overwriting a file with its own content changes nothing structural
    vol.write("a", &vec![b'z'; 2500]).unwrap();
    let content = vol.read("a").unwrap();
    let blocks = file_blocks(&vol, "a");
    vol.write("a", &content).unwrap();
    assert_eq!(vol.read("a").unwrap(), content);
    assert_eq!(file_blocks(&vol, "a"), blocks);

    //Writing nothing keeps the start block, zeroed
    vol.write("a", b"").unwrap();
    assert_eq!(file_size(&vol, "a"), 0);
    assert_eq!(file_blocks(&vol, "a"), 1);
    assert!(vol.store.block(0).iter().all(|&b| b == 0));

    vol.validate().unwrap();
    utils::disk_destruct(vol.unmount());
}

#[test]
fn truncate_frees_the_tail() {
    let mut vol = fresh("truncate");

    vol.create("a", b"").unwrap();
    vol.write("a", &vec![b'x'; 2 * BLOCK_SIZE]).unwrap();

    //Cut one byte into the second block
    vol.truncate("a", BLOCK_SIZE as u64 + 1).unwrap();
    assert_eq!(vol.fat.get(0), FatEntry::Next(1));
    assert_eq!(vol.fat.get(1), FatEntry::EndOfChain);
    assert_eq!(file_size(&vol, "a"), BLOCK_SIZE as u64 + 1);
    let back = vol.read("a").unwrap();
    assert_eq!(back.len(), BLOCK_SIZE + 1);
    assert!(back.iter().all(|&b| b == b'x'));
    //The kept block is zeroed beyond the cut
    assert!(vol.store.read(1, 1, BLOCK_SIZE - 1).iter().all(|&b| b == 0));
    vol.validate().unwrap();

    //Cut exactly at the block boundary: one block remains, nothing of the
    //kept data is zeroed
    vol.truncate("a", BLOCK_SIZE as u64).unwrap();
    assert_eq!(vol.fat.get(0), FatEntry::EndOfChain);
    assert_eq!(vol.fat.free_blocks(), MAX_BLOCKS - 1);
    assert_eq!(vol.read("a").unwrap(), vec![b'x'; BLOCK_SIZE]);
    vol.validate().unwrap();

    //Growing is not supported
    assert!(matches!(
        vol.truncate("a", BLOCK_SIZE as u64 + 1),
        Err(FsError::Grow)
    ));

    //Truncating to zero keeps the (zeroed) start block
    vol.truncate("a", 0).unwrap();
    assert_eq!(file_size(&vol, "a"), 0);
    assert_eq!(vol.fat.get(0), FatEntry::EndOfChain);
    assert!(vol.store.block(0).iter().all(|&b| b == 0));
    assert_eq!(vol.read("a").unwrap(), b"");
    vol.validate().unwrap();

    utils::disk_destruct(vol.unmount());
}

#[test]
fn truncate_keeps_the_prefix() {
    let mut vol = fresh("truncate-prefix");

    let content = pattern(2600);
    vol.create("a", b"").unwrap();
    vol.write("a", &content).unwrap();
    vol.truncate("a", 1500).unwrap();
    assert_eq!(vol.read("a").unwrap(), &content[..1500]);

    vol.validate().unwrap();
    utils::disk_destruct(vol.unmount());
}

#[test]
fn append_extends_the_tail() {
    let mut vol = fresh("append");

    vol.create("log", &vec![b'a'; 1000]).unwrap();
    vol.append("log", &vec![b'b'; 48]).unwrap();
    assert_eq!(file_size(&vol, "log"), 1048);
    assert_eq!(file_blocks(&vol, "log"), 2);
    let back = vol.read("log").unwrap();
    assert_eq!(&back[..1000], &vec![b'a'; 1000][..]);
    assert_eq!(&back[1000..], &vec![b'b'; 48][..]);

    //Appending nothing changes nothing
    vol.append("log", b"").unwrap();
    assert_eq!(file_size(&vol, "log"), 1048);

    //Grow to an exact block boundary, then one byte past it: the boundary
    //byte lands in a freshly linked block
    vol.append("log", &vec![b'c'; 2 * BLOCK_SIZE - 1048]).unwrap();
    assert_eq!(file_size(&vol, "log"), 2 * BLOCK_SIZE as u64);
    assert_eq!(file_blocks(&vol, "log"), 2);
    vol.append("log", b"d").unwrap();
    assert_eq!(file_size(&vol, "log"), 2 * BLOCK_SIZE as u64 + 1);
    assert_eq!(file_blocks(&vol, "log"), 3);
    assert_eq!(vol.read("log").unwrap()[2 * BLOCK_SIZE], b'd');
    vol.validate().unwrap();

    //The whole request is admitted or refused upfront
    let size_before = file_size(&vol, "log");
    assert!(matches!(
        vol.append("log", &vec![0u8; MAX_FILE_SIZE]),
        Err(FsError::TooLarge)
    ));
    assert_eq!(file_size(&vol, "log"), size_before);

    utils::disk_destruct(vol.unmount());
}

#[test]
fn append_to_an_empty_file() {
    let mut vol = fresh("append-empty");

    vol.create("a", b"").unwrap();
    vol.append("a", b"hi").unwrap();
    assert_eq!(vol.read("a").unwrap(), b"hi");
    assert_eq!(file_blocks(&vol, "a"), 1);

    vol.validate().unwrap();
    utils::disk_destruct(vol.unmount());
}

#[test]
fn create_and_delete_restore_the_fat() {
    let mut vol = fresh("fat-restore");

    vol.create("keep", b"").unwrap();
    vol.write("keep", &pattern(1500)).unwrap();
    let snapshot = vol.fat.clone();

    vol.create("tmp", b"").unwrap();
    vol.write("tmp", &pattern(5000)).unwrap();
    vol.remove("tmp").unwrap();

    assert_eq!(vol.fat, snapshot);
    assert!(matches!(vol.read("tmp"), Err(FsError::NotFound(_))));
    assert_eq!(vol.read("keep").unwrap(), pattern(1500));

    vol.validate().unwrap();
    utils::disk_destruct(vol.unmount());
}

#[test]
fn out_of_space_keeps_the_partial_write() {
    let mut vol = fresh("no-space");

    vol.create("a", b"").unwrap();
    for i in 1..MAX_BLOCKS {
        vol.fat.set(i as u32, FatEntry::EndOfChain);
    }

    //The first block's worth lands; the rest has nowhere to go
    assert!(matches!(
        vol.write("a", &vec![b'x'; 3 * BLOCK_SIZE]),
        Err(FsError::NoSpace)
    ));
    assert_eq!(file_size(&vol, "a"), BLOCK_SIZE as u64);
    assert_eq!(vol.read("a").unwrap(), vec![b'x'; BLOCK_SIZE]);

    //Append behaves the same: one block frees up, the second does not fit
    vol.fat.set(1, FatEntry::Free);
    assert!(matches!(
        vol.append("a", &vec![b'y'; 2 * BLOCK_SIZE]),
        Err(FsError::NoSpace)
    ));
    assert_eq!(file_size(&vol, "a"), 2 * BLOCK_SIZE as u64);
    let back = vol.read("a").unwrap();
    assert_eq!(&back[..BLOCK_SIZE], &vec![b'x'; BLOCK_SIZE][..]);
    assert_eq!(&back[BLOCK_SIZE..], &vec![b'y'; BLOCK_SIZE][..]);

    //And the partial state is what got committed
    let vol2 = Volume::mount(vol.unmount()).unwrap();
    assert_eq!(file_size(&vol2, "a"), 2 * BLOCK_SIZE as u64);

    utils::disk_destruct(vol2.unmount());
}

#[test]
fn rename_taxonomy() {
    let mut vol = fresh("rename");

    vol.create("a", b"payload").unwrap();
    vol.mkdir("d").unwrap();

    //Collisions span files and directories
    assert!(matches!(
        vol.rename("a", "d"),
        Err(FsError::NameExists(_))
    ));
    assert!(matches!(
        vol.rename("d", "a"),
        Err(FsError::NameExists(_))
    ));
    //Renaming onto the same name collides with itself
    assert!(matches!(
        vol.rename("a", "a"),
        Err(FsError::NameExists(_))
    ));

    let long = "x".repeat(64);
    assert!(matches!(
        vol.rename("a", &long),
        Err(FsError::NameTooLong(_))
    ));
    assert!(matches!(
        vol.rename("missing", "n"),
        Err(FsError::NotFound(_))
    ));

    vol.rename("a", "b").unwrap();
    assert_eq!(vol.read("b").unwrap(), b"payload");
    assert!(matches!(vol.read("a"), Err(FsError::NotFound(_))));

    vol.rename("d", "e").unwrap();
    vol.cd("e").unwrap();
    vol.cd("..").unwrap();

    vol.validate().unwrap();
    utils::disk_destruct(vol.unmount());
}

#[test]
fn move_relocates_the_record_only() {
    let mut vol = fresh("move");

    vol.create("f", b"").unwrap();
    vol.write("f", &pattern(2000)).unwrap();
    vol.mkdir("d").unwrap();
    let fat_before = vol.fat.clone();

    vol.move_file("f", "d").unwrap();
    //The chain and blocks are untouched
    assert_eq!(vol.fat, fat_before);
    assert!(matches!(vol.read("f"), Err(FsError::NotFound(_))));
    vol.cd("d").unwrap();
    assert_eq!(vol.read("f").unwrap(), pattern(2000));
    vol.cd("..").unwrap();
    vol.validate().unwrap();

    //Misses on either side
    assert!(matches!(
        vol.move_file("ghost", "d"),
        Err(FsError::NotFound(_))
    ));
    vol.create("g", b"").unwrap();
    assert!(matches!(
        vol.move_file("g", "nodir"),
        Err(FsError::NotFound(_))
    ));

    //A name already taken in the target refuses the move
    vol.create("f", b"").unwrap();
    assert!(matches!(
        vol.move_file("f", "d"),
        Err(FsError::NameExists(_))
    ));

    //A full target refuses the move
    vol.dirs.record_mut(1).file_count = DIRECTORY_SIZE as i32;
    assert!(matches!(vol.move_file("g", "d"), Err(FsError::DirFull)));
    vol.dirs.record_mut(1).file_count = 1;

    utils::disk_destruct(vol.unmount());
}

#[test]
fn stat_reports_both_kinds() {
    let mut vol = fresh("stat");

    vol.create("a", b"12345").unwrap();
    vol.mkdir("d").unwrap();
    vol.cd("d").unwrap();
    vol.create("inner", b"").unwrap();
    vol.cd("..").unwrap();

    assert_eq!(
        vol.stat("a").unwrap(),
        EntryInfo::File {
            name: "a".to_string(),
            size: 5,
            start_block: 0,
            blocks: 1,
        }
    );
    assert_eq!(
        vol.stat("d").unwrap(),
        EntryInfo::Directory {
            name: "d".to_string(),
            files: 1,
            subdirectories: 0,
        }
    );
    assert!(matches!(vol.stat("ghost"), Err(FsError::NotFound(_))));

    utils::disk_destruct(vol.unmount());
}
