//! Tests for BlockFile
//!
//! These tests verify:
//! - Bootstrapping a new file (header + empty head block)
//! - Reopening reads the head offset back
//! - Append-only allocation
//! - In-place block rewrites
//! - Corrupt header/offset detection

use std::fs;
use std::path::{Path, PathBuf};

use chainkv::block::{slot_size, Block, BlockOffset};
use chainkv::config::SyncStrategy;
use chainkv::record::{Key, Record, Value};
use chainkv::storage::{BlockFile, HEADER_SIZE};
use chainkv::ChainError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const CAPACITY: usize = 4;

fn setup_temp_file() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.db");
    (temp_dir, path)
}

fn open(path: &Path) -> BlockFile {
    BlockFile::open(path, CAPACITY, SyncStrategy::OsBuffered).unwrap()
}

fn record(key: &str, value: &str) -> Record {
    Record::new(Key::new(key).unwrap(), Value::new(value).unwrap())
}

// =============================================================================
// Bootstrap Tests
// =============================================================================

#[test]
fn test_new_file_has_header_and_head_block() {
    let (_temp, path) = setup_temp_file();

    let mut file = open(&path);

    assert_eq!(file.head().get(), HEADER_SIZE);
    assert_eq!(file.size(), HEADER_SIZE + slot_size(CAPACITY));
    assert_eq!(fs::metadata(&path).unwrap().len(), file.size());

    let head = file.read_block(file.head()).unwrap();
    assert!(head.is_empty());
    assert_eq!(head.next(), None);
}

#[test]
fn test_header_is_little_endian_head_offset() {
    let (_temp, path) = setup_temp_file();
    drop(open(&path));

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[0..4], &4i32.to_le_bytes());
    // Empty head block: count 0, next -1
    assert_eq!(&bytes[4..8], &0i32.to_le_bytes());
    assert_eq!(&bytes[8..12], &(-1i32).to_le_bytes());
}

#[test]
fn test_reopen_reads_head() {
    let (_temp, path) = setup_temp_file();
    let head = {
        let file = open(&path);
        file.head()
    };

    let file = open(&path);
    assert_eq!(file.head(), head);
}

#[test]
fn test_zero_length_file_is_initialized() {
    let (_temp, path) = setup_temp_file();
    fs::write(&path, b"").unwrap();

    let file = open(&path);
    assert_eq!(file.head().get(), HEADER_SIZE);
}

// =============================================================================
// Allocation Tests
// =============================================================================

#[test]
fn test_allocate_appends_slots() {
    let (_temp, path) = setup_temp_file();
    let mut file = open(&path);
    let before = file.size();

    let first = file.allocate().unwrap();
    let second = file.allocate().unwrap();

    assert_eq!(first.get(), before);
    assert_eq!(second.get(), before + slot_size(CAPACITY));
    assert_eq!(file.size(), before + 2 * slot_size(CAPACITY));
    assert!(file.read_block(second).unwrap().is_empty());
}

// =============================================================================
// Read/Write Tests
// =============================================================================

#[test]
fn test_write_then_read_block() {
    let (_temp, path) = setup_temp_file();
    let mut file = open(&path);
    let sibling = file.allocate().unwrap();

    let mut block = Block::new(CAPACITY);
    block.insert_at(0, record("a", "1"));
    block.insert_at(1, record("b", "2"));
    block.update_boundaries();
    block.set_next(Some(sibling));

    let head = file.head();
    file.write_block(head, &block).unwrap();

    assert_eq!(file.read_block(head).unwrap(), block);
}

#[test]
fn test_block_survives_reopen() {
    let (_temp, path) = setup_temp_file();
    let mut block = Block::new(CAPACITY);
    block.insert_at(0, record("persist", "me"));
    block.update_boundaries();

    {
        let mut file = open(&path);
        let head = file.head();
        file.write_block(head, &block).unwrap();
        file.sync().unwrap();
    }

    let mut file = open(&path);
    let head = file.head();
    assert_eq!(file.read_block(head).unwrap(), block);
}

#[test]
fn test_shrinking_rewrite_ignores_stale_tail() {
    let (_temp, path) = setup_temp_file();
    let mut file = open(&path);
    let head = file.head();

    let mut block = Block::new(CAPACITY);
    for (i, key) in ["a", "b", "c"].iter().enumerate() {
        block.insert_at(i, record(key, "v"));
    }
    block.update_boundaries();
    file.write_block(head, &block).unwrap();

    block.remove_at(2);
    block.remove_at(1);
    block.update_boundaries();
    file.write_block(head, &block).unwrap();

    let read = file.read_block(head).unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read.last_key(), b"a");
}

#[test]
fn test_write_full_block_rejected() {
    let (_temp, path) = setup_temp_file();
    let mut file = open(&path);
    let head = file.head();

    let mut block = Block::new(CAPACITY);
    for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
        block.insert_at(i, record(key, "v"));
    }
    block.update_boundaries();

    assert!(matches!(
        file.write_block(head, &block),
        Err(ChainError::Corruption(_))
    ));
    assert!(file.read_block(head).unwrap().is_empty());
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_short_header_is_corruption() {
    let (_temp, path) = setup_temp_file();
    fs::write(&path, [1u8, 2]).unwrap();

    let result = BlockFile::open(&path, CAPACITY, SyncStrategy::OsBuffered);
    assert!(matches!(result, Err(ChainError::Corruption(_))));
}

#[test]
fn test_head_outside_file_is_corruption() {
    let (_temp, path) = setup_temp_file();
    drop(open(&path));

    let mut bytes = fs::read(&path).unwrap();
    bytes[0..4].copy_from_slice(&1_000_000i32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let result = BlockFile::open(&path, CAPACITY, SyncStrategy::OsBuffered);
    assert!(matches!(result, Err(ChainError::Corruption(_))));
}

#[test]
fn test_missing_head_is_corruption() {
    let (_temp, path) = setup_temp_file();
    drop(open(&path));

    let mut bytes = fs::read(&path).unwrap();
    bytes[0..4].copy_from_slice(&(-1i32).to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let result = BlockFile::open(&path, CAPACITY, SyncStrategy::OsBuffered);
    assert!(matches!(result, Err(ChainError::Corruption(_))));
}

#[test]
fn test_corrupt_record_count_detected_on_read() {
    let (_temp, path) = setup_temp_file();
    drop(open(&path));

    let mut bytes = fs::read(&path).unwrap();
    bytes[4..8].copy_from_slice(&99i32.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    let mut file = open(&path);
    let head = file.head();
    assert!(matches!(file.read_block(head), Err(ChainError::Corruption(_))));
}

#[test]
fn test_read_past_end_is_corruption() {
    let (_temp, path) = setup_temp_file();
    let mut file = open(&path);
    let beyond = BlockOffset::new(file.size()).unwrap();

    assert!(matches!(file.read_block(beyond), Err(ChainError::Corruption(_))));
}
