//! Tests for Directory
//!
//! These tests verify:
//! - Building the directory by walking the chain
//! - Cycle detection
//! - Patching and split bookkeeping
//! - Candidate selection for lookup, prefix scan and insert placement

use chainkv::block::{Block, BlockOffset};
use chainkv::config::SyncStrategy;
use chainkv::directory::{Directory, DirectoryEntry};
use chainkv::record::{Key, Record, Value};
use chainkv::storage::BlockFile;
use chainkv::ChainError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn offset(n: u64) -> BlockOffset {
    BlockOffset::new(n).unwrap()
}

fn entry(at: u64, first: &str, last: &str) -> DirectoryEntry {
    DirectoryEntry {
        offset: offset(at),
        first_key: first.as_bytes().to_vec(),
        last_key: last.as_bytes().to_vec(),
    }
}

fn empty(at: u64) -> DirectoryEntry {
    entry(at, "", "")
}

fn block_with(capacity: usize, keys: &[&str]) -> Block {
    let mut block = Block::new(capacity);
    for (i, key) in keys.iter().enumerate() {
        block.insert_at(i, Record::new(Key::new(*key).unwrap(), Value::new("v").unwrap()));
    }
    block.update_boundaries();
    block
}

fn raw(offsets: Vec<BlockOffset>) -> Vec<u64> {
    offsets.into_iter().map(BlockOffset::get).collect()
}

/// a..c @10, d..f @20, g..i @30
fn three_blocks() -> Directory {
    Directory::from_entries(vec![
        entry(10, "a", "c"),
        entry(20, "d", "f"),
        entry(30, "g", "i"),
    ])
}

// =============================================================================
// Build Tests
// =============================================================================

#[test]
fn test_build_follows_chain_not_file_order() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.db");
    let mut file = BlockFile::open(&path, 4, SyncStrategy::OsBuffered).unwrap();

    // File order: head, second, third. Chain order: head -> third -> second.
    let head = file.head();
    let second = file.allocate().unwrap();
    let third = file.allocate().unwrap();

    let mut head_block = block_with(4, &["a"]);
    head_block.set_next(Some(third));
    let mut third_block = block_with(4, &["m"]);
    third_block.set_next(Some(second));
    let second_block = block_with(4, &["x", "y"]);

    file.write_block(head, &head_block).unwrap();
    file.write_block(third, &third_block).unwrap();
    file.write_block(second, &second_block).unwrap();

    let directory = Directory::build(&mut file).unwrap();

    assert_eq!(directory.offsets(), vec![head, third, second]);
    assert_eq!(directory.entries()[2].first_key, b"x");
    assert_eq!(directory.entries()[2].last_key, b"y");
}

#[test]
fn test_build_detects_cycle() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.db");
    let mut file = BlockFile::open(&path, 4, SyncStrategy::OsBuffered).unwrap();

    let head = file.head();
    let other = file.allocate().unwrap();
    let mut head_block = Block::new(4);
    head_block.set_next(Some(other));
    let mut other_block = Block::new(4);
    other_block.set_next(Some(head));
    file.write_block(head, &head_block).unwrap();
    file.write_block(other, &other_block).unwrap();

    assert!(matches!(
        Directory::build(&mut file),
        Err(ChainError::Corruption(_))
    ));
}

// =============================================================================
// Maintenance Tests
// =============================================================================

#[test]
fn test_patch_updates_bounds() {
    let mut directory = three_blocks();

    directory
        .patch(offset(20), &block_with(4, &["e", "ee"]))
        .unwrap();

    assert_eq!(directory.entries()[1], entry(20, "e", "ee"));
}

#[test]
fn test_patch_unknown_offset_fails() {
    let mut directory = three_blocks();
    assert!(matches!(
        directory.patch(offset(99), &Block::new(4)),
        Err(ChainError::Directory(_))
    ));
}

#[test]
fn test_insert_after_keeps_chain_order() {
    let mut directory = three_blocks();

    directory.insert_after(offset(10), entry(40, "b", "c")).unwrap();

    assert_eq!(raw(directory.offsets()), vec![10, 40, 20, 30]);
    assert_eq!(directory.position(offset(40)), Some(1));
}

// =============================================================================
// Point Lookup Candidate Tests
// =============================================================================

#[test]
fn test_candidates_match_range() {
    let directory = three_blocks();

    assert_eq!(raw(directory.candidates(b"e").collect()), vec![20]);
    assert_eq!(raw(directory.candidates(b"a").collect()), vec![10]);
    assert_eq!(raw(directory.candidates(b"i").collect()), vec![30]);
}

#[test]
fn test_candidates_outside_every_range() {
    let directory = three_blocks();

    // Between blocks, below the first, above the last
    assert!(directory.candidates(b"cz").next().is_none());
    assert!(directory.candidates(b"0").next().is_none());
    assert!(directory.candidates(b"z").next().is_none());
}

#[test]
fn test_candidates_skip_empty_blocks() {
    let directory = Directory::from_entries(vec![empty(10), entry(20, "d", "f"), empty(30)]);
    assert_eq!(raw(directory.candidates(b"d").collect()), vec![20]);
}

// =============================================================================
// Prefix Candidate Tests
// =============================================================================

#[test]
fn test_prefix_candidates_straddle_boundary() {
    let directory = Directory::from_entries(vec![
        entry(10, "a0", "b05"),
        entry(20, "b06", "b12"),
        entry(30, "b13", "c9"),
        entry(40, "d0", "d9"),
    ]);

    assert_eq!(raw(directory.prefix_candidates(b"b1").collect()), vec![20, 30]);
    assert_eq!(raw(directory.prefix_candidates(b"b").collect()), vec![10, 20, 30]);
    assert_eq!(raw(directory.prefix_candidates(b"d").collect()), vec![40]);
    assert!(directory.prefix_candidates(b"e").next().is_none());
}

#[test]
fn test_prefix_candidates_empty_prefix_visits_all() {
    let directory = Directory::from_entries(vec![entry(10, "a", "c"), empty(20), entry(30, "x", "z")]);
    assert_eq!(raw(directory.prefix_candidates(b"").collect()), vec![10, 20, 30]);
}

#[test]
fn test_prefix_candidates_skip_empty_blocks() {
    let directory = Directory::from_entries(vec![empty(10), entry(20, "b1", "b3"), empty(30)]);
    assert_eq!(raw(directory.prefix_candidates(b"b").collect()), vec![20]);
}

// =============================================================================
// Insert Placement Tests
// =============================================================================

#[test]
fn test_target_within_range() {
    let directory = three_blocks();
    assert_eq!(directory.target_for_insert(b"b").map(BlockOffset::get), Some(10));
    assert_eq!(directory.target_for_insert(b"e").map(BlockOffset::get), Some(20));
}

#[test]
fn test_target_in_gap_goes_to_next_block() {
    let directory = three_blocks();
    // "cz" sits between c and d: the block starting at d takes it at index 0
    assert_eq!(directory.target_for_insert(b"cz").map(BlockOffset::get), Some(20));
}

#[test]
fn test_target_beyond_end_is_terminal_block() {
    let directory = three_blocks();
    assert_eq!(directory.target_for_insert(b"zzz").map(BlockOffset::get), Some(30));
}

#[test]
fn test_target_on_single_empty_block() {
    let directory = Directory::from_entries(vec![empty(4)]);
    assert_eq!(directory.target_for_insert(b"anything").map(BlockOffset::get), Some(4));
}

#[test]
fn test_target_prefers_empty_block_in_gap() {
    let directory = Directory::from_entries(vec![
        entry(10, "a", "c"),
        empty(20),
        entry(30, "m", "p"),
    ]);

    assert_eq!(directory.target_for_insert(b"f").map(BlockOffset::get), Some(20));
    // Keys inside the later range still go to their own block
    assert_eq!(directory.target_for_insert(b"n").map(BlockOffset::get), Some(30));
    // Keys below "c" must not land in the empty block after it
    assert_eq!(directory.target_for_insert(b"b").map(BlockOffset::get), Some(10));
}

#[test]
fn test_target_never_breaks_order_with_empty_middle() {
    let directory = Directory::from_entries(vec![
        entry(10, "a", "c"),
        empty(20),
        entry(30, "x", "z"),
    ]);

    // Above every key: the empty block sits before "x", so it is not a valid home
    assert_eq!(directory.target_for_insert(b"zz").map(BlockOffset::get), Some(30));
}

#[test]
fn test_target_uses_trailing_empty_block() {
    let directory = Directory::from_entries(vec![entry(10, "a", "c"), empty(20)]);
    assert_eq!(directory.target_for_insert(b"d").map(BlockOffset::get), Some(20));
    assert_eq!(directory.target_for_insert(b"b").map(BlockOffset::get), Some(10));
}

#[test]
fn test_target_empty_directory() {
    let directory = Directory::default();
    assert_eq!(directory.target_for_insert(b"a"), None);
}
