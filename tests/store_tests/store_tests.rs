//! Tests for Store
//!
//! These tests verify:
//! - Opening/creating the data directory
//! - Index staleness tracking across mutations
//! - Flush and reopen
//! - Concurrent readers

use std::sync::Arc;
use std::thread;

use postalstore::config::StoreConfig;
use postalstore::{Store, StoreError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

const ROWS: &[&str] = &[
    "60601,Chicago,IL,Cook,41.8858,-87.6181",
    "10001,New York,NY,New York,40.7484,-73.9967",
    "33101,Miami,FL,Miami-Dade,25.7791,-80.1978",
    "10002,New York,NY,New York,40.7157,-73.9863",
    "32801,Orlando,FL,Orange,28.5421,-81.3790",
];

fn setup_temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::builder()
        .data_dir(temp_dir.path())
        .block_capacity(128)
        .build();
    let store = Store::open(config).unwrap();
    (temp_dir, store)
}

fn populate(store: &Store) {
    for row in ROWS {
        store.insert(*row).unwrap();
    }
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_open_creates_data_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("zips");

    let store = Store::open_path(&data_dir).unwrap();

    assert!(data_dir.is_dir());
    assert_eq!(store.total_records(), 0);
    assert_eq!(store.total_blocks(), 0);
    assert_eq!(store.index_len(), 0);
    assert!(!store.is_index_stale());
    assert_eq!(store.config().block_capacity, 512);
}

#[test]
fn test_open_rejects_zero_capacity() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::builder()
        .data_dir(temp_dir.path())
        .block_capacity(0)
        .build();

    assert!(matches!(Store::open(config), Err(StoreError::Config(_))));
}

#[test]
fn test_open_rejects_shared_file_names() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::builder()
        .data_dir(temp_dir.path())
        .dump_filename("data.txt")
        .index_filename("data.txt")
        .build();

    assert!(matches!(Store::open(config), Err(StoreError::Config(_))));
}

// =============================================================================
// Staleness Tests
// =============================================================================

#[test]
fn test_insert_marks_index_stale_and_search_still_works() {
    let (_temp, store) = setup_temp_store();

    populate(&store);

    assert!(store.is_index_stale());
    assert_eq!(
        store.search("33101").as_deref(),
        Some("33101,Miami,FL,Miami-Dade,25.7791,-80.1978")
    );
}

#[test]
fn test_rebuild_clears_staleness() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    let entries = store.rebuild_index();

    assert!(!store.is_index_stale());
    assert_eq!(entries, store.index_len());
    assert!(entries >= 2);
    for row in ROWS {
        let key = postalstore::record::primary_key(row);
        assert_eq!(store.search(key).as_deref(), Some(*row));
    }
}

#[test]
fn test_delete_absent_key_keeps_index_fresh() {
    let (_temp, store) = setup_temp_store();
    populate(&store);
    store.rebuild_index();

    assert!(!store.delete("99999"));
    assert!(!store.is_index_stale());

    assert!(store.delete("10001"));
    assert!(store.is_index_stale());
    assert_eq!(store.search("10001"), None);
}

#[test]
fn test_add_record_marks_index_stale() {
    let (_temp, store) = setup_temp_store();
    store.rebuild_index();

    store.add_record("10001,New York,NY,New York,40.7484,-73.9967").unwrap();

    assert!(store.is_index_stale());
    assert_eq!(store.total_records(), 1);
}

#[test]
fn test_failed_insert_leaves_index_fresh() {
    let (_temp, store) = setup_temp_store();
    populate(&store);
    store.rebuild_index();

    let result = store.insert("10001,Again,NY,New York,0.0,0.0");

    assert!(matches!(result, Err(StoreError::DuplicateKey(_))));
    assert!(!store.is_index_stale());
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_search_by_state() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    let florida = store.search_by_state("FL");

    assert_eq!(florida.len(), 2);
    assert!(florida[0].starts_with("32801"));
    assert!(florida[1].starts_with("33101"));
}

#[test]
fn test_with_view_sees_set_and_index() {
    let (_temp, store) = setup_temp_store();
    populate(&store);
    store.rebuild_index();

    let (records, entries) = store.with_view(|set, index| (set.total_records(), index.len()));

    assert_eq!(records, ROWS.len());
    assert_eq!(entries, store.index_len());
}

// =============================================================================
// Persistence Tests
// =============================================================================

#[test]
fn test_flush_writes_dump_and_index() {
    let (temp, store) = setup_temp_store();
    populate(&store);

    store.flush().unwrap();

    assert!(!store.is_index_stale());
    assert!(temp.path().join("BlockedSequenceSet.dat").is_file());
    let index_text = std::fs::read_to_string(temp.path().join("SimpleIndex.txt")).unwrap();
    assert_eq!(index_text.lines().count(), store.index_len());
    assert!(index_text.contains("60601,"));
}

#[test]
fn test_reopen_restores_records() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig::builder()
        .data_dir(temp_dir.path())
        .block_capacity(128)
        .build();

    {
        let store = Store::open(config.clone()).unwrap();
        populate(&store);
        store.close().unwrap();
    }

    let store = Store::open(config).unwrap();

    assert_eq!(store.total_records(), ROWS.len());
    assert!(!store.is_index_stale());
    assert_eq!(
        store.search("60601").as_deref(),
        Some("60601,Chicago,IL,Cook,41.8858,-87.6181")
    );
}

#[test]
fn test_record_with_line_break_is_refused_and_store_reopens() {
    let temp_dir = TempDir::new().unwrap();
    {
        let store = Store::open_path(temp_dir.path()).unwrap();
        store.insert("10002,New York,NY,New York,40.7157,-73.9863").unwrap();

        let result = store.insert("10001,New\nYork");

        assert!(matches!(result, Err(StoreError::RecordFormat(_))));
        store.close().unwrap();
    }

    let store = Store::open_path(temp_dir.path()).unwrap();
    assert_eq!(store.total_records(), 1);
    assert_eq!(store.search("10001"), None);
}

#[test]
fn test_reopen_keeps_stored_block_capacity() {
    let temp_dir = TempDir::new().unwrap();
    let small = StoreConfig::builder()
        .data_dir(temp_dir.path())
        .block_capacity(128)
        .build();
    {
        let store = Store::open(small).unwrap();
        populate(&store);
        store.close().unwrap();
    }

    let large = StoreConfig::builder()
        .data_dir(temp_dir.path())
        .block_capacity(4096)
        .build();
    let store = Store::open(large).unwrap();

    assert_eq!(store.config().block_capacity, 4096);
    assert_eq!(store.block_capacity(), 128);
    assert_eq!(store.total_records(), ROWS.len());
    store.insert("99950,Ketchikan,AK,Ketchikan Gateway,55.3422,-131.6461").unwrap();
    store.with_view(|set, _| {
        assert!(set.blocks().iter().all(|b| b.capacity() == 128 && b.used_bytes() <= 128));
    });
}

#[test]
fn test_summary_matches_counts() {
    let (_temp, store) = setup_temp_store();
    populate(&store);

    let summary = store.summary();

    assert_eq!(summary.total_records, ROWS.len());
    assert_eq!(summary.total_blocks, store.total_blocks());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_readers() {
    let (_temp, store) = setup_temp_store();
    populate(&store);
    store.rebuild_index();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    for row in ROWS {
                        let key = postalstore::record::primary_key(row);
                        assert_eq!(store.search(key).as_deref(), Some(*row));
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_writer_and_readers_interleave() {
    let (_temp, store) = setup_temp_store();
    let store = Arc::new(store);

    let writer = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for zip in 1..=100u32 {
                store
                    .insert(format!("{:05},Town {},ST,County,0.0,0.0", zip, zip))
                    .unwrap();
            }
        })
    };

    let reader = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            for _ in 0..100 {
                // Whatever is visible must be a complete record
                if let Some(record) = store.search("00001") {
                    assert!(record.starts_with("00001,Town 1,"));
                }
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();

    assert_eq!(store.total_records(), 100);
    store.rebuild_index();
    assert!(store.search("00100").is_some());
}
