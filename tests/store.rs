use std::fs;
use std::path::PathBuf;

use desktop_pet::error::StoreError;
use desktop_pet::store::{JsonFileStore, KeyValueStore, MemoryStore};
use serde_json::json;
use speculoos::prelude::*;

/// A fresh directory under the system temp dir, unique to this test and process.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("desktop-pet-store-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_file_store_round_trips_records() {
    let dir = scratch_dir("roundtrip");
    let mut store = JsonFileStore::open(&dir).unwrap();

    store.set("pet-growth", json!({ "exp": 12 })).unwrap();

    assert_that(&dir.join("pet-growth.json").exists()).is_true();
    assert_that(&store.get("pet-growth")).is_equal_to(Some(json!({ "exp": 12 })));
    // A second handle on the same directory sees the record.
    assert_that(&JsonFileStore::open(&dir).unwrap().get("pet-growth")).is_equal_to(Some(json!({ "exp": 12 })));

    store.remove("pet-growth").unwrap();
    assert_that(&store.get("pet-growth")).is_none();
    store.remove("pet-growth").unwrap();

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_file_store_rejects_path_like_keys() {
    let dir = scratch_dir("keys");
    let mut store = JsonFileStore::open(&dir).unwrap();

    for key in ["", "../escape", ".hidden", "a/b"] {
        assert!(matches!(store.set(key, json!(1)), Err(StoreError::InvalidKey(_))), "{key:?} accepted");
        assert_that(&store.get(key)).is_none();
    }

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_corrupt_record_reads_as_missing() {
    let dir = scratch_dir("corrupt");
    let store = JsonFileStore::open(&dir).unwrap();
    fs::write(dir.join("pet-activity.json"), b"{ half a record").unwrap();

    assert_that(&store.get("pet-activity")).is_none();
    assert_that(&store.get("never-written")).is_none();

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn test_memory_store() {
    let mut store = MemoryStore::new().with_entry("size", json!(3));
    assert_that(&store.len()).is_equal_to(1);

    store.set("size", json!(4)).unwrap();
    assert_that(&store.get("size")).is_equal_to(Some(json!(4)));
    store.remove("size").unwrap();
    assert_that(&store.is_empty()).is_true();
}
