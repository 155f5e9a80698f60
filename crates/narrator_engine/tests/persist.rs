use std::fs;

use narrator_core::BlobStore;
use narrator_engine::{ensure_state_dir, AtomicFileWriter, FileBlobStore};
use tempfile::TempDir;

#[test]
fn creates_missing_state_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("state");
    assert!(!new_dir.exists());
    ensure_state_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("cache.json", "hello").unwrap();
    assert_eq!(first.file_name().unwrap(), "cache.json");
    assert_eq!(fs::read_to_string(&first).unwrap(), "hello");

    let second = writer.write("cache.json", b"world").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "world");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("cache.json", "data").is_err());
    assert!(!file_path.with_file_name("cache.json").exists());
}

#[test]
fn file_blob_store_round_trips_and_reports_missing_keys() {
    let temp = TempDir::new().unwrap();
    let store = FileBlobStore::new(temp.path().join("state"));

    assert_eq!(store.load_raw("manifest-cache").unwrap(), None);

    store.save_raw("manifest-cache", br#"{"a":1}"#).unwrap();
    assert_eq!(
        store.load_raw("manifest-cache").unwrap().as_deref(),
        Some(&br#"{"a":1}"#[..])
    );
    assert!(store.path_for("manifest-cache").is_file());
}

#[test]
fn file_blob_store_reports_unusable_directory() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("occupied");
    fs::write(&file_path, "x").unwrap();

    let store = FileBlobStore::new(file_path);
    assert!(store.save_raw("manifest-cache", b"{}").is_err());
}
