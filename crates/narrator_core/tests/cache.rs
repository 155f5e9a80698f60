use chrono::{TimeZone, Utc};
use narrator_core::{
    BlobStore, ManifestCache, ManifestCacheEntry, MemoryBlobStore, RemoteManifest,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn entry(job_id: &str, document: Option<&str>) -> ManifestCacheEntry {
    entry_at(job_id, document, 0)
}

fn entry_at(job_id: &str, document: Option<&str>, minute: u32) -> ManifestCacheEntry {
    let mut raw = json!({"job_id": job_id, "items": []});
    if let Some(document) = document {
        raw["document_id"] = json!(document);
    }
    ManifestCacheEntry::new(
        job_id,
        RemoteManifest::from_value(raw),
        Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap(),
    )
}

#[test]
fn put_indexes_by_job_and_document() {
    let mut cache = ManifestCache::new();
    cache.put(entry("J1", Some("D1")));

    let by_doc = cache.get_by_document("D1").expect("document index");
    assert_eq!(by_doc.job_id, "J1");
    assert_eq!(cache.get("J1"), Some(by_doc));
    assert_eq!(cache.len(), 1);
}

#[test]
fn missing_keys_return_none() {
    let cache = ManifestCache::new();
    assert!(cache.is_empty());
    assert_eq!(cache.get("nope"), None);
    assert_eq!(cache.get_by_document("nope"), None);
}

#[test]
fn entries_without_identity_are_job_indexed_only() {
    let mut cache = ManifestCache::new();
    cache.put(entry("J1", None));
    assert!(cache.get("J1").is_some());
    assert_eq!(cache.entries().filter(|e| e.document_identity.is_some()).count(), 0);
}

#[test]
fn newer_put_supersedes_both_indexes() {
    let mut cache = ManifestCache::new();
    cache.put(entry("J1", Some("D1")));
    cache.put(entry("J2", Some("D1")));

    assert_eq!(cache.get_by_document("D1").map(|e| e.job_id.as_str()), Some("J2"));
    assert!(cache.get("J1").is_some());
}

#[test]
fn identity_change_drops_stale_document_mapping() {
    let mut cache = ManifestCache::new();
    cache.put(entry("J1", Some("D1")));
    cache.put(entry("J1", Some("D2")));

    assert_eq!(cache.get_by_document("D1"), None);
    assert_eq!(cache.get_by_document("D2").map(|e| e.job_id.as_str()), Some("J1"));
}

#[test]
fn identity_change_keeps_mapping_owned_by_another_job() {
    let mut cache = ManifestCache::new();
    cache.put(entry("J1", Some("D1")));
    cache.put(entry("J2", Some("D1")));
    cache.put(entry("J1", Some("D3")));

    assert_eq!(cache.get_by_document("D1").map(|e| e.job_id.as_str()), Some("J2"));
    assert_eq!(cache.get_by_document("D3").map(|e| e.job_id.as_str()), Some("J1"));
}

#[test]
fn moving_away_falls_back_to_another_entry_with_the_identity() {
    let mut cache = ManifestCache::new();
    cache.put(entry_at("J1", Some("D1"), 1));
    cache.put(entry_at("J2", Some("D1"), 2));
    cache.put(entry_at("J2", Some("D2"), 3));

    assert_eq!(cache.get_by_document("D1").map(|e| e.job_id.as_str()), Some("J1"));
    assert_eq!(cache.get_by_document("D2").map(|e| e.job_id.as_str()), Some("J2"));
}

#[test]
fn fallback_prefers_the_newest_remaining_entry() {
    let mut cache = ManifestCache::new();
    cache.put(entry_at("J1", Some("D1"), 5));
    cache.put(entry_at("J3", Some("D1"), 1));
    cache.put(entry_at("J2", Some("D1"), 7));
    cache.put(entry_at("J2", None, 8));

    assert_eq!(cache.get_by_document("D1").map(|e| e.job_id.as_str()), Some("J1"));
}

#[test]
fn cache_survives_a_blob_store_round_trip() {
    let store = MemoryBlobStore::new();
    let mut cache = ManifestCache::new();
    cache.put(entry("J1", Some("D1")));
    cache.put(entry("J2", None));

    store
        .save_raw("manifest-cache", &cache.to_bytes().unwrap())
        .unwrap();
    let raw = store.load_raw("manifest-cache").unwrap().expect("blob");
    let restored = ManifestCache::from_bytes(&raw).unwrap();

    assert_eq!(restored, cache);
    assert_eq!(
        restored.get_by_document("D1").map(|e| e.job_id.as_str()),
        Some("J1")
    );
    assert_eq!(store.load_raw("other").unwrap(), None);
}

#[test]
fn decoding_repairs_dangling_document_mappings() {
    let raw = json!({
        "by_job": {},
        "by_document": {"D1": "J-missing"}
    });
    let cache = ManifestCache::from_bytes(raw.to_string().as_bytes()).unwrap();
    assert_eq!(cache.get_by_document("D1"), None);
    assert!(cache.is_empty());
}

#[test]
fn decoding_rebinds_stale_mappings_to_a_matching_entry() {
    let mut cache = ManifestCache::new();
    cache.put(entry("J1", Some("D1")));
    let mut raw: serde_json::Value = serde_json::from_slice(&cache.to_bytes().unwrap()).unwrap();
    raw["by_document"]["D1"] = json!("J-missing");

    let restored = ManifestCache::from_bytes(raw.to_string().as_bytes()).unwrap();
    assert_eq!(
        restored.get_by_document("D1").map(|e| e.job_id.as_str()),
        Some("J1")
    );
}

#[test]
fn corrupt_blob_is_a_decode_error() {
    assert!(ManifestCache::from_bytes(b"{not json").is_err());
}
