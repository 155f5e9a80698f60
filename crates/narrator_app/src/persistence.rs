use engine_logging::{engine_error, engine_info, engine_warn};
use narrator_core::{BlobStore, ManifestCache};

/// Load the cache blob. Any failure yields an empty cache.
pub(crate) fn load_cache(store: &dyn BlobStore, key: &str) -> ManifestCache {
    let raw = match store.load_raw(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return ManifestCache::new(),
        Err(err) => {
            engine_warn!("Failed to read manifest cache {:?}: {}", key, err);
            return ManifestCache::new();
        }
    };

    match ManifestCache::from_bytes(&raw) {
        Ok(cache) => {
            engine_info!("Loaded manifest cache {:?} with {} entries", key, cache.len());
            cache
        }
        Err(err) => {
            engine_warn!("Failed to parse manifest cache {:?}: {}", key, err);
            ManifestCache::new()
        }
    }
}

/// Persist the cache blob. Failures are logged, never propagated.
pub(crate) fn save_cache(store: &dyn BlobStore, key: &str, cache: &ManifestCache) -> bool {
    let bytes = match cache.to_bytes() {
        Ok(bytes) => bytes,
        Err(err) => {
            engine_error!("Failed to serialize manifest cache: {}", err);
            return false;
        }
    };

    if let Err(err) = store.save_raw(key, &bytes) {
        engine_error!("Failed to write manifest cache {:?}: {}", key, err);
        return false;
    }
    true
}
