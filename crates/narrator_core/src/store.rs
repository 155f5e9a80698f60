use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Key-value persistence contract: opaque bytes in, opaque bytes out.
pub trait BlobStore {
    fn load_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn save_raw(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

/// In-process store, for tests and sessions without a state directory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn load_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        Ok(blobs.get(key).cloned())
    }

    fn save_raw(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
