use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobId, RemoteManifest};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to encode manifest cache: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode manifest cache: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestCacheEntry {
    pub job_id: JobId,
    pub manifest: RemoteManifest,
    pub document_identity: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ManifestCacheEntry {
    /// Build an entry, resolving the document identity from the manifest.
    pub fn new(job_id: impl Into<JobId>, manifest: RemoteManifest, updated_at: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.into(),
            document_identity: manifest.document_identity(),
            manifest,
            updated_at,
        }
    }
}

/// Last reconciled manifest per job, with a secondary index by document.
///
/// The document index maps an identity to the job whose entry carries it,
/// so both lookups resolve to the same stored entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ManifestCache {
    #[serde(default)]
    by_job: BTreeMap<JobId, ManifestCacheEntry>,
    #[serde(default)]
    by_document: BTreeMap<String, JobId>,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, job_id: &str) -> Option<&ManifestCacheEntry> {
        self.by_job.get(job_id)
    }

    pub fn get_by_document(&self, identity: &str) -> Option<&ManifestCacheEntry> {
        let job_id = self.by_document.get(identity)?;
        self.by_job
            .get(job_id)
            .filter(|entry| entry.document_identity.as_deref() == Some(identity))
    }

    /// Store under the job index and, when resolvable, the document index.
    /// Both indexes are updated before returning.
    pub fn put(&mut self, entry: ManifestCacheEntry) {
        let job_id = entry.job_id.clone();
        let new_identity = entry.document_identity.clone();
        let old_identity = self
            .by_job
            .insert(job_id.clone(), entry)
            .and_then(|previous| previous.document_identity);

        if let Some(identity) = &new_identity {
            self.by_document.insert(identity.clone(), job_id.clone());
        }
        if let Some(old_identity) = old_identity {
            let owned_by_us = self
                .by_document
                .get(&old_identity)
                .is_some_and(|owner| *owner == job_id);
            if owned_by_us && new_identity.as_deref() != Some(old_identity.as_str()) {
                self.rebind_document(&old_identity);
            }
        }
    }

    /// Point `identity` at the newest entry still carrying it, or drop it.
    fn rebind_document(&mut self, identity: &str) {
        let newest = self
            .by_job
            .values()
            .filter(|entry| entry.document_identity.as_deref() == Some(identity))
            .max_by_key(|entry| entry.updated_at)
            .map(|entry| entry.job_id.clone());
        match newest {
            Some(job_id) => {
                self.by_document.insert(identity.to_string(), job_id);
            }
            None => {
                self.by_document.remove(identity);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_job.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_job.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ManifestCacheEntry> {
        self.by_job.values()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        serde_json::to_vec(self).map_err(CacheError::Encode)
    }

    /// Decode a stored blob, re-pointing document mappings that no longer
    /// match their entry at the newest entry carrying that identity.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CacheError> {
        let mut cache: Self = serde_json::from_slice(bytes).map_err(CacheError::Decode)?;
        let stale: Vec<String> = cache
            .by_document
            .iter()
            .filter(|(identity, job_id)| {
                !cache.by_job.get(*job_id).is_some_and(|entry| {
                    entry.document_identity.as_deref() == Some(identity.as_str())
                })
            })
            .map(|(identity, _)| identity.clone())
            .collect();
        for identity in stale {
            cache.rebind_document(&identity);
        }
        Ok(cache)
    }
}
