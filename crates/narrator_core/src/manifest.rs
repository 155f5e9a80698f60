//! Backend-authoritative job manifest.
//!
//! The manifest is kept as the raw JSON document the backend produced so a
//! cached copy round-trips byte-for-byte in meaning, including fields this
//! crate does not interpret. Typed views are extracted on demand.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::item::{AudioReference, RemoteMetrics};
use crate::snapshot::{ContextualInsights, ExportRef};
use crate::value::{self, Object};

const TOP_LEVEL_IDENTITY_KEYS: &[&str] = &[
    "document_identity",
    "document_id",
    "presentation_id",
    "identity",
];
const NESTED_IDENTITY_KEYS: &[&str] = &["id", "identity", "document_id", "presentation_id"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    #[error("manifest is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("manifest has no item array")]
    MissingItems,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteManifest {
    raw: Value,
}

impl RemoteManifest {
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        serde_json::from_slice(bytes)
            .map(Self::from_value)
            .map_err(|err| ManifestError::InvalidJson(err.to_string()))
    }

    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    pub fn job_id(&self) -> Option<String> {
        self.raw
            .as_object()
            .and_then(|obj| value::string(obj, &["job_id", "jobId"]))
    }

    /// Document identity, looked up in priority order: top-level field,
    /// nested `presentation`/`document` object, nested `metadata` object.
    pub fn document_identity(&self) -> Option<String> {
        let obj = self.raw.as_object()?;
        value::string(obj, TOP_LEVEL_IDENTITY_KEYS)
            .or_else(|| {
                ["presentation", "document"]
                    .iter()
                    .filter_map(|key| value::object(obj, &[*key]))
                    .find_map(|nested| value::string(nested, NESTED_IDENTITY_KEYS))
            })
            .or_else(|| {
                value::object(obj, &["metadata"])
                    .and_then(|nested| value::string(nested, NESTED_IDENTITY_KEYS))
            })
    }

    /// Per-item entries. Entries without an identifier are ignored; when an
    /// identifier repeats, the first entry wins.
    pub fn items(&self) -> Result<Vec<ManifestItem>, ManifestError> {
        let entries = self
            .raw
            .as_object()
            .and_then(|obj| value::array(obj, &["items", "slides"]))
            .ok_or(ManifestError::MissingItems)?;

        let mut items: Vec<ManifestItem> = Vec::with_capacity(entries.len());
        for entry in entries.iter().filter_map(Value::as_object) {
            if let Some(item) = ManifestItem::from_object(entry) {
                if !items.iter().any(|existing| existing.item_id == item.item_id) {
                    items.push(item);
                }
            }
        }
        Ok(items)
    }

    pub fn audio_summary(&self) -> Option<AudioSummary> {
        let obj = self.raw.as_object()?;
        let summary = value::object(obj, &["audio_summary", "audio", "export"])?;
        let mut exports = ExportRef::list(summary, &["exports", "files"]);
        if exports.is_empty() {
            exports = ExportRef::list(obj, &["exports"]);
        }
        Some(AudioSummary {
            total_duration_secs: value::number(
                summary,
                &["total_duration", "total_duration_secs", "duration"],
            ),
            exports,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioSummary {
    pub total_duration_secs: Option<f64>,
    pub exports: Vec<ExportRef>,
}

/// Typed view over one manifest entry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ManifestItem {
    pub item_id: String,
    /// Content the refinement was computed from.
    pub original_content: Option<String>,
    /// Explicit fingerprint of the original, used when the text is absent.
    pub original_fingerprint: Option<String>,
    pub refined_content: Option<String>,
    pub insights: Option<ContextualInsights>,
    pub audio: Option<AudioReference>,
    pub metrics: Option<RemoteMetrics>,
}

impl ManifestItem {
    fn from_object(obj: &Object) -> Option<Self> {
        Some(Self {
            item_id: value::string(obj, &["item_id", "slide_id", "id"])?,
            original_content: value::text(
                obj,
                &["original_content", "original_text", "source_content"],
            ),
            original_fingerprint: value::string(
                obj,
                &["original_fingerprint", "content_fingerprint", "source_hash"],
            ),
            refined_content: value::text(
                obj,
                &["refined_content", "refined_text", "narration", "script"],
            ),
            insights: value::object(obj, &["insights", "contextual_insights"])
                .and_then(ContextualInsights::from_object),
            audio: value::object(obj, &["audio"]).and_then(AudioReference::from_object),
            metrics: value::object(obj, &["metrics"]).and_then(RemoteMetrics::from_object),
        })
    }

    pub fn has_replacement(&self) -> bool {
        self.refined_content
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_prefers_top_level_then_nested_then_metadata() {
        let all = RemoteManifest::from_value(json!({
            "document_id": "top",
            "presentation": {"id": "nested"},
            "metadata": {"document_id": "meta"},
            "items": []
        }));
        assert_eq!(all.document_identity().as_deref(), Some("top"));

        let nested = RemoteManifest::from_value(json!({
            "presentation": {"id": "nested"},
            "metadata": {"document_id": "meta"}
        }));
        assert_eq!(nested.document_identity().as_deref(), Some("nested"));

        let document = RemoteManifest::from_value(json!({"document": {"presentation_id": 42}}));
        assert_eq!(document.document_identity().as_deref(), Some("42"));

        let meta = RemoteManifest::from_value(json!({"metadata": {"identity": "meta"}}));
        assert_eq!(meta.document_identity().as_deref(), Some("meta"));

        let none = RemoteManifest::from_value(json!({"document_id": "  "}));
        assert_eq!(none.document_identity(), None);
    }

    #[test]
    fn items_skip_unidentified_and_duplicate_entries() {
        let manifest = RemoteManifest::from_value(json!({
            "items": [
                {"slide_id": "s1", "narration": "first"},
                {"narration": "no id"},
                {"item_id": "s1", "narration": "dup"},
                {"id": 2, "refined_content": "  "}
            ]
        }));
        let items = manifest.items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].refined_content.as_deref(), Some("first"));
        assert_eq!(items[1].item_id, "2");
        assert!(!items[1].has_replacement());
    }

    #[test]
    fn missing_items_is_an_error() {
        let manifest = RemoteManifest::from_value(json!({"job_id": "j"}));
        assert_eq!(manifest.items(), Err(ManifestError::MissingItems));
    }

    #[test]
    fn audio_summary_reads_exports() {
        let manifest = RemoteManifest::from_value(json!({
            "audio_summary": {
                "total_duration": 95.5,
                "exports": [{"format": "mp3", "url": "https://cdn/x.mp3"}, "wav"]
            }
        }));
        let summary = manifest.audio_summary().unwrap();
        assert_eq!(summary.total_duration_secs, Some(95.5));
        assert_eq!(summary.exports.len(), 2);
        assert_eq!(summary.exports[1].format, "wav");
    }
}
