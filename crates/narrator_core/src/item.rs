use serde::{Deserialize, Serialize};

use crate::fingerprint::content_fingerprint;
use crate::snapshot::{ContextualInsights, ExportRef, TimelineCue};
use crate::value::{self, Object};

/// Narration speaking rate used for duration estimates.
pub const WORDS_PER_MINUTE: f64 = 150.0;

/// One locally editable item (a slide's narration) of the host document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalItem {
    pub item_id: String,
    pub original_content: String,
    pub edited_content: String,
    /// Fingerprint of `original_content` at the last known-good state.
    #[serde(default)]
    pub content_fingerprint: String,
    #[serde(default)]
    pub word_count: u32,
    #[serde(default)]
    pub estimated_duration_secs: f64,
    #[serde(default)]
    pub derived: DerivedFields,
}

impl LocalItem {
    pub fn new(item_id: impl Into<String>, original_content: impl Into<String>) -> Self {
        let original_content = original_content.into();
        let mut item = Self {
            item_id: item_id.into(),
            content_fingerprint: content_fingerprint(&original_content),
            edited_content: original_content.clone(),
            original_content,
            word_count: 0,
            estimated_duration_secs: 0.0,
            derived: DerivedFields::default(),
        };
        item.refresh_metrics();
        item
    }

    pub fn with_edited_content(mut self, edited: impl Into<String>) -> Self {
        self.edited_content = edited.into();
        self.refresh_metrics();
        self
    }

    /// Fill in a missing fingerprint from the original content.
    pub fn ensure_fingerprint(&mut self) {
        if self.content_fingerprint.trim().is_empty() {
            self.content_fingerprint = content_fingerprint(&self.original_content);
        }
    }

    pub fn refresh_metrics(&mut self) {
        self.word_count = word_count(&self.edited_content);
        self.estimated_duration_secs = estimate_duration_secs(self.word_count);
    }
}

pub fn word_count(text: &str) -> u32 {
    u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX)
}

pub fn estimate_duration_secs(words: u32) -> f64 {
    f64::from(words) / WORDS_PER_MINUTE * 60.0
}

/// Backend-computed metadata. Not user-editable, always safe to refresh.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedFields {
    #[serde(default)]
    pub insights: Option<ContextualInsights>,
    #[serde(default)]
    pub audio: Option<AudioReference>,
    #[serde(default)]
    pub metrics: Option<RemoteMetrics>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioReference {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub timeline: Vec<TimelineCue>,
    #[serde(default)]
    pub exports: Vec<ExportRef>,
}

impl AudioReference {
    pub(crate) fn from_object(obj: &Object) -> Option<Self> {
        let audio = Self {
            url: value::string(obj, &["url", "audio_url", "file_url"]),
            duration_secs: value::number(obj, &["duration", "duration_secs", "duration_seconds"]),
            timeline: TimelineCue::list(obj, &["timeline", "segments"]),
            exports: ExportRef::list(obj, &["exports"]),
        };
        let empty = audio.url.is_none()
            && audio.duration_secs.is_none()
            && audio.timeline.is_empty()
            && audio.exports.is_empty();
        (!empty).then_some(audio)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RemoteMetrics {
    #[serde(default)]
    pub word_count: Option<u32>,
    #[serde(default)]
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub speaking_rate_wpm: Option<f64>,
    /// Confidence-like; clamped to `[0, 1]` on merge.
    #[serde(default)]
    pub quality_score: Option<f64>,
}

impl RemoteMetrics {
    pub(crate) fn from_object(obj: &Object) -> Option<Self> {
        let metrics = Self {
            word_count: value::count(obj, &["word_count", "words"]),
            duration_secs: value::number(obj, &["duration", "duration_secs", "duration_seconds"]),
            speaking_rate_wpm: value::number(obj, &["speaking_rate", "wpm", "speaking_rate_wpm"]),
            quality_score: value::number(obj, &["quality_score", "quality", "confidence"]),
        };
        let empty = metrics.word_count.is_none()
            && metrics.duration_secs.is_none()
            && metrics.speaking_rate_wpm.is_none()
            && metrics.quality_score.is_none();
        (!empty).then_some(metrics)
    }

    pub fn clamped(mut self) -> Self {
        self.quality_score = self.quality_score.map(value::clamp_unit);
        self
    }
}
