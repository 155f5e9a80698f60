use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::{self, Object};

pub type JobId = String;

/// Backend job status, as reported in data frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
    Unknown(String),
}

impl JobStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" | "pending" | "waiting" => Self::Queued,
            "processing" | "running" | "in_progress" | "started" => Self::Processing,
            "completed" | "complete" | "done" | "success" | "succeeded" => Self::Completed,
            "failed" | "error" | "errored" => Self::Failed,
            "cancelled" | "canceled" | "aborted" => Self::Cancelled,
            _ => Self::Unknown(raw.trim().to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::Cancelled => write!(f, "cancelled"),
            JobStatus::Unknown(raw) if raw.is_empty() => write!(f, "unknown"),
            JobStatus::Unknown(raw) => write!(f, "unknown ({raw})"),
        }
    }
}

/// One normalized progress record. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    pub current_step: String,
    pub current_slide: u32,
    pub total_slides: u32,
    /// Passed through verbatim; values outside `[0, 1]` indicate an upstream bug.
    pub progress: f64,
    pub estimated_seconds_remaining: Option<f64>,
    pub message: Option<String>,
    pub error_message: Option<String>,
    pub received_at: DateTime<Utc>,
    pub contextual: Option<ContextualInsights>,
    pub audio: Option<AudioFields>,
}

impl ProgressSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextualInsights {
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub callouts: Vec<String>,
    #[serde(default)]
    pub transition: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl ContextualInsights {
    pub(crate) fn from_object(obj: &Object) -> Option<Self> {
        let insights = Self {
            highlights: value::string_list(
                obj,
                &["highlights", "key_points", "contextual_highlights"],
                &["text", "highlight", "label"],
            ),
            callouts: value::string_list(obj, &["callouts", "notes"], &["text", "label"]),
            transition: value::text(obj, &["transition", "transition_text"]),
            confidence: value::number(obj, &["confidence", "confidence_score", "score"]),
        };
        (!insights.is_empty()).then_some(insights)
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
            && self.callouts.is_empty()
            && self.transition.is_none()
            && self.confidence.is_none()
    }

    pub fn clamped(mut self) -> Self {
        self.confidence = self.confidence.map(value::clamp_unit);
        self
    }
}

/// One entry of an audio timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineCue {
    pub slide: Option<u32>,
    pub start_secs: f64,
    pub end_secs: f64,
    pub label: Option<String>,
}

impl TimelineCue {
    pub(crate) fn from_object(obj: &Object) -> Option<Self> {
        let start_secs = value::number(obj, &["start", "start_secs", "start_time"])?;
        let end_secs = value::number(obj, &["end", "end_secs", "end_time"]).unwrap_or(start_secs);
        Some(Self {
            slide: value::count(obj, &["slide", "slide_index", "slide_number"]),
            start_secs,
            end_secs,
            label: value::text(obj, &["label", "text", "title"]),
        })
    }

    pub(crate) fn list(obj: &Object, keys: &[&str]) -> Vec<Self> {
        value::array(obj, keys)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.as_object().and_then(Self::from_object))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A rendered export (audio file, video, captions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRef {
    pub format: String,
    pub url: Option<String>,
}

impl ExportRef {
    pub(crate) fn list(obj: &Object, keys: &[&str]) -> Vec<Self> {
        value::array(obj, keys)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| match entry {
                        serde_json::Value::String(format) if !format.trim().is_empty() => {
                            Some(Self {
                                format: format.trim().to_string(),
                                url: None,
                            })
                        }
                        serde_json::Value::Object(inner) => Some(Self {
                            format: value::string(inner, &["format", "type", "kind"])
                                .unwrap_or_else(|| "unknown".to_string()),
                            url: value::string(inner, &["url", "download_url", "path"]),
                        }),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Audio sub-fields carried by a progress frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioFields {
    pub timeline: Vec<TimelineCue>,
    pub exports: Vec<ExportRef>,
    pub total_duration_secs: Option<f64>,
}

impl AudioFields {
    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty() && self.exports.is_empty() && self.total_duration_secs.is_none()
    }
}
