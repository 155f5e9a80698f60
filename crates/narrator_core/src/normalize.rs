use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::snapshot::{AudioFields, ContextualInsights, ExportRef, JobId, JobStatus, TimelineCue};
use crate::value::{self, Object};
use crate::ProgressSnapshot;

/// Side-channel signal from the push channel. Never appended to history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    Connected,
    Subscribed { job_id: Option<JobId> },
    Unsubscribed { job_id: Option<JobId> },
    ChannelError { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Snapshot(ProgressSnapshot),
    Control(ControlEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("unrecognized control event `{0}`")]
    UnknownEvent(String),
    #[error("data frame is missing a job identifier")]
    MissingJobId,
    #[error("data frame for job {job_id} has no numeric progress value")]
    MissingProgress { job_id: JobId },
}

/// Parse and normalize one text frame from the push channel.
pub fn normalize_frame(
    text: &str,
    received_at: DateTime<Utc>,
) -> Result<Normalized, NormalizeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| NormalizeError::InvalidJson(err.to_string()))?;
    normalize(&value, received_at)
}

/// Classify a decoded frame as a control event or a progress snapshot.
///
/// Control frames carry an `event` field. A frame with an unknown `event`
/// is still treated as data when it names a job, since some backends tag
/// progress frames with `event: "progress"`.
pub fn normalize(value: &Value, received_at: DateTime<Utc>) -> Result<Normalized, NormalizeError> {
    let frame = value.as_object().ok_or(NormalizeError::NotAnObject)?;

    if let Some(event) = value::string(frame, &["event", "type"]) {
        if let Some(control) = control_event(&event, frame) {
            return Ok(Normalized::Control(control));
        }
        if value::first(frame, &["job_id", "jobId"]).is_none() {
            return Err(NormalizeError::UnknownEvent(event));
        }
    }

    snapshot(frame, received_at).map(Normalized::Snapshot)
}

fn control_event(event: &str, frame: &Object) -> Option<ControlEvent> {
    let job_id = || value::string(frame, &["job_id", "jobId"]);
    match event.to_ascii_lowercase().as_str() {
        "connected" => Some(ControlEvent::Connected),
        "subscribed" => Some(ControlEvent::Subscribed { job_id: job_id() }),
        "unsubscribed" => Some(ControlEvent::Unsubscribed { job_id: job_id() }),
        "error" => Some(ControlEvent::ChannelError {
            message: value::text(frame, &["message", "error", "detail"])
                .unwrap_or_else(|| "unspecified channel error".to_string()),
        }),
        _ => None,
    }
}

fn snapshot(frame: &Object, received_at: DateTime<Utc>) -> Result<ProgressSnapshot, NormalizeError> {
    let job_id = value::string(frame, &["job_id", "jobId"]).ok_or(NormalizeError::MissingJobId)?;
    let Some(progress) = value::json_number(frame, &["progress"]) else {
        return Err(NormalizeError::MissingProgress { job_id });
    };

    let result = value::object(frame, &["result"]);
    let status = value::string(frame, &["status", "state"])
        .map(|raw| JobStatus::parse(&raw))
        .unwrap_or_else(|| JobStatus::Unknown(String::new()));

    Ok(ProgressSnapshot {
        job_id,
        status,
        current_step: value::text(frame, &["current_step", "step", "stage"]).unwrap_or_default(),
        current_slide: value::count(frame, &["current_slide"]).unwrap_or(0),
        total_slides: value::count(frame, &["total_slides"]).unwrap_or(0),
        progress,
        estimated_seconds_remaining: value::number(
            frame,
            &["estimated_time_remaining", "eta_seconds", "eta"],
        ),
        message: value::text(frame, &["message"]),
        error_message: value::text(frame, &["error", "error_message"]),
        received_at,
        contextual: contextual_fields(frame, result),
        audio: audio_fields(frame, result),
    })
}

fn contextual_fields(frame: &Object, result: Option<&Object>) -> Option<ContextualInsights> {
    const KEYS: &[&str] = &["contextual_insights", "contextual", "insights"];
    result
        .and_then(|result| value::object(result, KEYS))
        .or_else(|| value::object(frame, KEYS))
        .and_then(ContextualInsights::from_object)
        .map(ContextualInsights::clamped)
}

fn audio_fields(frame: &Object, result: Option<&Object>) -> Option<AudioFields> {
    let source = result.unwrap_or(frame);
    let audio = value::object(source, &["audio", "audio_summary"]);

    let mut fields = AudioFields::default();
    if let Some(audio) = audio {
        fields.timeline = TimelineCue::list(audio, &["timeline", "segments"]);
        fields.exports = ExportRef::list(audio, &["exports"]);
        fields.total_duration_secs =
            value::number(audio, &["total_duration", "total_duration_secs", "duration"]);
    }
    if fields.exports.is_empty() {
        fields.exports = ExportRef::list(source, &["exports", "export_list"]);
    }

    (!fields.is_empty()).then_some(fields)
}
