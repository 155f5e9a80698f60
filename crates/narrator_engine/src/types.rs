use std::fmt;

use chrono::{DateTime, Utc};
use narrator_core::{ConnectionId, JobId, RemoteManifest, TimerId};

/// Lifecycle and payload events of one physical push-channel connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Opened {
        connection: ConnectionId,
    },
    Frame {
        connection: ConnectionId,
        text: String,
        received_at: DateTime<Utc>,
    },
    Closed {
        connection: ConnectionId,
        reason: Option<String>,
    },
    Failed {
        connection: ConnectionId,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Channel(ChannelEvent),
    RetryElapsed {
        timer: TimerId,
    },
    ManifestFetched {
        job_id: JobId,
        result: Result<RemoteManifest, FetchError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    InvalidManifest,
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::InvalidManifest => write!(f, "invalid manifest"),
            FailureKind::Network => write!(f, "network error"),
        }
    }
}
