use std::fmt;

use crate::history::HistoryRing;
use crate::view_model::SyncViewModel;
use crate::{JobId, JobStatus};

pub type ConnectionId = u64;
pub type TimerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Error,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    Subscribed,
    Unsubscribed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSubscription {
    pub job_id: JobId,
    pub desired_state: DesiredState,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("transport error: {message}")]
    Transport { message: String },
    #[error("protocol error: {message}")]
    Protocol { message: String },
    #[error("channel reported: {message}")]
    Channel { message: String },
    #[error("channel closed by peer: {reason}")]
    Closed { reason: String },
    #[error("manifest fetch for job {job_id} failed: {message}")]
    ManifestFetch { job_id: JobId, message: String },
    #[error("job id must not be empty")]
    EmptyJobId,
}

/// Physical connection as seen by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum Link {
    #[default]
    Idle,
    Opening {
        connection: ConnectionId,
    },
    Open {
        connection: ConnectionId,
        subscribed_job: Option<JobId>,
    },
}

impl Link {
    pub(crate) fn connection(&self) -> Option<ConnectionId> {
        match self {
            Link::Idle => None,
            Link::Opening { connection } | Link::Open { connection, .. } => Some(*connection),
        }
    }
}

/// One-shot manifest fetch guard for the tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ManifestFetch {
    #[default]
    Idle,
    InFlight,
    Done,
}

/// Connection supervisor state plus the session's progress history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncState {
    pub(crate) status: ConnectionState,
    pub(crate) subscription: Option<JobSubscription>,
    pub(crate) link: Link,
    pub(crate) attempt: u32,
    pub(crate) manual_close: bool,
    pub(crate) confirmed: bool,
    pub(crate) next_connection: ConnectionId,
    pub(crate) next_timer: TimerId,
    pub(crate) pending_retry: Option<TimerId>,
    pub(crate) manifest_fetch: ManifestFetch,
    /// First terminal status seen for the tracked job; later snapshots never clear it.
    pub(crate) terminal_status: Option<JobStatus>,
    pub(crate) history: HistoryRing,
    pub(crate) last_error: Option<SyncError>,
    dirty: bool,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> SyncViewModel {
        SyncViewModel {
            status: self.status,
            tracked_job: self.tracked_job().cloned(),
            attempt: self.attempt,
            confirmed: self.confirmed,
            latest: self.history.latest().cloned(),
            history_len: self.history.len(),
            last_error: self.last_error.clone(),
            terminal_status: self.terminal_status.clone(),
            manifest_reconciled: self.manifest_fetch == ManifestFetch::Done,
            dirty: self.dirty,
        }
    }

    pub fn status(&self) -> ConnectionState {
        self.status
    }

    /// Job with `Subscribed` intent, if any.
    pub fn tracked_job(&self) -> Option<&JobId> {
        self.subscription
            .as_ref()
            .filter(|sub| sub.desired_state == DesiredState::Subscribed)
            .map(|sub| &sub.job_id)
    }

    pub fn subscription(&self) -> Option<&JobSubscription> {
        self.subscription.as_ref()
    }

    pub fn history(&self) -> &HistoryRing {
        &self.history
    }

    /// Drop accumulated snapshots. The supervisor never does this itself.
    pub fn clear_history(&mut self) {
        if !self.history.is_empty() {
            self.history.clear();
            self.mark_dirty();
        }
    }

    pub fn terminal_status(&self) -> Option<&JobStatus> {
        self.terminal_status.as_ref()
    }

    pub fn is_manual_close(&self) -> bool {
        self.manual_close
    }

    pub fn pending_retry(&self) -> Option<TimerId> {
        self.pending_retry
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
