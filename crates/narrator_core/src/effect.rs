use std::time::Duration;

use crate::{
    ConnectionId, ConnectionState, ControlFrame, JobId, ProgressSnapshot, RemoteManifest,
    SyncError, TimerId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    OpenChannel {
        connection: ConnectionId,
    },
    SendFrame {
        connection: ConnectionId,
        frame: ControlFrame,
    },
    CloseChannel {
        connection: ConnectionId,
    },
    ScheduleRetry {
        timer: TimerId,
        delay: Duration,
        attempt: u32,
    },
    CancelRetry {
        timer: TimerId,
    },
    StatusChanged(ConnectionState),
    ProgressRecorded(ProgressSnapshot),
    ErrorReported(SyncError),
    FetchManifest {
        job_id: JobId,
    },
    /// Merge this manifest into the host document and cache it.
    ReconcileManifest {
        job_id: JobId,
        manifest: RemoteManifest,
    },
}
