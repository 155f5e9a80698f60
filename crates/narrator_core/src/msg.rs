use chrono::{DateTime, Utc};

use crate::{ConnectionId, JobId, RemoteManifest, TimerId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Caller wants progress for this job.
    TrackRequested { job_id: JobId },
    /// Caller no longer wants progress; closes the channel deliberately.
    StopRequested,
    /// Physical connection finished its handshake.
    ChannelOpened { connection: ConnectionId },
    /// Physical connection closed by the peer or the network.
    ChannelClosed {
        connection: ConnectionId,
        reason: Option<String>,
    },
    /// Physical connection could not be opened or written to.
    ChannelFailed {
        connection: ConnectionId,
        message: String,
    },
    /// One text frame from the push channel.
    FrameReceived {
        connection: ConnectionId,
        text: String,
        received_at: DateTime<Utc>,
    },
    /// A scheduled reconnect timer fired.
    RetryElapsed { timer: TimerId },
    /// Caller asks for the tracked job's manifest without waiting for completion.
    ManifestRequested,
    /// Manifest fetch finished.
    ManifestFetched {
        job_id: JobId,
        result: Result<RemoteManifest, String>,
    },
    /// Fallback for placeholder wiring.
    NoOp,
}
