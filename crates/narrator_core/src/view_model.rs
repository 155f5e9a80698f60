use crate::{ConnectionState, JobId, JobStatus, ProgressSnapshot, SyncError};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncViewModel {
    pub status: ConnectionState,
    pub tracked_job: Option<JobId>,
    pub attempt: u32,
    /// The server acknowledged the current subscription.
    pub confirmed: bool,
    pub latest: Option<ProgressSnapshot>,
    pub history_len: usize,
    pub last_error: Option<SyncError>,
    /// Terminal status of the tracked job, regardless of frame order.
    pub terminal_status: Option<JobStatus>,
    pub manifest_reconciled: bool,
    pub dirty: bool,
}

impl SyncViewModel {
    /// One-line status for logs and terminals.
    pub fn summary(&self) -> String {
        let job = self.tracked_job.as_deref().unwrap_or("-");
        match &self.latest {
            Some(latest) => format!(
                "[{}] job {} {} {:.0}% slide {}/{} {}",
                self.status,
                job,
                latest.status,
                latest.progress * 100.0,
                latest.current_slide,
                latest.total_slides,
                latest.current_step
            ),
            None => format!("[{}] job {} (no progress yet)", self.status, job),
        }
    }
}
