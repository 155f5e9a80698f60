use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use narrator_core::{update, JobStatus, Msg, SyncState};
use narrator_engine::EngineEvent;

use crate::effects::{to_msg, EffectRunner};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The job completed and its manifest was reconciled.
    Completed,
    /// The job reached a terminal status other than completed.
    JobEnded(JobStatus),
    /// The job completed but its manifest could not be fetched.
    ManifestUnavailable,
    /// No job to follow; a cached manifest was applied.
    ResumedFromCache,
    NothingToTrack,
}

/// Single-threaded dispatch loop: engine events in, core effects out.
pub struct Session {
    state: SyncState,
    runner: EffectRunner,
    follow: bool,
}

impl Session {
    pub fn new(runner: EffectRunner, follow: bool) -> Self {
        Self {
            state: SyncState::new(),
            runner,
            follow,
        }
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            engine_info!("{}", state.view().summary());
        }
        self.state = state;
        self.runner.enqueue(effects);
    }

    pub fn run(mut self, job: Option<String>) -> SessionOutcome {
        let resumed = self.runner.resume_from_cache(job.as_deref());

        let Some(job_id) = job else {
            return match resumed {
                Some(job_id) => {
                    engine_info!("Applied cached manifest of job {}", job_id);
                    SessionOutcome::ResumedFromCache
                }
                None => SessionOutcome::NothingToTrack,
            };
        };

        self.dispatch(Msg::TrackRequested { job_id });
        if self.state.tracked_job().is_none() {
            return SessionOutcome::NothingToTrack;
        }

        loop {
            let Some(event) = self.runner.engine().recv_timeout(POLL_INTERVAL) else {
                continue;
            };
            let fetch_failed = matches!(
                event,
                EngineEvent::ManifestFetched { result: Err(_), .. }
            );
            self.dispatch(to_msg(event));

            if self.follow {
                continue;
            }
            if let Some(outcome) = self.finished(fetch_failed) {
                self.dispatch(Msg::StopRequested);
                return outcome;
            }
        }
    }

    fn finished(&self, fetch_failed: bool) -> Option<SessionOutcome> {
        let view = self.state.view();
        let job_id = view.tracked_job.as_deref()?;
        match view.terminal_status? {
            JobStatus::Completed if view.manifest_reconciled => Some(SessionOutcome::Completed),
            JobStatus::Completed if fetch_failed => {
                engine_warn!("Manifest for job {} could not be fetched", job_id);
                Some(SessionOutcome::ManifestUnavailable)
            }
            JobStatus::Completed => None,
            other => Some(SessionOutcome::JobEnded(other)),
        }
    }
}
