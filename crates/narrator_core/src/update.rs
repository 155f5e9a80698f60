use crate::backoff::reconnect_delay;
use crate::normalize::{normalize_frame, ControlEvent, Normalized};
use crate::state::{DesiredState, JobSubscription, Link, ManifestFetch};
use crate::{
    ConnectionId, ConnectionState, ControlFrame, Effect, JobId, JobStatus, Msg, SyncError,
    SyncState, TimerId,
};

/// Pure update function: applies a message to state and returns any effects.
///
/// This is the only place connection state transitions happen. Events that
/// name a connection or timer other than the current one are ignored.
pub fn update(mut state: SyncState, msg: Msg) -> (SyncState, Vec<Effect>) {
    let mut effects = Vec::new();
    match msg {
        Msg::TrackRequested { job_id } => track(&mut state, job_id, &mut effects),
        Msg::StopRequested => stop(&mut state, &mut effects),
        Msg::ChannelOpened { connection } => opened(&mut state, connection, &mut effects),
        Msg::ChannelClosed { connection, reason } => {
            link_lost(&mut state, connection, LinkLoss::Closed(reason), &mut effects)
        }
        Msg::ChannelFailed {
            connection,
            message,
        } => link_lost(&mut state, connection, LinkLoss::Failed(message), &mut effects),
        Msg::FrameReceived {
            connection,
            text,
            received_at,
        } => {
            if state.link.connection() != Some(connection)
                || !matches!(state.link, Link::Open { .. })
            {
                return (state, effects);
            }
            match normalize_frame(&text, received_at) {
                Ok(Normalized::Snapshot(snapshot)) => {
                    let ours = state.tracked_job() == Some(&snapshot.job_id);
                    if ours && snapshot.is_terminal() && state.terminal_status.is_none() {
                        state.terminal_status = Some(snapshot.status.clone());
                    }
                    let trigger_fetch = ours
                        && snapshot.status == JobStatus::Completed
                        && state.manifest_fetch == ManifestFetch::Idle;
                    state.history.push(snapshot.clone());
                    state.mark_dirty();
                    effects.push(Effect::ProgressRecorded(snapshot));
                    if trigger_fetch {
                        request_manifest(&mut state, &mut effects);
                    }
                }
                Ok(Normalized::Control(event)) => control(&mut state, event, &mut effects),
                Err(err) => report(
                    &mut state,
                    SyncError::Protocol {
                        message: err.to_string(),
                    },
                    &mut effects,
                ),
            }
        }
        Msg::RetryElapsed { timer } => retry_elapsed(&mut state, timer, &mut effects),
        Msg::ManifestRequested => {
            if state.tracked_job().is_some() && state.manifest_fetch != ManifestFetch::InFlight {
                request_manifest(&mut state, &mut effects);
            }
        }
        Msg::ManifestFetched { job_id, result } => {
            // A result for a job we stopped tracking is stale.
            if state.tracked_job() != Some(&job_id) {
                return (state, effects);
            }
            match result {
                Ok(manifest) => {
                    state.manifest_fetch = ManifestFetch::Done;
                    state.mark_dirty();
                    effects.push(Effect::ReconcileManifest { job_id, manifest });
                }
                Err(message) => {
                    state.manifest_fetch = ManifestFetch::Idle;
                    report(
                        &mut state,
                        SyncError::ManifestFetch { job_id, message },
                        &mut effects,
                    );
                }
            }
        }
        Msg::NoOp => {}
    }

    (state, effects)
}

fn track(state: &mut SyncState, job_id: JobId, effects: &mut Vec<Effect>) {
    let job_id = job_id.trim().to_string();
    if job_id.is_empty() {
        report(state, SyncError::EmptyJobId, effects);
        return;
    }
    if state.tracked_job() == Some(&job_id) {
        return;
    }

    state.subscription = Some(JobSubscription {
        job_id: job_id.clone(),
        desired_state: DesiredState::Subscribed,
    });
    state.manual_close = false;
    state.confirmed = false;
    state.manifest_fetch = ManifestFetch::Idle;
    state.terminal_status = None;
    state.mark_dirty();

    match &mut state.link {
        Link::Open {
            connection,
            subscribed_job,
        } => {
            // Switching jobs is logical; the physical connection stays up.
            if let Some(previous) = subscribed_job.take() {
                if previous != job_id {
                    effects.push(Effect::SendFrame {
                        connection: *connection,
                        frame: ControlFrame::unsubscribe(previous),
                    });
                }
            }
            effects.push(Effect::SendFrame {
                connection: *connection,
                frame: ControlFrame::subscribe(job_id.clone()),
            });
            *subscribed_job = Some(job_id);
            return;
        }
        // The subscribe frame goes out once the handshake completes.
        Link::Opening { .. } => return,
        Link::Idle => {}
    }

    if state.pending_retry.is_none() {
        open_connection(state, ConnectionState::Connecting, effects);
    }
}

fn stop(state: &mut SyncState, effects: &mut Vec<Effect>) {
    state.manual_close = true;
    if state.subscription.take().is_some() {
        state.mark_dirty();
    }
    state.confirmed = false;
    state.manifest_fetch = ManifestFetch::Idle;
    state.terminal_status = None;
    state.attempt = 0;

    if let Some(timer) = state.pending_retry.take() {
        effects.push(Effect::CancelRetry { timer });
    }
    match std::mem::take(&mut state.link) {
        Link::Open {
            connection,
            subscribed_job,
        } => {
            if let Some(job_id) = subscribed_job {
                effects.push(Effect::SendFrame {
                    connection,
                    frame: ControlFrame::unsubscribe(job_id),
                });
            }
            effects.push(Effect::CloseChannel { connection });
        }
        Link::Opening { connection } => effects.push(Effect::CloseChannel { connection }),
        Link::Idle => {}
    }
    set_status(state, ConnectionState::Disconnected, effects);
}

fn opened(state: &mut SyncState, connection: ConnectionId, effects: &mut Vec<Effect>) {
    if matches!(state.link, Link::Open { connection: current, .. } if current == connection) {
        return;
    }
    if state.link != (Link::Opening { connection }) {
        // Superseded or stopped while the handshake was in flight.
        effects.push(Effect::CloseChannel { connection });
        return;
    }

    state.attempt = 0;
    let subscribed_job = state.tracked_job().cloned();
    if let Some(job_id) = &subscribed_job {
        effects.push(Effect::SendFrame {
            connection,
            frame: ControlFrame::subscribe(job_id.clone()),
        });
    }
    state.link = Link::Open {
        connection,
        subscribed_job,
    };
    set_status(state, ConnectionState::Connected, effects);
}

enum LinkLoss {
    Closed(Option<String>),
    Failed(String),
}

fn link_lost(
    state: &mut SyncState,
    connection: ConnectionId,
    loss: LinkLoss,
    effects: &mut Vec<Effect>,
) {
    if state.manual_close || state.link.connection() != Some(connection) {
        return;
    }
    state.link = Link::Idle;
    state.confirmed = false;

    match loss {
        LinkLoss::Failed(message) => {
            report(state, SyncError::Transport { message }, effects);
            set_status(state, ConnectionState::Error, effects);
        }
        LinkLoss::Closed(Some(reason)) if !reason.trim().is_empty() => {
            report(state, SyncError::Closed { reason }, effects);
        }
        LinkLoss::Closed(_) => {}
    }

    if state.tracked_job().is_none() {
        set_status(state, ConnectionState::Disconnected, effects);
        return;
    }

    state.attempt = state.attempt.saturating_add(1);
    state.next_timer += 1;
    let timer = state.next_timer;
    state.pending_retry = Some(timer);
    set_status(state, ConnectionState::Reconnecting, effects);
    effects.push(Effect::ScheduleRetry {
        timer,
        delay: reconnect_delay(state.attempt),
        attempt: state.attempt,
    });
}

fn retry_elapsed(state: &mut SyncState, timer: TimerId, effects: &mut Vec<Effect>) {
    if state.pending_retry != Some(timer) {
        return;
    }
    state.pending_retry = None;
    if state.tracked_job().is_none() || state.link != Link::Idle {
        return;
    }
    open_connection(state, ConnectionState::Reconnecting, effects);
}

fn control(state: &mut SyncState, event: ControlEvent, effects: &mut Vec<Effect>) {
    match event {
        ControlEvent::Connected => {}
        ControlEvent::Subscribed { job_id } => {
            let ours = match (&job_id, state.tracked_job()) {
                (Some(confirmed), Some(tracked)) => confirmed == tracked,
                (None, Some(_)) => true,
                (_, None) => false,
            };
            if ours && !state.confirmed {
                state.confirmed = true;
                state.mark_dirty();
            }
        }
        ControlEvent::Unsubscribed { job_id } => {
            if job_id.is_some() && job_id.as_ref() == state.tracked_job() && state.confirmed {
                state.confirmed = false;
                state.mark_dirty();
            }
        }
        ControlEvent::ChannelError { message } => {
            report(state, SyncError::Channel { message }, effects)
        }
    }
}

fn request_manifest(state: &mut SyncState, effects: &mut Vec<Effect>) {
    if let Some(job_id) = state.tracked_job().cloned() {
        state.manifest_fetch = ManifestFetch::InFlight;
        effects.push(Effect::FetchManifest { job_id });
    }
}

fn open_connection(state: &mut SyncState, status: ConnectionState, effects: &mut Vec<Effect>) {
    state.next_connection += 1;
    let connection = state.next_connection;
    state.link = Link::Opening { connection };
    set_status(state, status, effects);
    effects.push(Effect::OpenChannel { connection });
}

fn set_status(state: &mut SyncState, next: ConnectionState, effects: &mut Vec<Effect>) {
    if state.status != next {
        state.status = next;
        state.mark_dirty();
        effects.push(Effect::StatusChanged(next));
    }
}

fn report(state: &mut SyncState, error: SyncError, effects: &mut Vec<Effect>) {
    state.last_error = Some(error.clone());
    state.mark_dirty();
    effects.push(Effect::ErrorReported(error));
}
