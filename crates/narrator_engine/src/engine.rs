use std::collections::HashMap;
use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use narrator_core::{ConnectionId, JobId, TimerId};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::task::JoinHandle;

use crate::channel::{run_connection, ChannelCommand, ChannelEventSink, EventSink};
use crate::fetch::{ManifestFetcher, ReqwestManifestFetcher};
use crate::{ChannelSettings, EngineEvent, FetchSettings};

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub channel: ChannelSettings,
    pub fetch: FetchSettings,
}

enum EngineCommand {
    Open { connection: ConnectionId },
    Send { connection: ConnectionId, text: String },
    Close { connection: ConnectionId },
    ScheduleRetry { timer: TimerId, delay: Duration },
    CancelRetry { timer: TimerId },
    FetchManifest { job_id: JobId },
}

/// Owns the IO runtime. Commands go in, `EngineEvent`s come out; the caller
/// never blocks on network work.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> io::Result<Self> {
        let fetcher = Arc::new(ReqwestManifestFetcher::new(settings.fetch.clone()));
        Self::with_fetcher(settings, fetcher)
    }

    pub fn with_fetcher(
        settings: EngineSettings,
        fetcher: Arc<dyn ManifestFetcher>,
    ) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;
        let sink: Arc<dyn EventSink> = Arc::new(ChannelEventSink::new(event_tx));

        thread::Builder::new()
            .name("narrator-engine".into())
            .spawn(move || {
                let mut worker = Worker {
                    runtime,
                    channel: settings.channel,
                    fetcher,
                    sink,
                    connections: HashMap::new(),
                    timers: HashMap::new(),
                };
                while let Ok(command) = cmd_rx.recv() {
                    worker.handle(command);
                }
                engine_debug!("Engine command channel closed; shutting down");
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn open(&self, connection: ConnectionId) {
        let _ = self.cmd_tx.send(EngineCommand::Open { connection });
    }

    pub fn send(&self, connection: ConnectionId, text: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Send {
            connection,
            text: text.into(),
        });
    }

    pub fn close(&self, connection: ConnectionId) {
        let _ = self.cmd_tx.send(EngineCommand::Close { connection });
    }

    pub fn schedule_retry(&self, timer: TimerId, delay: Duration) {
        let _ = self.cmd_tx.send(EngineCommand::ScheduleRetry { timer, delay });
    }

    pub fn cancel_retry(&self, timer: TimerId) {
        let _ = self.cmd_tx.send(EngineCommand::CancelRetry { timer });
    }

    pub fn fetch_manifest(&self, job_id: impl Into<JobId>) {
        let _ = self.cmd_tx.send(EngineCommand::FetchManifest {
            job_id: job_id.into(),
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

struct Worker {
    runtime: tokio::runtime::Runtime,
    channel: ChannelSettings,
    fetcher: Arc<dyn ManifestFetcher>,
    sink: Arc<dyn EventSink>,
    connections: HashMap<ConnectionId, UnboundedSender<ChannelCommand>>,
    timers: HashMap<TimerId, JoinHandle<()>>,
}

impl Worker {
    fn handle(&mut self, command: EngineCommand) {
        self.connections.retain(|_, tx| !tx.is_closed());
        self.timers.retain(|_, handle| !handle.is_finished());

        match command {
            EngineCommand::Open { connection } => {
                let (tx, rx) = unbounded_channel();
                let settings = self.channel.clone();
                let sink = self.sink.clone();
                self.runtime.spawn(async move {
                    run_connection(connection, settings, rx, sink.as_ref()).await;
                });
                if let Some(previous) = self.connections.insert(connection, tx) {
                    let _ = previous.send(ChannelCommand::Close);
                }
            }
            EngineCommand::Send { connection, text } => match self.connections.get(&connection) {
                Some(tx) => {
                    let _ = tx.send(ChannelCommand::Send(text));
                }
                None => engine_warn!("Dropping frame for unknown connection {connection}"),
            },
            EngineCommand::Close { connection } => {
                if let Some(tx) = self.connections.remove(&connection) {
                    let _ = tx.send(ChannelCommand::Close);
                }
            }
            EngineCommand::ScheduleRetry { timer, delay } => {
                let sink = self.sink.clone();
                let handle = self.runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    sink.emit(EngineEvent::RetryElapsed { timer });
                });
                if let Some(previous) = self.timers.insert(timer, handle) {
                    previous.abort();
                }
            }
            EngineCommand::CancelRetry { timer } => {
                if let Some(handle) = self.timers.remove(&timer) {
                    handle.abort();
                }
            }
            EngineCommand::FetchManifest { job_id } => {
                let fetcher = self.fetcher.clone();
                let sink = self.sink.clone();
                self.runtime.spawn(async move {
                    let result = fetcher.fetch_manifest(&job_id).await;
                    sink.emit(EngineEvent::ManifestFetched { job_id, result });
                });
            }
        }
    }
}
