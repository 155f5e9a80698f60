use chrono::Utc;
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use narrator_core::{
    reconcile, BlobStore, Effect, ItemDecision, ManifestCache, ManifestCacheEntry, Msg,
    ReconcileOutcome, RemoteManifest, SkipReason,
};
use narrator_engine::{ChannelEvent, EngineEvent, EngineHandle};

use crate::document::HostDocument;
use crate::persistence;

/// Executes core effects against the engine, the host document and the cache.
pub struct EffectRunner {
    engine: EngineHandle,
    document: Option<Box<dyn HostDocument>>,
    store: Box<dyn BlobStore>,
    cache_key: String,
    cache: ManifestCache,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        document: Option<Box<dyn HostDocument>>,
        store: Box<dyn BlobStore>,
        cache_key: impl Into<String>,
    ) -> Self {
        let cache_key = cache_key.into();
        let cache = persistence::load_cache(store.as_ref(), &cache_key);
        Self {
            engine,
            document,
            store,
            cache_key,
            cache,
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn document_identity(&self) -> Option<String> {
        self.document.as_ref().and_then(|doc| doc.identity())
    }

    pub fn enqueue(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::OpenChannel { connection } => {
                    engine_debug!("OpenChannel connection={}", connection);
                    self.engine.open(connection);
                }
                Effect::SendFrame { connection, frame } => {
                    self.engine.send(connection, frame.to_json());
                }
                Effect::CloseChannel { connection } => {
                    engine_debug!("CloseChannel connection={}", connection);
                    self.engine.close(connection);
                }
                Effect::ScheduleRetry {
                    timer,
                    delay,
                    attempt,
                } => {
                    engine_info!("Reconnect attempt {} in {:?}", attempt, delay);
                    self.engine.schedule_retry(timer, delay);
                }
                Effect::CancelRetry { timer } => self.engine.cancel_retry(timer),
                Effect::StatusChanged(status) => engine_info!("Connection status: {}", status),
                Effect::ProgressRecorded(snapshot) => engine_debug!(
                    "Job {} {} progress={} step={:?}",
                    snapshot.job_id,
                    snapshot.status,
                    snapshot.progress,
                    snapshot.current_step
                ),
                Effect::ErrorReported(err) => engine_warn!("{}", err),
                Effect::FetchManifest { job_id } => {
                    engine_info!("Fetching manifest for job {}", job_id);
                    self.engine.fetch_manifest(job_id);
                }
                Effect::ReconcileManifest { job_id, manifest } => {
                    self.reconcile_and_cache(&job_id, manifest);
                }
            }
        }
    }

    /// Merge `manifest` into the document, then record it in the cache.
    pub fn reconcile_and_cache(
        &mut self,
        job_id: &str,
        manifest: RemoteManifest,
    ) -> Option<ReconcileOutcome> {
        let outcome = self.apply_to_document(&manifest);
        self.cache
            .put(ManifestCacheEntry::new(job_id, manifest, Utc::now()));
        persistence::save_cache(self.store.as_ref(), &self.cache_key, &self.cache);
        outcome
    }

    /// Reconcile the cached manifest for `job_id`, or for the document's own
    /// identity when no job is known. Returns the job the entry belongs to.
    pub fn resume_from_cache(&mut self, job_id: Option<&str>) -> Option<String> {
        let entry = match job_id {
            Some(job_id) => self.cache.get(job_id),
            None => self
                .document_identity()
                .and_then(|identity| self.cache.get_by_document(&identity)),
        }?
        .clone();

        engine_info!(
            "Resuming job {} from cached manifest updated {}",
            entry.job_id,
            entry.updated_at
        );
        self.apply_to_document(&entry.manifest);
        Some(entry.job_id)
    }

    fn apply_to_document(&mut self, manifest: &RemoteManifest) -> Option<ReconcileOutcome> {
        let document = self.document.as_mut()?;
        let items = document.read_items();
        let outcome = reconcile(&items, manifest);

        if let Some(diagnostic) = &outcome.diagnostic {
            engine_warn!("Manifest not applied: {:?}", diagnostic);
        }
        for decision in &outcome.decisions {
            match &decision.decision {
                ItemDecision::Skipped(SkipReason::Diverged { .. }) => engine_info!(
                    "Item {} kept: local source changed since the job started",
                    decision.item_id
                ),
                ItemDecision::Skipped(SkipReason::Unverifiable) => engine_warn!(
                    "Item {} kept: manifest carries no source to verify against",
                    decision.item_id
                ),
                ItemDecision::Applied | ItemDecision::PassThrough => {}
            }
        }
        engine_info!(
            "Reconciled {} items: {} applied, {} skipped",
            outcome.merged_items.len(),
            outcome.applied_count(),
            outcome.skipped_item_ids.len()
        );

        if let Err(err) = document.apply_merged_items(
            outcome.merged_items.clone(),
            outcome.resolved_document_identity.clone(),
        ) {
            engine_error!("Failed to write reconciled document: {}", err);
        }
        Some(outcome)
    }
}

/// Translate an engine event into a core message.
pub fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Channel(ChannelEvent::Opened { connection }) => {
            Msg::ChannelOpened { connection }
        }
        EngineEvent::Channel(ChannelEvent::Frame {
            connection,
            text,
            received_at,
        }) => Msg::FrameReceived {
            connection,
            text,
            received_at,
        },
        EngineEvent::Channel(ChannelEvent::Closed { connection, reason }) => {
            Msg::ChannelClosed { connection, reason }
        }
        EngineEvent::Channel(ChannelEvent::Failed {
            connection,
            message,
        }) => Msg::ChannelFailed {
            connection,
            message,
        },
        EngineEvent::RetryElapsed { timer } => Msg::RetryElapsed { timer },
        EngineEvent::ManifestFetched { job_id, result } => Msg::ManifestFetched {
            job_id,
            result: result.map_err(|err| err.to_string()),
        },
    }
}
