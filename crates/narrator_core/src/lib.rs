//! Narrator core: pure sync state machine, progress normalization and
//! manifest reconciliation. No IO happens in this crate.
mod backoff;
mod cache;
mod effect;
mod fingerprint;
mod frame;
mod history;
mod item;
mod manifest;
mod msg;
mod normalize;
mod reconcile;
mod snapshot;
mod state;
mod store;
mod update;
mod value;
mod view_model;

pub use backoff::{reconnect_delay, MAX_RECONNECT_DELAY};
pub use cache::{CacheError, ManifestCache, ManifestCacheEntry};
pub use effect::Effect;
pub use fingerprint::{content_fingerprint, normalize_content};
pub use frame::{ChannelAction, ControlFrame};
pub use history::{HistoryRing, HISTORY_CAPACITY};
pub use item::{
    estimate_duration_secs, word_count, AudioReference, DerivedFields, LocalItem, RemoteMetrics,
    WORDS_PER_MINUTE,
};
pub use manifest::{AudioSummary, ManifestError, ManifestItem, RemoteManifest};
pub use msg::Msg;
pub use normalize::{normalize, normalize_frame, ControlEvent, NormalizeError, Normalized};
pub use reconcile::{
    reconcile, ItemDecision, ItemReconciliation, ReconcileDiagnostic, ReconcileOutcome, SkipReason,
};
pub use snapshot::{
    AudioFields, ContextualInsights, ExportRef, JobId, JobStatus, ProgressSnapshot, TimelineCue,
};
pub use state::{
    ConnectionId, ConnectionState, DesiredState, JobSubscription, SyncError, SyncState, TimerId,
};
pub use store::{BlobStore, MemoryBlobStore, StoreError};
pub use update::update;
pub use value::clamp_unit;
pub use view_model::SyncViewModel;
