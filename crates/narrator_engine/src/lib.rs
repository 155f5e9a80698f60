//! Narrator engine: push-channel connections, retry timers, manifest
//! fetching and on-disk persistence.
mod channel;
mod engine;
mod fetch;
mod persist;
mod types;

pub use channel::{run_connection, ChannelCommand, ChannelEventSink, ChannelSettings, EventSink};
pub use engine::{EngineHandle, EngineSettings};
pub use fetch::{FetchSettings, ManifestFetcher, ReqwestManifestFetcher};
pub use persist::{ensure_state_dir, AtomicFileWriter, FileBlobStore, PersistError};
pub use types::{ChannelEvent, EngineEvent, FailureKind, FetchError};
