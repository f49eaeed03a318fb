//! Tandem Core
//!
//! Wires the session store to its collaborators and runs it on a single
//! task. The rendering engine owns every pane; everything else about tabs,
//! split view, previews, history and downloads lives here.

mod actor;
mod browser;
mod config;
mod error;

pub use actor::{engine_channel, EngineEventSink, EngineEvents, SessionActor, SessionHandle};
pub use browser::{Browser, Followup, SessionNotification};
pub use config::Config;
pub use error::CoreError;

// Re-export core components
pub use tandem_download::{DownloadError, DownloadRecord, DownloadState, DownloadTracker};
pub use tandem_files::{Dispatch, FileContentDispatcher, FileError};
pub use tandem_navigation::{
    HistoryRecord, HistoryTracker, InputResolution, InputResolver, NavigationError,
};
pub use tandem_preview::{Preview, PreviewConfig};
pub use tandem_session::{SessionError, SessionState, SessionStore};
pub use tandem_storage::{Database, StorageError};
pub use tandem_tabs::{
    EngineError, EngineEvent, LoadEvent, LoadEventKind, LoadSeq, PaneId, PaneLiveState,
    PaneSide, RenderEngine, SnapshotImage, SnapshotRect, Tab, TabError, TabState,
    HOMEPAGE_SENTINEL,
};

pub type Result<T> = std::result::Result<T, CoreError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
