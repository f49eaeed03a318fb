//! Rendering engine contract
//!
//! The engine owns every pane. The session only issues commands through
//! [`RenderEngine`] and receives [`EngineEvent`]s back on its event channel.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque handle for an engine-owned rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaneId(pub u64);

impl std::fmt::Display for PaneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pane-{}", self.0)
    }
}

/// Sequence number tagging one issued load.
///
/// The engine echoes the number it was handed with every lifecycle event
/// belonging to that load, so events from a superseded load can be told
/// apart from the current one. Navigations the engine starts on its own
/// (link clicks, redirects) carry the latest number it was handed, whether
/// by a load or by a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct LoadSeq(pub u64);

impl LoadSeq {
    pub const ZERO: LoadSeq = LoadSeq(0);

    pub fn next(self) -> LoadSeq {
        LoadSeq(self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadEventKind {
    Started,
    Committed {
        url: String,
    },
    Finished {
        url: String,
        title: String,
        can_go_back: bool,
        can_go_forward: bool,
    },
    Failed {
        reason: String,
    },
}

impl LoadEventKind {
    pub fn name(&self) -> &'static str {
        match self {
            LoadEventKind::Started => "started",
            LoadEventKind::Committed { .. } => "committed",
            LoadEventKind::Finished { .. } => "finished",
            LoadEventKind::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadEvent {
    pub pane: PaneId,
    pub seq: LoadSeq,
    pub kind: LoadEventKind,
}

/// Everything an engine can report about its panes.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Load(LoadEvent),
    /// Content asked to open `url` in a new browsing context
    /// (middle click, `target=_blank`, link dragged out of the pane).
    OpenInNewContext { pane: PaneId, url: String },
}

impl EngineEvent {
    pub fn pane(&self) -> PaneId {
        match self {
            EngineEvent::Load(event) => event.pane,
            EngineEvent::OpenInNewContext { pane, .. } => *pane,
        }
    }
}

/// What the engine currently knows about a pane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaneLiveState {
    pub current_url: Option<String>,
    pub current_title: Option<String>,
    pub is_loading: bool,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

/// Region of a pane to capture, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotImage {
    pub width: u32,
    pub height: u32,
    /// Encoded image bytes (PNG)
    pub data: Vec<u8>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Pane {0} does not exist")]
    UnknownPane(PaneId),

    #[error("Snapshot failed: {0}")]
    Snapshot(String),
}

pub type SnapshotFuture = BoxFuture<'static, Result<SnapshotImage, EngineError>>;

/// Narrow capability interface onto the rendering engine.
///
/// Commands are fire-and-forget; outcomes arrive later as [`EngineEvent`]s
/// tagged with the [`LoadSeq`] passed in here.
pub trait RenderEngine: Send + Sync {
    fn create_pane(&self) -> PaneId;
    fn release_pane(&self, pane: PaneId);

    fn load(&self, pane: PaneId, url: &str, seq: LoadSeq);
    /// Abandon whatever `pane` is loading. Later events from the pane are
    /// tagged with `seq`.
    fn stop(&self, pane: PaneId, seq: LoadSeq);
    fn go_back(&self, pane: PaneId, seq: LoadSeq);
    fn go_forward(&self, pane: PaneId, seq: LoadSeq);
    fn reload(&self, pane: PaneId, seq: LoadSeq);

    fn snapshot(&self, pane: PaneId, rect: SnapshotRect) -> SnapshotFuture;
    fn live_state(&self, pane: PaneId) -> Option<PaneLiveState>;
}
