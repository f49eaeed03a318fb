//! Tandem Tab Model
//!
//! A tab is one browsing context rendered by one pane, or by two panes
//! side by side when split. Panes are owned by the rendering engine and
//! referenced here only by [`PaneId`]; a pane never points back at its tab.
//!
//! ```text
//! Single ──toggle──▶ Split { active: Secondary }
//!   ▲                   │  ▲
//!   └──────toggle───────┘  └─ set_active_side(Primary | Secondary)
//! ```

mod engine;
mod error;
mod pane;
mod state;
mod tab;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use engine::{
    EngineError, EngineEvent, LoadEvent, LoadEventKind, LoadSeq, PaneId, PaneLiveState,
    RenderEngine, SnapshotFuture, SnapshotImage, SnapshotRect,
};
pub use error::TabError;
pub use pane::{Pane, PaneLayout, PaneSide, PaneState};
pub use state::TabState;
pub use tab::{DispatchedFile, Tab};

pub type Result<T> = std::result::Result<T, TabError>;

/// Reserved address meaning "show the application home screen".
pub const HOMEPAGE_SENTINEL: &str = "tandem://home";

/// True for addresses that never count as a real page.
pub fn is_homepage_or_blank(url: &str) -> bool {
    let url = url.trim();
    url.is_empty() || url == HOMEPAGE_SENTINEL || url == "about:blank"
}
