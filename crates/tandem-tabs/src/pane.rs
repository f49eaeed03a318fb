//! Pane bookkeeping and split layout

use serde::{Deserialize, Serialize};

use crate::engine::{LoadSeq, PaneId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaneSide {
    Primary,
    Secondary,
}

impl PaneSide {
    pub fn opposite(self) -> PaneSide {
        match self {
            PaneSide::Primary => PaneSide::Secondary,
            PaneSide::Secondary => PaneSide::Primary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaneSide::Primary => "primary",
            PaneSide::Secondary => "secondary",
        }
    }
}

impl std::fmt::Display for PaneSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Last-known navigational state of one pane.
///
/// Kept up to date for inactive panes too, so switching sides shows what
/// the pane was doing without asking the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaneState {
    pub url: String,
    pub title: String,
    pub is_loading: bool,
    /// 0.0 ..= 1.0
    pub progress: f64,
    pub error: Option<String>,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    /// Sequence number of the load this pane is currently showing
    pub load_seq: LoadSeq,
    /// An explicit "go home" is in flight, so sentinel updates are accepted
    pub home_pending: bool,
}

impl PaneState {
    /// Record that a new load was issued. `url` is `None` for history
    /// traversal and reloads, where the destination is not known yet.
    pub fn begin_load(&mut self, seq: LoadSeq, url: Option<&str>) {
        self.load_seq = seq;
        self.is_loading = true;
        self.progress = 0.0;
        self.error = None;

        if let Some(url) = url {
            if url != self.url {
                self.title = String::new(); // Reset title until page loads
            }
            self.url = url.to_string();
        }
    }

    /// Abandon whatever is loading. `seq` supersedes the cancelled load so
    /// its late events are discarded.
    pub fn cancel_load(&mut self, seq: LoadSeq) {
        self.load_seq = seq;
        self.is_loading = false;
        self.progress = 0.0;
        self.home_pending = false;
    }

    /// True if an event tagged `seq` belongs to a load this pane has
    /// already moved past.
    pub fn is_stale(&self, seq: LoadSeq) -> bool {
        seq < self.load_seq
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pane {
    pub id: PaneId,
    pub state: PaneState,
}

impl Pane {
    pub fn new(id: PaneId) -> Self {
        Self {
            id,
            state: PaneState::default(),
        }
    }
}

/// Whether a tab is split, and which side has focus.
///
/// The secondary pane lives inside the `Split` variant, so a secondary
/// pane without a split (or a secondary focus without a secondary pane)
/// cannot be represented.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layout", rename_all = "lowercase")]
pub enum PaneLayout {
    Single,
    Split { secondary: Pane, active: PaneSide },
}

impl PaneLayout {
    pub fn is_split(&self) -> bool {
        matches!(self, PaneLayout::Split { .. })
    }

    pub fn active_side(&self) -> PaneSide {
        match self {
            PaneLayout::Single => PaneSide::Primary,
            PaneLayout::Split { active, .. } => *active,
        }
    }
}
