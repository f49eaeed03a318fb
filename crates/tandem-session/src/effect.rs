//! Side effects queued by the store for its collaborators

use tandem_navigation::PageVisit;
use tandem_tabs::PaneSide;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// The tab's preview is out of date
    PreviewInvalidated { tab_id: String },
    /// The tab is gone; drop its preview and any capture in flight
    PreviewAbandoned { tab_id: String },
    /// Show an error card instead of a snapshot
    PreviewErrorCard { tab_id: String, reason: String },
    Visit(PageVisit),
    /// Move keyboard focus to a pane
    FocusPane { tab_id: String, side: PaneSide },
    /// Split view ended; any side-by-side comparison is over
    StopComparison { tab_id: String },
    /// A staged local-file document is no longer displayed
    ReleaseStaged { tab_id: String, document_url: String },
}

impl SessionEffect {
    pub fn tab_id(&self) -> Option<&str> {
        match self {
            SessionEffect::PreviewInvalidated { tab_id }
            | SessionEffect::PreviewAbandoned { tab_id }
            | SessionEffect::PreviewErrorCard { tab_id, .. }
            | SessionEffect::FocusPane { tab_id, .. }
            | SessionEffect::StopComparison { tab_id }
            | SessionEffect::ReleaseStaged { tab_id, .. } => Some(tab_id),
            SessionEffect::Visit(_) => None,
        }
    }
}
