//! Tab data structure
//!
//! Tabs display:
//! - Title of the primary pane (falling back to its URL)
//! - Loading progress of the active pane
//! - Split indicator

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::engine::PaneId;
use crate::error::TabError;
use crate::pane::{Pane, PaneLayout, PaneSide};
use crate::state::TabState;
use crate::Result;

/// Marks a pane that is showing a locally dispatched file through a
/// synthesized host document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchedFile {
    pub side: PaneSide,
    /// Address shown to the user (the original file)
    pub display_url: String,
    /// Address the engine actually loaded
    pub document_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tab {
    /// Unique identifier
    pub id: String,
    pub pinned: bool,
    pub state: TabState,
    primary: Pane,
    layout: PaneLayout,
    /// Fraction of the content width given to the primary pane when split
    pane_width: Option<f64>,
    dispatched_file: Option<DispatchedFile>,
    pub created_at: DateTime<Utc>,
    /// Last time the tab was accessed/viewed
    pub last_accessed_at: DateTime<Utc>,
}

impl Tab {
    pub fn new(primary: PaneId) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            pinned: false,
            state: TabState::Background,
            primary: Pane::new(primary),
            layout: PaneLayout::Single,
            pane_width: None,
            dispatched_file: None,
            created_at: now,
            last_accessed_at: now,
        }
    }

    /// Mark tab as active (user selected it)
    pub fn activate(&mut self) {
        if self.state != TabState::Active {
            tracing::debug!(tab_id = %self.id, from = %self.state, to = "active", "Tab state transition");
            self.state = TabState::Active;
        }
        self.last_accessed_at = Utc::now();
    }

    /// Move tab to background (blur)
    pub fn blur(&mut self) {
        if self.state == TabState::Active {
            tracing::debug!(tab_id = %self.id, from = "active", to = "background", "Tab state transition");
            self.state = TabState::Background;
        }
    }

    pub fn url(&self) -> &str {
        &self.primary.state.url
    }

    pub fn title(&self) -> &str {
        &self.primary.state.title
    }

    /// Get display title (with fallback to URL)
    pub fn display_title(&self) -> &str {
        if !self.title().is_empty() {
            self.title()
        } else if !self.url().is_empty() && !crate::is_homepage_or_blank(self.url()) {
            self.url()
        } else {
            "New Tab"
        }
    }

    /// A tab that has never shown a real page (or was sent home).
    pub fn is_blank(&self) -> bool {
        crate::is_homepage_or_blank(self.url())
    }

    pub fn is_split(&self) -> bool {
        self.layout.is_split()
    }

    pub fn active_side(&self) -> PaneSide {
        self.layout.active_side()
    }

    pub fn layout(&self) -> &PaneLayout {
        &self.layout
    }

    pub fn is_loading(&self) -> bool {
        self.active_pane().state.is_loading
    }

    pub fn progress(&self) -> f64 {
        self.active_pane().state.progress
    }

    pub fn primary(&self) -> &Pane {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&Pane> {
        match &self.layout {
            PaneLayout::Single => None,
            PaneLayout::Split { secondary, .. } => Some(secondary),
        }
    }

    pub fn pane(&self, side: PaneSide) -> Option<&Pane> {
        match side {
            PaneSide::Primary => Some(&self.primary),
            PaneSide::Secondary => self.secondary(),
        }
    }

    pub fn pane_mut(&mut self, side: PaneSide) -> Option<&mut Pane> {
        match side {
            PaneSide::Primary => Some(&mut self.primary),
            PaneSide::Secondary => match &mut self.layout {
                PaneLayout::Single => None,
                PaneLayout::Split { secondary, .. } => Some(secondary),
            },
        }
    }

    pub fn active_pane(&self) -> &Pane {
        self.secondary()
            .filter(|_| self.active_side() == PaneSide::Secondary)
            .unwrap_or(&self.primary)
    }

    pub fn pane_ids(&self) -> Vec<PaneId> {
        let mut ids = vec![self.primary.id];
        ids.extend(self.secondary().map(|p| p.id));
        ids
    }

    /// Enter split layout with `pane` as the secondary, focused side.
    pub fn attach_secondary(&mut self, pane: PaneId) -> Result<()> {
        if self.is_split() {
            return Err(TabError::AlreadySplit(self.id.clone()));
        }

        self.layout = PaneLayout::Split {
            secondary: Pane::new(pane),
            active: PaneSide::Secondary,
        };
        Ok(())
    }

    /// Leave split layout, handing back the secondary pane for release.
    /// Focus returns to the primary side.
    pub fn detach_secondary(&mut self) -> Option<Pane> {
        match std::mem::replace(&mut self.layout, PaneLayout::Single) {
            PaneLayout::Single => None,
            PaneLayout::Split { secondary, .. } => {
                if self
                    .dispatched_file
                    .as_ref()
                    .is_some_and(|f| f.side == PaneSide::Secondary)
                {
                    self.dispatched_file = None;
                }
                Some(secondary)
            }
        }
    }

    /// Focus `side`. Returns whether the focus actually moved.
    pub fn set_active_side(&mut self, side: PaneSide) -> Result<bool> {
        match &mut self.layout {
            PaneLayout::Single if side == PaneSide::Secondary => {
                Err(TabError::NoSecondaryPane(self.id.clone()))
            }
            PaneLayout::Single => Ok(false),
            PaneLayout::Split { active, .. } => {
                let changed = *active != side;
                *active = side;
                Ok(changed)
            }
        }
    }

    pub fn pane_width(&self) -> Option<f64> {
        self.pane_width
    }

    pub fn set_pane_width(&mut self, fraction: f64) {
        self.pane_width = Some(fraction.clamp(0.2, 0.8));
    }

    pub fn dispatched_file(&self) -> Option<&DispatchedFile> {
        self.dispatched_file.as_ref()
    }

    /// Returns the marker this one replaces, if any.
    pub fn set_dispatched_file(&mut self, file: DispatchedFile) -> Option<DispatchedFile> {
        self.dispatched_file.replace(file)
    }

    pub fn clear_dispatched_file(&mut self) -> Option<DispatchedFile> {
        self.dispatched_file.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LoadSeq;

    #[test]
    fn test_new_tab() {
        let tab = Tab::new(PaneId(1));
        assert_eq!(tab.state, TabState::Background);
        assert!(tab.is_blank());
        assert!(!tab.is_split());
        assert_eq!(tab.active_side(), PaneSide::Primary);
        assert_eq!(tab.display_title(), "New Tab");
        assert!(tab.secondary().is_none());
    }

    #[test]
    fn test_split_invariants() {
        let mut tab = Tab::new(PaneId(1));
        assert_eq!(
            tab.set_active_side(PaneSide::Secondary),
            Err(TabError::NoSecondaryPane(tab.id.clone()))
        );

        tab.attach_secondary(PaneId(2)).unwrap();
        assert!(tab.is_split());
        assert_eq!(tab.active_side(), PaneSide::Secondary);
        assert_eq!(tab.pane_ids(), vec![PaneId(1), PaneId(2)]);
        assert!(tab.attach_secondary(PaneId(3)).is_err());

        let released = tab.detach_secondary().unwrap();
        assert_eq!(released.id, PaneId(2));
        assert!(!tab.is_split());
        assert_eq!(tab.active_side(), PaneSide::Primary);
        assert!(tab.secondary().is_none());
    }

    #[test]
    fn test_active_pane_follows_side() {
        let mut tab = Tab::new(PaneId(1));
        tab.attach_secondary(PaneId(2)).unwrap();
        assert_eq!(tab.active_pane().id, PaneId(2));

        assert!(tab.set_active_side(PaneSide::Primary).unwrap());
        assert!(!tab.set_active_side(PaneSide::Primary).unwrap());
        assert_eq!(tab.active_pane().id, PaneId(1));
    }

    #[test]
    fn test_title_and_loading_views() {
        let mut tab = Tab::new(PaneId(1));
        tab.pane_mut(PaneSide::Primary)
            .unwrap()
            .state
            .begin_load(LoadSeq(1), Some("https://example.com"));
        assert_eq!(tab.display_title(), "https://example.com");
        assert!(tab.is_loading());

        tab.attach_secondary(PaneId(2)).unwrap();
        // Secondary is active and idle; primary keeps loading
        assert!(!tab.is_loading());
        assert_eq!(tab.url(), "https://example.com");
    }

    #[test]
    fn test_pane_width_is_clamped() {
        let mut tab = Tab::new(PaneId(1));
        tab.set_pane_width(0.95);
        assert_eq!(tab.pane_width(), Some(0.8));
        tab.set_pane_width(0.5);
        assert_eq!(tab.pane_width(), Some(0.5));
    }

    #[test]
    fn test_detach_clears_secondary_file_marker() {
        let mut tab = Tab::new(PaneId(1));
        tab.attach_secondary(PaneId(2)).unwrap();
        tab.set_dispatched_file(DispatchedFile {
            side: PaneSide::Secondary,
            display_url: "file:///tmp/a.png".to_string(),
            document_url: "file:///staging/a.html".to_string(),
        });

        tab.detach_secondary();
        assert!(tab.dispatched_file().is_none());
    }

    #[test]
    fn test_activation() {
        let mut tab = Tab::new(PaneId(1));
        tab.activate();
        assert!(tab.state.is_active());
        tab.blur();
        assert_eq!(tab.state, TabState::Background);
    }
}
