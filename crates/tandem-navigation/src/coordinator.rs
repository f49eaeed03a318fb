//! Load lifecycle coordination
//!
//! Progress mapping per pane:
//! ```text
//! started   → 0.1, loading, error cleared
//! committed → 0.5
//! finished  → 1.0, idle
//! failed    → idle, error recorded
//! ```

use tandem_tabs::{
    is_homepage_or_blank, DispatchedFile, LoadEvent, LoadEventKind, PaneSide, PaneState, Tab,
    HOMEPAGE_SENTINEL,
};

use crate::error::NavigationError;
use crate::Result;

const PROGRESS_STARTED: f64 = 0.1;
const PROGRESS_COMMITTED: f64 = 0.5;
const PROGRESS_FINISHED: f64 = 1.0;

/// A completed load of a real page, worth a history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageVisit {
    pub url: String,
    pub title: String,
}

/// What applying one lifecycle event did to a tab.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventOutcome {
    /// False when the event belonged to a superseded load and was dropped
    pub applied: bool,
    /// The event touched the pane that is focused within its tab
    pub on_active_pane: bool,
    /// Marker dropped because the pane left its dispatched file
    pub released_file: Option<DispatchedFile>,
    pub visit: Option<PageVisit>,
    pub failure: Option<String>,
    pub finished: bool,
}

enum UrlUpdate {
    Ignore,
    Set(String),
    /// The pane left the dispatched document for somewhere else
    SetAndClearMarker(String),
}

#[derive(Debug, Default, Clone)]
pub struct NavigationCoordinator;

impl NavigationCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Apply `event` to the `side` pane of `tab`.
    ///
    /// The pane is always updated when the event is current, whether or
    /// not it is focused. Whether the change reaches the session mirror is
    /// for the caller to decide from [`EventOutcome::on_active_pane`].
    pub fn apply(&self, tab: &mut Tab, side: PaneSide, event: &LoadEvent) -> Result<EventOutcome> {
        let on_active_pane = tab.active_side() == side;
        let dispatched = tab.dispatched_file().filter(|f| f.side == side).cloned();
        let tab_id = tab.id.clone();

        let pane = tab
            .pane_mut(side)
            .ok_or_else(|| NavigationError::MissingPane {
                tab_id: tab_id.clone(),
                side,
            })?;

        if pane.state.is_stale(event.seq) {
            tracing::debug!(
                tab_id = %tab_id,
                pane = %event.pane,
                event = event.kind.name(),
                seq = event.seq.0,
                current = pane.state.load_seq.0,
                "Dropped event from superseded load"
            );
            return Ok(EventOutcome::default());
        }
        // Engine-initiated navigations reuse the latest number we issued,
        // but a newer one means the engine is ahead of us.
        pane.state.load_seq = event.seq;

        let mut outcome = EventOutcome {
            applied: true,
            on_active_pane,
            ..Default::default()
        };
        let mut clear_marker = false;
        let state = &mut pane.state;

        match &event.kind {
            LoadEventKind::Started => {
                state.is_loading = true;
                state.progress = PROGRESS_STARTED;
                state.error = None;
            }
            LoadEventKind::Committed { url } => {
                state.is_loading = true;
                state.progress = PROGRESS_COMMITTED;
                clear_marker |= apply_url(state, resolve_url(state, url, dispatched.as_ref()));
            }
            LoadEventKind::Finished {
                url,
                title,
                can_go_back,
                can_go_forward,
            } => {
                clear_marker |= apply_url(state, resolve_url(state, url, dispatched.as_ref()));
                if accepts(state, title) {
                    state.title = title.clone();
                }
                state.is_loading = false;
                state.progress = PROGRESS_FINISHED;
                state.can_go_back = *can_go_back;
                state.can_go_forward = *can_go_forward;
                state.home_pending = false;

                outcome.finished = true;
                if !is_homepage_or_blank(&state.url) {
                    outcome.visit = Some(PageVisit {
                        url: state.url.clone(),
                        title: state.title.clone(),
                    });
                }
            }
            LoadEventKind::Failed { reason } => {
                state.is_loading = false;
                state.progress = 0.0;
                state.home_pending = false;
                state.error = Some(reason.clone());
                outcome.failure = Some(reason.clone());

                tracing::info!(
                    tab_id = %tab_id,
                    side = %side,
                    reason = %reason,
                    "Navigation failed"
                );
            }
        }

        if clear_marker {
            tracing::debug!(tab_id = %tab_id, side = %side, "Left dispatched file");
            outcome.released_file = tab.clear_dispatched_file();
        }

        Ok(outcome)
    }
}

/// Sentinel updates only count while an explicit home navigation is in
/// flight on the pane.
fn accepts(state: &PaneState, value: &str) -> bool {
    value != HOMEPAGE_SENTINEL || state.home_pending
}

fn resolve_url(state: &PaneState, url: &str, dispatched: Option<&DispatchedFile>) -> UrlUpdate {
    if !accepts(state, url) {
        return UrlUpdate::Ignore;
    }

    match dispatched {
        Some(file) if url == file.document_url => UrlUpdate::Set(file.display_url.clone()),
        Some(_) => UrlUpdate::SetAndClearMarker(url.to_string()),
        None => UrlUpdate::Set(url.to_string()),
    }
}

/// Returns true if the dispatched-file marker must be dropped.
fn apply_url(state: &mut PaneState, update: UrlUpdate) -> bool {
    match update {
        UrlUpdate::Ignore => false,
        UrlUpdate::Set(url) => {
            state.url = url;
            false
        }
        UrlUpdate::SetAndClearMarker(url) => {
            state.url = url;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_tabs::{LoadSeq, PaneId};

    fn event(pane: PaneId, seq: u64, kind: LoadEventKind) -> LoadEvent {
        LoadEvent {
            pane,
            seq: LoadSeq(seq),
            kind,
        }
    }

    fn finished(url: &str, title: &str) -> LoadEventKind {
        LoadEventKind::Finished {
            url: url.to_string(),
            title: title.to_string(),
            can_go_back: true,
            can_go_forward: false,
        }
    }

    fn loading_tab(url: &str, seq: u64) -> Tab {
        let mut tab = Tab::new(PaneId(1));
        tab.pane_mut(PaneSide::Primary)
            .unwrap()
            .state
            .begin_load(LoadSeq(seq), Some(url));
        tab
    }

    #[test]
    fn test_progress_mapping() {
        let coordinator = NavigationCoordinator::new();
        let mut tab = loading_tab("https://a.com", 1);
        let pane = PaneId(1);

        coordinator
            .apply(&mut tab, PaneSide::Primary, &event(pane, 1, LoadEventKind::Started))
            .unwrap();
        assert_eq!(tab.progress(), PROGRESS_STARTED);
        assert!(tab.is_loading());

        coordinator
            .apply(
                &mut tab,
                PaneSide::Primary,
                &event(pane, 1, LoadEventKind::Committed { url: "https://a.com/".to_string() }),
            )
            .unwrap();
        assert_eq!(tab.progress(), PROGRESS_COMMITTED);
        assert_eq!(tab.url(), "https://a.com/");

        let outcome = coordinator
            .apply(&mut tab, PaneSide::Primary, &event(pane, 1, finished("https://a.com/", "A")))
            .unwrap();
        assert!(outcome.applied);
        assert!(outcome.finished);
        assert!(outcome.on_active_pane);
        assert_eq!(
            outcome.visit,
            Some(PageVisit {
                url: "https://a.com/".to_string(),
                title: "A".to_string()
            })
        );
        assert_eq!(tab.progress(), PROGRESS_FINISHED);
        assert!(!tab.is_loading());
        assert!(tab.primary().state.can_go_back);
        assert_eq!(tab.title(), "A");
    }

    #[test]
    fn test_failed_records_reason() {
        let coordinator = NavigationCoordinator::new();
        let mut tab = loading_tab("https://down.example", 1);

        let outcome = coordinator
            .apply(
                &mut tab,
                PaneSide::Primary,
                &event(
                    PaneId(1),
                    1,
                    LoadEventKind::Failed {
                        reason: "The server could not be found".to_string(),
                    },
                ),
            )
            .unwrap();

        assert_eq!(outcome.failure.as_deref(), Some("The server could not be found"));
        assert!(outcome.visit.is_none());
        assert!(!tab.is_loading());
        assert_eq!(
            tab.primary().state.error.as_deref(),
            Some("The server could not be found")
        );
    }

    #[test]
    fn test_stale_finish_is_discarded() {
        let coordinator = NavigationCoordinator::new();
        let mut tab = loading_tab("https://old.com", 1);
        tab.pane_mut(PaneSide::Primary)
            .unwrap()
            .state
            .begin_load(LoadSeq(2), Some("https://new.com"));

        let outcome = coordinator
            .apply(&mut tab, PaneSide::Primary, &event(PaneId(1), 1, finished("https://old.com", "Old")))
            .unwrap();

        assert!(!outcome.applied);
        assert_eq!(tab.url(), "https://new.com");
        assert!(tab.is_loading());
        assert!(tab.title().is_empty());
    }

    #[test]
    fn test_inactive_pane_updates_without_focus() {
        let coordinator = NavigationCoordinator::new();
        let mut tab = loading_tab("https://a.com", 1);
        tab.attach_secondary(PaneId(2)).unwrap();
        tab.set_active_side(PaneSide::Secondary).unwrap();

        let outcome = coordinator
            .apply(&mut tab, PaneSide::Primary, &event(PaneId(1), 1, finished("https://a.com", "A")))
            .unwrap();

        assert!(outcome.applied);
        assert!(!outcome.on_active_pane);
        assert_eq!(tab.primary().state.title, "A");
        assert!(tab.secondary().unwrap().state.title.is_empty());
    }

    #[test]
    fn test_sentinel_ignored_unless_going_home() {
        let coordinator = NavigationCoordinator::new();
        let mut tab = loading_tab("https://a.com", 1);

        coordinator
            .apply(
                &mut tab,
                PaneSide::Primary,
                &event(PaneId(1), 1, finished(HOMEPAGE_SENTINEL, HOMEPAGE_SENTINEL)),
            )
            .unwrap();
        assert_eq!(tab.url(), "https://a.com");
        assert!(tab.title().is_empty());

        let state = &mut tab.pane_mut(PaneSide::Primary).unwrap().state;
        state.begin_load(LoadSeq(2), None);
        state.home_pending = true;

        let outcome = coordinator
            .apply(
                &mut tab,
                PaneSide::Primary,
                &event(PaneId(1), 2, finished(HOMEPAGE_SENTINEL, "")),
            )
            .unwrap();
        assert_eq!(tab.url(), HOMEPAGE_SENTINEL);
        assert!(tab.is_blank());
        assert!(outcome.visit.is_none());
        assert!(!tab.primary().state.home_pending);
    }

    #[test]
    fn test_dispatched_file_keeps_original_address() {
        let coordinator = NavigationCoordinator::new();
        let mut tab = loading_tab("file:///staging/doc.html", 1);
        tab.set_dispatched_file(DispatchedFile {
            side: PaneSide::Primary,
            display_url: "file:///home/me/photo.png".to_string(),
            document_url: "file:///staging/doc.html".to_string(),
        });

        coordinator
            .apply(
                &mut tab,
                PaneSide::Primary,
                &event(PaneId(1), 1, finished("file:///staging/doc.html", "photo.png")),
            )
            .unwrap();
        assert_eq!(tab.url(), "file:///home/me/photo.png");
        assert!(tab.dispatched_file().is_some());

        // Navigating away drops the marker
        let outcome = coordinator
            .apply(
                &mut tab,
                PaneSide::Primary,
                &event(PaneId(1), 1, LoadEventKind::Committed { url: "https://b.com".to_string() }),
            )
            .unwrap();
        assert_eq!(tab.url(), "https://b.com");
        assert!(tab.dispatched_file().is_none());
        assert_eq!(
            outcome.released_file.map(|f| f.document_url).as_deref(),
            Some("file:///staging/doc.html")
        );
    }

    #[test]
    fn test_missing_pane_is_an_error() {
        let coordinator = NavigationCoordinator::new();
        let mut tab = Tab::new(PaneId(1));

        let result = coordinator.apply(
            &mut tab,
            PaneSide::Secondary,
            &event(PaneId(2), 0, LoadEventKind::Started),
        );
        assert!(matches!(result, Err(NavigationError::MissingPane { .. })));
    }
}
