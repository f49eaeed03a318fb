//! Split view controller
//!
//! Per tab, a two-state machine:
//!
//! ```text
//! Unsplit ──toggle_split──▶ Split { active: Secondary }
//!    ▲                          │
//!    └───────toggle_split───────┘
//! ```
//!
//! Entering split view allocates the secondary pane from the engine and
//! registers it in the store's pane table; leaving it stops and releases
//! that pane. Focus only moves through [`SplitViewController::set_active_side`].

use tandem_tabs::{is_homepage_or_blank, PaneId, PaneSide};

use crate::effect::SessionEffect;
use crate::store::{configuration_error, SessionStore};
use crate::Result;

pub struct SplitViewController<'a> {
    store: &'a mut SessionStore,
}

impl<'a> SplitViewController<'a> {
    pub(crate) fn new(store: &'a mut SessionStore) -> Self {
        Self { store }
    }

    /// Enter or leave split view. Returns whether the tab is now split.
    pub fn toggle_split(&mut self, tab_id: &str) -> Result<bool> {
        if self.store.tab(tab_id)?.is_split() {
            self.exit_split(tab_id)?;
            Ok(false)
        } else {
            self.enter_split(tab_id)?;
            Ok(true)
        }
    }

    fn enter_split(&mut self, tab_id: &str) -> Result<()> {
        let source = {
            let tab = self.store.tab(tab_id)?;
            let primary_url = tab
                .dispatched_file()
                .filter(|f| f.side == PaneSide::Primary)
                .map(|f| f.document_url.clone())
                .unwrap_or_else(|| tab.url().to_string());
            if is_homepage_or_blank(&primary_url) {
                self.store.homepage.clone()
            } else {
                primary_url
            }
        };

        let pane = self.store.engine.create_pane();
        if let Err(e) = self.store.tab_mut(tab_id)?.attach_secondary(pane) {
            self.store.engine.release_pane(pane);
            return Err(e.into());
        }
        self.store
            .pane_owners
            .insert(pane, (tab_id.to_string(), PaneSide::Secondary));

        self.store.issue_load(tab_id, PaneSide::Secondary, &source)?;

        tracing::info!(tab_id = %tab_id, pane = %pane, url = %source, "Entered split view");

        self.store.push_effect(SessionEffect::FocusPane {
            tab_id: tab_id.to_string(),
            side: PaneSide::Secondary,
        });
        self.store.push_effect(SessionEffect::PreviewInvalidated {
            tab_id: tab_id.to_string(),
        });
        self.store.refresh_state();
        Ok(())
    }

    fn exit_split(&mut self, tab_id: &str) -> Result<()> {
        let tab = self.store.tab_mut(tab_id)?;
        let released = tab
            .dispatched_file()
            .filter(|f| f.side == PaneSide::Secondary)
            .cloned();
        let Some(secondary) = tab.detach_secondary() else {
            return Ok(());
        };

        let seq = self.store.next_seq();
        self.store.engine.stop(secondary.id, seq);
        self.store.engine.release_pane(secondary.id);
        self.store.pane_owners.remove(&secondary.id);

        tracing::info!(tab_id = %tab_id, pane = %secondary.id, "Left split view");

        if let Some(file) = released {
            self.store.release_staged(tab_id, file);
        }

        self.store.push_effect(SessionEffect::StopComparison {
            tab_id: tab_id.to_string(),
        });
        self.store.push_effect(SessionEffect::FocusPane {
            tab_id: tab_id.to_string(),
            side: PaneSide::Primary,
        });
        self.store.push_effect(SessionEffect::PreviewInvalidated {
            tab_id: tab_id.to_string(),
        });
        self.store.refresh_state();
        Ok(())
    }

    /// Focus one side of a split tab. Asking for the side that is already
    /// focused only refreshes the published state.
    pub fn set_active_side(&mut self, tab_id: &str, side: PaneSide) -> Result<()> {
        let tab = self.store.tab_mut(tab_id)?;
        if side == PaneSide::Secondary && !tab.is_split() {
            return Err(configuration_error(format!(
                "tab {} has no secondary pane to focus",
                tab_id
            )));
        }

        let changed = tab.set_active_side(side)?;
        if changed {
            tracing::debug!(tab_id = %tab_id, side = %side, "Moved pane focus");
            self.store.push_effect(SessionEffect::FocusPane {
                tab_id: tab_id.to_string(),
                side,
            });
        }

        self.store.refresh_state();
        Ok(())
    }

    /// Load `url` into one pane. Focus stays where it is; the published
    /// state is refreshed against the currently focused side.
    pub fn load_into(&mut self, tab_id: &str, side: PaneSide, url: &str) -> Result<()> {
        let tab = self.store.tab(tab_id)?;
        if tab.pane(side).is_none() {
            return Err(configuration_error(format!(
                "tab {} has no {} pane to load into",
                tab_id, side
            )));
        }
        let focused = tab.active_side();

        self.store.issue_load(tab_id, side, url)?;
        self.set_active_side(tab_id, focused)
    }

    /// Load `url` into one pane and focus it.
    pub fn load_and_focus(&mut self, tab_id: &str, side: PaneSide, url: &str) -> Result<()> {
        self.load_into(tab_id, side, url)?;
        self.set_active_side(tab_id, side)
    }

    /// A page asked to open `url` elsewhere. In a split tab it goes to the
    /// pane opposite the one that asked; otherwise it gets a new tab.
    /// Returns the id of the tab that received the load.
    pub fn open_in_new_context(&mut self, pane: PaneId, url: &str) -> Result<String> {
        let Some((tab_id, side)) = self
            .store
            .owner_of(pane)
            .map(|(tab_id, side)| (tab_id.to_string(), side))
        else {
            return Err(configuration_error(format!("{} is not owned by any tab", pane)));
        };

        if self.store.tab(&tab_id)?.is_split() {
            let target = side.opposite();
            tracing::debug!(tab_id = %tab_id, from = %side, to = %target, url = %url, "Opening in opposite pane");
            self.load_and_focus(&tab_id, target, url)?;
            Ok(tab_id)
        } else {
            Ok(self.store.add_tab(Some(url)))
        }
    }

    /// Store the primary pane's share of the content width.
    pub fn set_pane_width(&mut self, tab_id: &str, fraction: f64) -> Result<()> {
        self.store.tab_mut(tab_id)?.set_pane_width(fraction);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::SessionError;
    use tandem_tabs::testing::{EngineCommand, RecordingEngine};
    use tandem_tabs::{EngineEvent, LoadEvent, LoadEventKind, Tab, HOMEPAGE_SENTINEL};

    fn session_with(url: &str) -> (Arc<RecordingEngine>, SessionStore, String) {
        let engine = Arc::new(RecordingEngine::new());
        let mut store = SessionStore::new(engine.clone(), HOMEPAGE_SENTINEL);
        let tab_id = store.add_tab(Some(url));
        (engine, store, tab_id)
    }

    fn finish(store: &mut SessionStore, engine: &RecordingEngine, pane: PaneId, title: &str) {
        let seq = engine.last_seq(pane).unwrap();
        let url = engine.loads_for(pane).pop().unwrap();
        store
            .handle_engine_event(EngineEvent::Load(LoadEvent {
                pane,
                seq,
                kind: LoadEventKind::Finished {
                    url,
                    title: title.to_string(),
                    can_go_back: false,
                    can_go_forward: false,
                },
            }))
            .unwrap();
    }

    fn assert_layout_consistent(tab: &Tab) {
        assert_eq!(tab.secondary().is_some(), tab.is_split());
        if tab.active_side() == PaneSide::Secondary {
            assert!(tab.is_split());
        }
    }

    #[test]
    fn test_enter_split_loads_primary_url() {
        let (engine, mut store, id) = session_with("https://a.com");
        store.take_effects();

        assert!(store.split_view().toggle_split(&id).unwrap());

        let tab = store.tab(&id).unwrap();
        assert_layout_consistent(tab);
        assert_eq!(tab.active_side(), PaneSide::Secondary);
        let secondary = tab.secondary().unwrap().id;
        assert_eq!(engine.loads_for(secondary), vec!["https://a.com"]);
        assert_eq!(store.owner_of(secondary), Some((id.as_str(), PaneSide::Secondary)));
        assert!(store.state().is_split);
        assert_eq!(store.state().active_side, PaneSide::Secondary);
        assert!(store.take_effects().contains(&SessionEffect::FocusPane {
            tab_id: id.clone(),
            side: PaneSide::Secondary,
        }));
    }

    #[test]
    fn test_split_of_blank_tab_shows_homepage() {
        let engine = Arc::new(RecordingEngine::new());
        let mut store = SessionStore::new(engine.clone(), HOMEPAGE_SENTINEL);
        let id = store.tabs()[0].id.clone();

        store.split_view().toggle_split(&id).unwrap();

        let secondary = store.tab(&id).unwrap().secondary().unwrap().clone();
        assert_eq!(secondary.state.url, HOMEPAGE_SENTINEL);
        assert!(engine.loads_for(secondary.id).is_empty());
        assert!(store.state().showing_homepage);
    }

    #[test]
    fn test_split_round_trip_restores_primary() {
        let (engine, mut store, id) = session_with("https://a.com");
        let primary = store.tab(&id).unwrap().primary().id;
        finish(&mut store, &engine, primary, "A");

        store.split_view().toggle_split(&id).unwrap();
        let secondary = store.tab(&id).unwrap().secondary().unwrap().id;
        store.take_effects();

        assert!(!store.split_view().toggle_split(&id).unwrap());

        let tab = store.tab(&id).unwrap();
        assert_layout_consistent(tab);
        assert!(!tab.is_split());
        assert_eq!(tab.active_side(), PaneSide::Primary);
        assert!(engine.is_released(secondary));
        assert!(engine
            .commands()
            .iter()
            .any(|c| matches!(c, EngineCommand::Stop { pane, .. } if *pane == secondary)));
        assert!(store.owner_of(secondary).is_none());
        assert_eq!(store.state().url, "https://a.com");
        assert_eq!(store.state().title, "A");
        assert!(!store.state().is_split);

        let effects = store.take_effects();
        assert!(effects.contains(&SessionEffect::StopComparison { tab_id: id.clone() }));
        assert!(effects.contains(&SessionEffect::FocusPane {
            tab_id: id,
            side: PaneSide::Primary,
        }));
    }

    #[test]
    fn test_load_into_keeps_focus_until_moved() {
        let (engine, mut store, id) = session_with("https://a.com");
        let primary = store.tab(&id).unwrap().primary().id;
        finish(&mut store, &engine, primary, "A");
        store.split_view().toggle_split(&id).unwrap();
        let secondary = store.tab(&id).unwrap().secondary().unwrap().id;
        finish(&mut store, &engine, secondary, "A");

        store
            .split_view()
            .load_into(&id, PaneSide::Primary, "https://b.com")
            .unwrap();
        assert_eq!(engine.loads_for(primary).last().map(String::as_str), Some("https://b.com"));
        assert_eq!(store.tab(&id).unwrap().active_side(), PaneSide::Secondary);
        assert_eq!(store.state().url, "https://a.com");

        finish(&mut store, &engine, primary, "B");
        assert_eq!(store.state().title, "A");

        store.split_view().set_active_side(&id, PaneSide::Primary).unwrap();
        assert_eq!(store.state().url, "https://b.com");
        assert_eq!(store.state().title, "B");
    }

    #[test]
    fn test_set_active_side_is_idempotent() {
        let (_engine, mut store, id) = session_with("https://a.com");
        store.split_view().toggle_split(&id).unwrap();
        store.take_effects();

        store.split_view().set_active_side(&id, PaneSide::Secondary).unwrap();
        let first = store.state().clone();
        store.split_view().set_active_side(&id, PaneSide::Secondary).unwrap();

        assert_eq!(store.state(), &first);
        assert!(store.take_effects().is_empty());
    }

    #[test]
    fn test_switching_sides_leaves_other_pane_alone() {
        let (engine, mut store, id) = session_with("https://a.com");
        store.split_view().toggle_split(&id).unwrap();
        let secondary = store.tab(&id).unwrap().secondary().unwrap().id;
        finish(&mut store, &engine, secondary, "Secondary");

        let before = store.tab(&id).unwrap().secondary().unwrap().state.clone();
        store.split_view().set_active_side(&id, PaneSide::Primary).unwrap();
        store.split_view().set_active_side(&id, PaneSide::Secondary).unwrap();

        assert_eq!(store.tab(&id).unwrap().secondary().unwrap().state, before);
    }

    #[test]
    fn test_secondary_on_unsplit_tab_is_configuration_error() {
        let (engine, mut store, id) = session_with("https://a.com");
        let before = engine.commands().len();

        assert!(matches!(
            store.split_view().set_active_side(&id, PaneSide::Secondary),
            Err(SessionError::Configuration(_))
        ));
        assert!(matches!(
            store
                .split_view()
                .load_into(&id, PaneSide::Secondary, "https://b.com"),
            Err(SessionError::Configuration(_))
        ));
        assert_eq!(engine.commands().len(), before);
        assert_eq!(store.tab(&id).unwrap().active_side(), PaneSide::Primary);
    }

    #[test]
    fn test_secondary_failure_stays_tab_local() {
        let (engine, mut store, id) = session_with("https://a.com");
        store.split_view().toggle_split(&id).unwrap();
        let secondary = store.tab(&id).unwrap().secondary().unwrap().id;
        store.split_view().set_active_side(&id, PaneSide::Primary).unwrap();
        let before = store.state().clone();
        store.take_effects();

        let seq = engine.last_seq(secondary).unwrap();
        store
            .handle_engine_event(EngineEvent::Load(LoadEvent {
                pane: secondary,
                seq,
                kind: LoadEventKind::Failed {
                    reason: "connection reset".to_string(),
                },
            }))
            .unwrap();

        assert_eq!(store.state(), &before);
        assert_eq!(
            store.tab(&id).unwrap().secondary().unwrap().state.error.as_deref(),
            Some("connection reset")
        );
        assert!(store.take_effects().is_empty());
    }

    #[test]
    fn test_open_in_new_context_targets_opposite_pane() {
        let (engine, mut store, id) = session_with("https://a.com");
        store.split_view().toggle_split(&id).unwrap();
        let primary = store.tab(&id).unwrap().primary().id;
        store.split_view().set_active_side(&id, PaneSide::Primary).unwrap();

        store
            .handle_engine_event(EngineEvent::OpenInNewContext {
                pane: primary,
                url: "https://c.com".to_string(),
            })
            .unwrap();

        let tab = store.tab(&id).unwrap();
        assert_eq!(tab.active_side(), PaneSide::Secondary);
        assert_eq!(
            engine.loads_for(tab.secondary().unwrap().id).last().map(String::as_str),
            Some("https://c.com")
        );
        assert_eq!(store.state().url, "https://c.com");
    }

    #[test]
    fn test_open_in_new_context_unsplit_opens_tab() {
        let (_engine, mut store, id) = session_with("https://a.com");
        let primary = store.tab(&id).unwrap().primary().id;
        let tabs_before = store.tabs().len();

        let target = store
            .split_view()
            .open_in_new_context(primary, "https://c.com")
            .unwrap();

        assert_ne!(target, id);
        assert_eq!(store.tabs().len(), tabs_before + 1);
        assert_eq!(store.active_tab_id(), Some(target.as_str()));
    }

    #[test]
    fn test_pane_width_is_clamped_and_survives_focus_change() {
        let (_engine, mut store, id) = session_with("https://a.com");
        store.split_view().toggle_split(&id).unwrap();

        store.split_view().set_pane_width(&id, 0.95).unwrap();
        store.split_view().set_active_side(&id, PaneSide::Primary).unwrap();
        assert_eq!(store.tab(&id).unwrap().pane_width(), Some(0.8));

        store.split_view().set_pane_width(&id, 0.4).unwrap();
        assert_eq!(store.tab(&id).unwrap().pane_width(), Some(0.4));
    }
}
