//! Session store
//!
//! Owns the tab list and is the only place tabs are created or destroyed.
//! Every public mutation ends by re-deriving the published state, so the
//! mirror never shows a previous tab's address or title.

use std::collections::HashMap;
use std::sync::Arc;

use tandem_navigation::NavigationCoordinator;
use tandem_tabs::{
    is_homepage_or_blank, DispatchedFile, EngineEvent, LoadEvent, LoadSeq, PaneId, PaneSide,
    RenderEngine, Tab, HOMEPAGE_SENTINEL,
};

use crate::effect::SessionEffect;
use crate::error::SessionError;
use crate::split::SplitViewController;
use crate::state::{derive_global_state, SessionState};
use crate::Result;

const RECENTLY_CLOSED_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTab {
    pub url: String,
    pub title: String,
    pub pinned: bool,
    pub index: usize,
}

pub struct SessionStore {
    pub(crate) engine: Arc<dyn RenderEngine>,
    coordinator: NavigationCoordinator,
    /// Home target loaded into blank tabs
    pub(crate) homepage: String,
    pub(crate) tabs: Vec<Tab>,
    active_tab_id: Option<String>,
    /// Which tab and side each live pane belongs to
    pub(crate) pane_owners: HashMap<PaneId, (String, PaneSide)>,
    last_seq: LoadSeq,
    mirror: SessionState,
    effects: Vec<SessionEffect>,
    recently_closed: Vec<ClosedTab>,
}

impl SessionStore {
    /// Create a session holding one blank tab.
    pub fn new(engine: Arc<dyn RenderEngine>, homepage: impl Into<String>) -> Self {
        let homepage = homepage.into();
        let homepage = if homepage.trim().is_empty() {
            HOMEPAGE_SENTINEL.to_string()
        } else {
            homepage
        };

        let mut store = Self {
            engine,
            coordinator: NavigationCoordinator::new(),
            homepage,
            tabs: Vec::new(),
            active_tab_id: None,
            pane_owners: HashMap::new(),
            last_seq: LoadSeq::ZERO,
            mirror: SessionState::default(),
            effects: Vec::new(),
            recently_closed: Vec::new(),
        };
        store.add_tab(None);
        store
    }

    // === Reads ===

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab(&self, tab_id: &str) -> Result<&Tab> {
        self.tabs
            .iter()
            .find(|t| t.id == tab_id)
            .ok_or_else(|| SessionError::TabNotFound(tab_id.to_string()))
    }

    pub(crate) fn tab_mut(&mut self, tab_id: &str) -> Result<&mut Tab> {
        self.tabs
            .iter_mut()
            .find(|t| t.id == tab_id)
            .ok_or_else(|| SessionError::TabNotFound(tab_id.to_string()))
    }

    pub fn active_tab_id(&self) -> Option<&str> {
        self.active_tab_id.as_deref()
    }

    pub fn active_tab(&self) -> Option<&Tab> {
        let id = self.active_tab_id.as_deref()?;
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn is_active(&self, tab_id: &str) -> bool {
        self.active_tab_id.as_deref() == Some(tab_id)
    }

    /// The published state.
    pub fn state(&self) -> &SessionState {
        &self.mirror
    }

    pub fn homepage(&self) -> &str {
        &self.homepage
    }

    pub fn engine(&self) -> &Arc<dyn RenderEngine> {
        &self.engine
    }

    /// Resolve a pane handle to its owning tab and side.
    pub fn owner_of(&self, pane: PaneId) -> Option<(&str, PaneSide)> {
        self.pane_owners
            .get(&pane)
            .map(|(tab_id, side)| (tab_id.as_str(), *side))
    }

    pub fn recently_closed(&self) -> &[ClosedTab] {
        &self.recently_closed
    }

    /// Drain queued effects, oldest first.
    pub fn take_effects(&mut self) -> Vec<SessionEffect> {
        std::mem::take(&mut self.effects)
    }

    pub fn split_view(&mut self) -> SplitViewController<'_> {
        SplitViewController::new(self)
    }

    // === Tab lifecycle ===

    /// Open a tab and make it active. Without a url the home target is
    /// loaded instead.
    pub fn add_tab(&mut self, url: Option<&str>) -> String {
        let pane = self.engine.create_pane();
        let tab = Tab::new(pane);
        let tab_id = tab.id.clone();

        self.pane_owners
            .insert(pane, (tab_id.clone(), PaneSide::Primary));
        self.tabs.push(tab);

        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(self.homepage.as_str())
            .to_string();
        // The tab was created above; issuing into it cannot miss.
        if let Err(e) = self.issue_load(&tab_id, PaneSide::Primary, &url) {
            tracing::error!(tab_id = %tab_id, error = %e, "Failed to load new tab");
        }

        tracing::info!(tab_id = %tab_id, url = %url, "Created new tab");

        self.activate(&tab_id);
        tab_id
    }

    /// Close a tab, releasing its panes. The session always keeps at
    /// least one tab: closing the last one opens a fresh home tab.
    pub fn close_tab(&mut self, tab_id: &str) -> Result<()> {
        let index = self
            .tabs
            .iter()
            .position(|t| t.id == tab_id)
            .ok_or_else(|| SessionError::TabNotFound(tab_id.to_string()))?;

        let tab = self.tabs.remove(index);
        let seq = self.next_seq();
        for pane in tab.pane_ids() {
            self.engine.stop(pane, seq);
            self.engine.release_pane(pane);
            self.pane_owners.remove(&pane);
        }
        if let Some(file) = tab.dispatched_file().cloned() {
            self.release_staged(tab_id, file);
        }

        if !tab.is_blank() {
            self.recently_closed.push(ClosedTab {
                url: tab
                    .dispatched_file()
                    .filter(|f| f.side == PaneSide::Primary)
                    .map(|f| f.display_url.clone())
                    .unwrap_or_else(|| tab.url().to_string()),
                title: tab.title().to_string(),
                pinned: tab.pinned,
                index,
            });
            if self.recently_closed.len() > RECENTLY_CLOSED_LIMIT {
                let overflow = self.recently_closed.len() - RECENTLY_CLOSED_LIMIT;
                self.recently_closed.drain(0..overflow);
            }
        }

        self.effects.push(SessionEffect::PreviewAbandoned {
            tab_id: tab_id.to_string(),
        });

        tracing::info!(tab_id = %tab_id, remaining = self.tabs.len(), "Closed tab");

        if self.tabs.is_empty() {
            self.active_tab_id = None;
            self.add_tab(None);
            return Ok(());
        }

        if self.is_active(tab_id) {
            let next_index = index.saturating_sub(1).min(self.tabs.len() - 1);
            let next_id = self.tabs[next_index].id.clone();
            self.activate(&next_id);
        } else {
            self.refresh_state();
        }

        Ok(())
    }

    /// Make `tab_id` the active tab. The published state reflects the new
    /// tab by the time this returns.
    pub fn switch_to_tab(&mut self, tab_id: &str) -> Result<()> {
        if self.is_active(tab_id) {
            return Ok(());
        }
        self.tab(tab_id)?;

        if let Some(previous) = self.active_tab_id.clone() {
            self.effects
                .push(SessionEffect::PreviewInvalidated { tab_id: previous });
        }
        self.effects.push(SessionEffect::PreviewInvalidated {
            tab_id: tab_id.to_string(),
        });

        self.activate(tab_id);
        self.reconcile_with_engine(tab_id)?;
        Ok(())
    }

    /// Reopen the most recently closed tab at its old position.
    pub fn reopen_closed_tab(&mut self) -> Option<String> {
        let closed = self.recently_closed.pop()?;
        let tab_id = self.add_tab(Some(&closed.url));

        if let Ok(tab) = self.tab_mut(&tab_id) {
            tab.pinned = closed.pinned;
            if !closed.title.trim().is_empty() {
                if let Some(pane) = tab.pane_mut(PaneSide::Primary) {
                    pane.state.title = closed.title;
                }
            }
        }
        if let Err(e) = self.move_tab(&tab_id, closed.index) {
            tracing::warn!(tab_id = %tab_id, error = %e, "Failed to restore closed tab position");
        }
        self.refresh_state();

        Some(tab_id)
    }

    /// Move a tab to a new position
    pub fn move_tab(&mut self, tab_id: &str, new_index: usize) -> Result<()> {
        let current = self
            .tabs
            .iter()
            .position(|t| t.id == tab_id)
            .ok_or_else(|| SessionError::TabNotFound(tab_id.to_string()))?;

        let tab = self.tabs.remove(current);
        let insert_index = new_index.min(self.tabs.len());
        self.tabs.insert(insert_index, tab);
        Ok(())
    }

    pub fn set_pinned(&mut self, tab_id: &str, pinned: bool) -> Result<()> {
        self.tab_mut(tab_id)?.pinned = pinned;
        Ok(())
    }

    // === Active pane navigation ===

    pub fn stop_loading(&mut self) -> Result<()> {
        let (tab_id, side, pane) = self.active_pane_ref()?;
        let seq = self.next_seq();

        self.engine.stop(pane, seq);
        if let Some(p) = self.tab_mut(&tab_id)?.pane_mut(side) {
            p.state.cancel_load(seq);
        }

        tracing::debug!(tab_id = %tab_id, side = %side, "Stopped loading");
        self.refresh_state();
        Ok(())
    }

    /// Returns false when there is nothing to go back to.
    pub fn go_back(&mut self) -> Result<bool> {
        self.traverse(Traverse::Back)
    }

    pub fn go_forward(&mut self) -> Result<bool> {
        self.traverse(Traverse::Forward)
    }

    pub fn reload(&mut self) -> Result<bool> {
        self.traverse(Traverse::Reload)
    }

    /// Explicitly navigate the active pane to the home target.
    pub fn go_home(&mut self) -> Result<()> {
        let (tab_id, side, _) = self.active_pane_ref()?;
        let homepage = self.homepage.clone();
        self.issue_load(&tab_id, side, &homepage)?;
        self.refresh_state();
        Ok(())
    }

    fn traverse(&mut self, direction: Traverse) -> Result<bool> {
        let (tab_id, side, pane) = self.active_pane_ref()?;
        let state = &self.tab(&tab_id)?.active_pane().state;

        let allowed = match direction {
            Traverse::Back => state.can_go_back,
            Traverse::Forward => state.can_go_forward,
            Traverse::Reload => !is_homepage_or_blank(&state.url),
        };
        if !allowed {
            return Ok(false);
        }

        let seq = self.next_seq();
        if let Some(p) = self.tab_mut(&tab_id)?.pane_mut(side) {
            p.state.begin_load(seq, None);
        }

        match direction {
            Traverse::Back => self.engine.go_back(pane, seq),
            Traverse::Forward => self.engine.go_forward(pane, seq),
            Traverse::Reload => self.engine.reload(pane, seq),
        }

        self.refresh_state();
        Ok(true)
    }

    /// Load a staged local file into one pane of `tab_id`, keeping the
    /// original file as the displayed address.
    pub fn show_dispatched_file(&mut self, tab_id: &str, file: DispatchedFile) -> Result<()> {
        let side = file.side;
        self.issue_load(tab_id, side, &file.document_url)?;

        let tab = self.tab_mut(tab_id)?;
        if let Some(pane) = tab.pane_mut(side) {
            pane.state.url = file.display_url.clone();
        }
        // A tab holds one marker; the other side's file is let go.
        if let Some(replaced) = tab.set_dispatched_file(file) {
            self.release_staged(tab_id, replaced);
        }

        self.refresh_state();
        Ok(())
    }

    // === Engine events ===

    /// Route one engine notification. Events for panes that have already
    /// been released are dropped.
    pub fn handle_engine_event(&mut self, event: EngineEvent) -> Result<()> {
        match event {
            EngineEvent::Load(event) => self.handle_load_event(&event),
            EngineEvent::OpenInNewContext { pane, url } => {
                if self.owner_of(pane).is_none() {
                    tracing::debug!(pane = %pane, "New-context request from released pane");
                    return Ok(());
                }
                self.split_view().open_in_new_context(pane, &url)?;
                Ok(())
            }
        }
    }

    fn handle_load_event(&mut self, event: &LoadEvent) -> Result<()> {
        let Some((tab_id, side)) = self.pane_owners.get(&event.pane).cloned() else {
            tracing::debug!(
                pane = %event.pane,
                event = event.kind.name(),
                "Event for released pane"
            );
            return Ok(());
        };

        let coordinator = self.coordinator.clone();
        let tab = self.tab_mut(&tab_id)?;
        let outcome = coordinator.apply(tab, side, event)?;

        if !outcome.applied {
            return Ok(());
        }

        if outcome.finished {
            self.effects.push(SessionEffect::PreviewInvalidated {
                tab_id: tab_id.clone(),
            });
        }
        if let Some(file) = outcome.released_file {
            self.release_staged(&tab_id, file);
        }
        if let Some(visit) = outcome.visit {
            self.effects.push(SessionEffect::Visit(visit));
        }
        if let Some(reason) = outcome.failure {
            if side == PaneSide::Primary {
                self.effects.push(SessionEffect::PreviewErrorCard {
                    tab_id: tab_id.clone(),
                    reason,
                });
            }
        }

        if outcome.on_active_pane && self.is_active(&tab_id) {
            self.refresh_state();
        }

        Ok(())
    }

    // === Internals shared with the split view controller ===

    pub(crate) fn next_seq(&mut self) -> LoadSeq {
        self.last_seq = self.last_seq.next();
        self.last_seq
    }

    /// Navigate one pane away from whatever it shows. A dispatched file
    /// on that side is let go.
    pub(crate) fn issue_load(&mut self, tab_id: &str, side: PaneSide, url: &str) -> Result<LoadSeq> {
        let tab = self.tab_mut(tab_id)?;
        if tab.dispatched_file().is_some_and(|f| f.side == side) {
            if let Some(file) = tab.clear_dispatched_file() {
                self.release_staged(tab_id, file);
            }
        }
        self.load_pane(tab_id, side, url)
    }

    /// Tag a new load for one pane and hand it to the engine. The homepage
    /// sentinel is never sent to the engine; the pane just shows home.
    fn load_pane(&mut self, tab_id: &str, side: PaneSide, url: &str) -> Result<LoadSeq> {
        let seq = self.next_seq();
        let is_home = url == self.homepage || url == HOMEPAGE_SENTINEL;

        let tab = self.tab_mut(tab_id)?;
        let tab_id = tab.id.clone();
        let pane = tab.pane_mut(side).ok_or_else(|| {
            configuration_error(format!("load into missing {} pane of tab {}", side, tab_id))
        })?;
        let pane_id = pane.id;

        if url == HOMEPAGE_SENTINEL {
            let was_loading = pane.state.is_loading;
            pane.state.begin_load(seq, Some(url));
            pane.state.cancel_load(seq);
            pane.state.error = None;
            if was_loading {
                self.engine.stop(pane_id, seq);
            }
            tracing::debug!(tab_id = %tab_id, side = %side, seq = seq.0, "Showing homepage");
            return Ok(seq);
        }

        pane.state.begin_load(seq, Some(url));
        pane.state.home_pending = is_home;

        tracing::debug!(tab_id = %tab_id, side = %side, url = %url, seq = seq.0, "Issued load");
        self.engine.load(pane_id, url, seq);

        Ok(seq)
    }

    pub(crate) fn push_effect(&mut self, effect: SessionEffect) {
        self.effects.push(effect);
    }

    /// Queue the staged document behind `file` for deletion.
    pub(crate) fn release_staged(&mut self, tab_id: &str, file: DispatchedFile) {
        tracing::debug!(tab_id = %tab_id, document = %file.document_url, "Released dispatched file");
        self.effects.push(SessionEffect::ReleaseStaged {
            tab_id: tab_id.to_string(),
            document_url: file.document_url,
        });
    }

    /// Re-derive the published state from the active tab and realign each
    /// tab's activation marker with it.
    pub(crate) fn refresh_state(&mut self) {
        self.mirror = derive_global_state(self.active_tab());

        let active = self.active_tab_id.clone();
        let showing_homepage = self.mirror.showing_homepage;
        for tab in &mut self.tabs {
            if !showing_homepage && active.as_deref() == Some(tab.id.as_str()) {
                tab.activate();
            } else {
                tab.blur();
            }
        }
    }

    fn activate(&mut self, tab_id: &str) {
        self.active_tab_id = Some(tab_id.to_string());
        if let Ok(tab) = self.tab_mut(tab_id) {
            tab.activate();
        }
        self.refresh_state();
    }

    /// Re-issue the stored address if the engine's pane has drifted from
    /// it while the tab was in the background.
    fn reconcile_with_engine(&mut self, tab_id: &str) -> Result<()> {
        let tab = self.tab(tab_id)?;
        let side = tab.active_side();
        let pane = tab.active_pane();
        let stored = pane.state.url.clone();

        if is_homepage_or_blank(&stored) || pane.state.is_loading {
            return Ok(());
        }

        // A dispatched file is displayed under its original path but the
        // engine holds the synthesized document.
        let expected = tab
            .dispatched_file()
            .filter(|f| f.side == side)
            .map(|f| f.document_url.clone())
            .unwrap_or_else(|| stored.clone());

        let live = self
            .engine
            .live_state(pane.id)
            .and_then(|live| live.current_url);

        if let Some(live) = live {
            if live != expected {
                tracing::info!(
                    tab_id = %tab_id,
                    stored = %expected,
                    live = %live,
                    "Pane drifted from stored address, reloading"
                );
                let display = tab
                    .dispatched_file()
                    .filter(|f| f.side == side)
                    .map(|f| f.display_url.clone());
                // Reloading the same document keeps the marker and its address.
                self.load_pane(tab_id, side, &expected)?;
                if let Some(display) = display {
                    if let Some(p) = self.tab_mut(tab_id)?.pane_mut(side) {
                        p.state.url = display;
                    }
                }
                self.refresh_state();
            }
        }

        Ok(())
    }

    fn active_pane_ref(&self) -> Result<(String, PaneSide, PaneId)> {
        let tab = self
            .active_tab()
            .ok_or_else(|| SessionError::TabNotFound("<active>".to_string()))?;
        Ok((tab.id.clone(), tab.active_side(), tab.active_pane().id))
    }
}

#[derive(Debug, Clone, Copy)]
enum Traverse {
    Back,
    Forward,
    Reload,
}

/// Log and build a configuration error. These indicate a call-site bug.
pub(crate) fn configuration_error(message: String) -> SessionError {
    tracing::error!(message = %message, "Configuration error");
    SessionError::Configuration(message)
}
