//! Main browser state container
//!
//! Owns the session store and every collaborator it reports to. The
//! container is synchronous; timers, snapshots and file staging are handed
//! back to the caller as [`Followup`]s or async steps run by the actor.

use std::path::PathBuf;
use std::sync::Arc;

use tandem_download::DownloadTracker;
use tandem_files::{Dispatch, FileContentDispatcher};
use tandem_navigation::{HistoryTracker, InputResolver};
use tandem_preview::{CaptureDecision, CaptureOutcome, PreviewScheduler, ScheduledCapture};
use tandem_session::{SessionEffect, SessionError, SessionState, SessionStore};
use tandem_storage::Database;
use tandem_tabs::{EngineError, PaneId, PaneSide, RenderEngine, SnapshotImage, SnapshotRect};

use crate::config::Config;
use crate::error::CoreError;
use crate::Result;

/// Something the presentation layer should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotification {
    FocusPane { tab_id: String, side: PaneSide },
    StopComparison { tab_id: String },
    OpenExternally { path: PathBuf },
    PreviewUpdated { tab_id: String },
    DownloadUpdated { download_id: String },
}

/// Work left over after applying the store's effects.
#[derive(Debug, Clone, PartialEq)]
pub enum Followup {
    /// Start a debounce timer for a preview capture
    SchedulePreview(ScheduledCapture),
    /// Delete a staged document no pane shows any more
    ReleaseStaged { document_url: String },
    Notify(SessionNotification),
}

/// Main browser instance
pub struct Browser {
    config: Config,
    /// Database
    db: Database,
    store: SessionStore,
    previews: PreviewScheduler,
    history: HistoryTracker,
    downloads: DownloadTracker,
    dispatcher: Arc<FileContentDispatcher>,
    /// Input resolver for address bar
    input_resolver: InputResolver,
}

impl Browser {
    /// Open the configured database and build a browser on top of it.
    pub fn new(config: Config, engine: Arc<dyn RenderEngine>) -> Result<Self> {
        // Ensure data directory exists
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&config.database_path)?;
        Self::with_database(config, engine, db)
    }

    /// Build a browser on an open database, loading the history and
    /// download logs stored in it.
    pub fn with_database(config: Config, engine: Arc<dyn RenderEngine>, db: Database) -> Result<Self> {
        let store = SessionStore::new(engine, config.homepage.clone());
        let history =
            HistoryTracker::with_limit(db.clone(), config.homepage.clone(), config.history_limit);
        let downloads = DownloadTracker::new(db.clone(), config.download_dir.clone());
        let dispatcher = Arc::new(FileContentDispatcher::new(config.staging_dir.clone()));
        let input_resolver = InputResolver::with_search_engine(config.search_engine.clone());
        let previews = PreviewScheduler::new(config.preview.clone());

        let mut browser = Self {
            config,
            db,
            store,
            previews,
            history,
            downloads,
            dispatcher,
            input_resolver,
        };
        browser.load_persisted()?;
        Ok(browser)
    }

    /// Load persisted logs
    fn load_persisted(&mut self) -> Result<()> {
        self.history.load()?;
        self.downloads.load()?;

        tracing::info!(
            history = self.history.len(),
            downloads = self.downloads.list().len(),
            "Browser initialized"
        );
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SessionStore {
        &mut self.store
    }

    pub fn state(&self) -> &SessionState {
        self.store.state()
    }

    pub fn history(&self) -> &HistoryTracker {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryTracker {
        &mut self.history
    }

    pub fn downloads(&self) -> &DownloadTracker {
        &self.downloads
    }

    pub fn previews(&self) -> &PreviewScheduler {
        &self.previews
    }

    pub fn dispatcher(&self) -> Arc<FileContentDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    // === Navigation ===

    /// Resolve address bar input and load it into the active tab. Without
    /// a side the focused pane is used; naming a side also focuses it.
    pub fn load_url(&mut self, input: &str, side: Option<PaneSide>) -> Result<()> {
        let url = self.input_resolver.resolve(input).into_url();
        let (tab_id, focused) = self.active_target()?;

        tracing::info!(tab_id = %tab_id, url = %url, side = ?side, "Loading address bar input");

        let mut split = self.store.split_view();
        match side {
            None => split.load_into(&tab_id, focused, &url)?,
            Some(side) => split.load_and_focus(&tab_id, side, &url)?,
        }
        Ok(())
    }

    /// Pick the tab and pane a local file should open in, checking the
    /// pane exists before any staging starts.
    pub fn file_target(&self, side: Option<PaneSide>) -> Result<(String, PaneSide)> {
        let (tab_id, focused) = self.active_target()?;
        let side = side.unwrap_or(focused);

        if self.store.tab(&tab_id)?.pane(side).is_none() {
            return Err(SessionError::Configuration(format!(
                "tab {} has no {} pane to open a file in",
                tab_id, side
            ))
            .into());
        }
        Ok((tab_id, side))
    }

    /// Finish opening a local file once staging is done.
    pub fn apply_dispatch(&mut self, tab_id: &str, dispatch: Dispatch) -> Result<Option<SessionNotification>> {
        match dispatch {
            Dispatch::Load { mut marker } => {
                // The split may have closed while the file was staged
                if self.store.tab(tab_id)?.pane(marker.side).is_none() {
                    tracing::info!(tab_id = %tab_id, side = %marker.side, "Pane gone, opening file in primary");
                    marker.side = PaneSide::Primary;
                }
                let side = marker.side;
                self.store.show_dispatched_file(tab_id, marker)?;
                self.store.split_view().set_active_side(tab_id, side)?;
                Ok(None)
            }
            Dispatch::OpenExternally { path } => Ok(Some(SessionNotification::OpenExternally { path })),
        }
    }

    fn active_target(&self) -> Result<(String, PaneSide)> {
        let tab = self
            .store
            .active_tab()
            .ok_or_else(|| CoreError::Config("no active tab".to_string()))?;
        Ok((tab.id.clone(), tab.active_side()))
    }

    // === Effects ===

    /// Apply everything the store queued since the last call.
    pub fn drain_effects(&mut self) -> Vec<Followup> {
        let mut followups = Vec::new();

        for effect in self.store.take_effects() {
            tracing::debug!(tab_id = ?effect.tab_id(), effect = ?effect, "Applying session effect");

            match effect {
                SessionEffect::PreviewInvalidated { tab_id } => {
                    followups.push(Followup::SchedulePreview(self.previews.schedule(&tab_id)));
                }
                SessionEffect::PreviewAbandoned { tab_id } => {
                    self.previews.forget(&tab_id);
                }
                SessionEffect::PreviewErrorCard { tab_id, reason } => {
                    self.previews.set_error_card(&tab_id, &reason);
                    followups.push(Followup::Notify(SessionNotification::PreviewUpdated { tab_id }));
                }
                SessionEffect::Visit(visit) => {
                    if let Err(e) = self.history.record_visit(&visit.url, &visit.title) {
                        tracing::warn!(url = %visit.url, error = %e, "Failed to record visit");
                    }
                }
                SessionEffect::FocusPane { tab_id, side } => {
                    followups.push(Followup::Notify(SessionNotification::FocusPane { tab_id, side }));
                }
                SessionEffect::StopComparison { tab_id } => {
                    followups.push(Followup::Notify(SessionNotification::StopComparison { tab_id }));
                }
                SessionEffect::ReleaseStaged { document_url, .. } => {
                    followups.push(Followup::ReleaseStaged { document_url });
                }
            }
        }

        followups
    }

    // === Previews ===

    /// A debounce window closed. Returns what to capture, if anything.
    pub fn preview_due(&mut self, tab_id: &str, generation: u64) -> Option<(PaneId, SnapshotRect)> {
        if !self.previews.is_current(tab_id, generation) {
            return None;
        }
        let Ok(tab) = self.store.tab(tab_id) else {
            self.previews.forget(tab_id);
            return None;
        };

        match self.previews.capture_if_needed(tab) {
            CaptureDecision::Capture { pane, rect } => Some((pane, rect)),
            CaptureDecision::Skip | CaptureDecision::SkipLoading => None,
        }
    }

    /// A snapshot came back. If the tab changed while it was taken, a new
    /// debounce window is started along with the update.
    pub fn preview_captured(
        &mut self,
        tab_id: &str,
        result: std::result::Result<SnapshotImage, EngineError>,
    ) -> Vec<Followup> {
        if self.store.tab(tab_id).is_err() {
            tracing::debug!(tab_id = %tab_id, "Dropped preview for closed tab");
            self.previews.forget(tab_id);
            return Vec::new();
        }

        let outcome = self.previews.complete(tab_id, result);
        let mut followups = Vec::new();
        if outcome.stored() {
            followups.push(Followup::Notify(SessionNotification::PreviewUpdated {
                tab_id: tab_id.to_string(),
            }));
        }
        if outcome == CaptureOutcome::Superseded {
            followups.push(Followup::SchedulePreview(self.previews.schedule(tab_id)));
        }
        followups
    }
}
