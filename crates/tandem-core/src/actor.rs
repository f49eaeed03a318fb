//! Session actor
//!
//! Every mutation of browser state runs on one task. Callers talk to it
//! through a [`SessionHandle`] (requests with `oneshot` replies over a
//! bounded channel); the rendering engine reports through an
//! [`EngineEventSink`], which never blocks the engine's thread. Debounce
//! timers, snapshots and file staging run as spawned tasks that report back
//! on the same internal channel as engine events.
//!
//! After each message the actor applies queued effects and publishes the
//! session state on a `watch` channel. Presentation hints go out on a
//! `broadcast` channel.

use std::path::PathBuf;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use tandem_download::DownloadRecord;
use tandem_files::{Dispatch, FileError};
use tandem_navigation::HistoryRecord;
use tandem_preview::Preview;
use tandem_session::SessionState;
use tandem_tabs::{EngineError, EngineEvent, PaneSide, SnapshotImage, Tab};

use crate::browser::{Browser, Followup, SessionNotification};
use crate::error::CoreError;
use crate::Result;

const COMMAND_CAPACITY: usize = 256;
const NOTIFICATION_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavAction {
    Stop,
    Back,
    Forward,
    Reload,
    Home,
}

enum Command {
    Tabs {
        reply: oneshot::Sender<Vec<Tab>>,
    },
    ActiveTab {
        reply: oneshot::Sender<Option<Tab>>,
    },
    AddTab {
        url: Option<String>,
        reply: oneshot::Sender<String>,
    },
    CloseTab {
        tab_id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    SwitchToTab {
        tab_id: String,
        reply: oneshot::Sender<Result<()>>,
    },
    MoveTab {
        tab_id: String,
        index: usize,
        reply: oneshot::Sender<Result<()>>,
    },
    SetPinned {
        tab_id: String,
        pinned: bool,
        reply: oneshot::Sender<Result<()>>,
    },
    ReopenClosedTab {
        reply: oneshot::Sender<Option<String>>,
    },
    ToggleSplitView {
        tab_id: String,
        reply: oneshot::Sender<Result<bool>>,
    },
    SetActiveSide {
        tab_id: String,
        side: PaneSide,
        reply: oneshot::Sender<Result<()>>,
    },
    SetPaneWidth {
        tab_id: String,
        fraction: f64,
        reply: oneshot::Sender<Result<()>>,
    },
    LoadUrl {
        input: String,
        side: Option<PaneSide>,
        reply: oneshot::Sender<Result<()>>,
    },
    OpenFile {
        path: PathBuf,
        side: Option<PaneSide>,
        reply: oneshot::Sender<Result<Dispatch>>,
    },
    Navigate {
        action: NavAction,
        reply: oneshot::Sender<Result<bool>>,
    },
    History {
        query: String,
        limit: usize,
        reply: oneshot::Sender<Vec<HistoryRecord>>,
    },
    ClearHistory {
        reply: oneshot::Sender<Result<()>>,
    },
    DownloadStarted {
        url: String,
        file_name: String,
        total: Option<u64>,
        reply: oneshot::Sender<Result<DownloadRecord>>,
    },
    DownloadProgress {
        id: String,
        received: u64,
        total: Option<u64>,
        reply: oneshot::Sender<Result<DownloadRecord>>,
    },
    DownloadFinished {
        id: String,
        local_path: Option<String>,
        reply: oneshot::Sender<Result<DownloadRecord>>,
    },
    DownloadFailed {
        id: String,
        reason: String,
        reply: oneshot::Sender<Result<DownloadRecord>>,
    },
    Downloads {
        reply: oneshot::Sender<Vec<DownloadRecord>>,
    },
    PruneDownloads {
        reply: oneshot::Sender<Result<usize>>,
    },
    Preview {
        tab_id: String,
        reply: oneshot::Sender<Option<Preview>>,
    },
}

/// Messages produced inside the process: engine callbacks and the results
/// of work the actor spawned.
enum Internal {
    Engine(EngineEvent),
    PreviewDue {
        tab_id: String,
        generation: u64,
    },
    PreviewCaptured {
        tab_id: String,
        result: std::result::Result<SnapshotImage, EngineError>,
    },
    FileStaged {
        tab_id: String,
        result: std::result::Result<Dispatch, FileError>,
        reply: oneshot::Sender<Result<Dispatch>>,
    },
}

/// Where the rendering engine delivers its callbacks. Cheap to clone and
/// safe to call from any thread.
#[derive(Clone)]
pub struct EngineEventSink {
    tx: mpsc::UnboundedSender<Internal>,
}

impl EngineEventSink {
    pub fn send(&self, event: EngineEvent) {
        if self.tx.send(Internal::Engine(event)).is_err() {
            tracing::debug!("Session actor stopped, dropping engine event");
        }
    }
}

/// Receiving end of [`engine_channel`], consumed by [`SessionActor::spawn`].
pub struct EngineEvents {
    tx: mpsc::UnboundedSender<Internal>,
    rx: mpsc::UnboundedReceiver<Internal>,
}

/// Create the engine callback channel. The sink can be handed to the engine
/// before the browser that consumes its events exists.
pub fn engine_channel() -> (EngineEventSink, EngineEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EngineEventSink { tx: tx.clone() }, EngineEvents { tx, rx })
}

#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SessionState>,
    notifications: broadcast::Sender<SessionNotification>,
}

impl SessionHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| CoreError::ActorClosed)?;
        rx.await.map_err(|_| CoreError::ActorClosed)
    }

    /// Published session state, updated after every mutation.
    pub fn state(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub fn current_state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotification> {
        self.notifications.subscribe()
    }

    // === Tabs ===

    pub async fn tabs(&self) -> Result<Vec<Tab>> {
        self.request(|reply| Command::Tabs { reply }).await
    }

    pub async fn active_tab(&self) -> Result<Option<Tab>> {
        self.request(|reply| Command::ActiveTab { reply }).await
    }

    pub async fn add_tab(&self, url: Option<&str>) -> Result<String> {
        let url = url.map(str::to_string);
        self.request(|reply| Command::AddTab { url, reply }).await
    }

    pub async fn close_tab(&self, tab_id: &str) -> Result<()> {
        let tab_id = tab_id.to_string();
        self.request(|reply| Command::CloseTab { tab_id, reply }).await?
    }

    pub async fn switch_to_tab(&self, tab_id: &str) -> Result<()> {
        let tab_id = tab_id.to_string();
        self.request(|reply| Command::SwitchToTab { tab_id, reply })
            .await?
    }

    pub async fn move_tab(&self, tab_id: &str, index: usize) -> Result<()> {
        let tab_id = tab_id.to_string();
        self.request(|reply| Command::MoveTab {
            tab_id,
            index,
            reply,
        })
        .await?
    }

    pub async fn set_pinned(&self, tab_id: &str, pinned: bool) -> Result<()> {
        let tab_id = tab_id.to_string();
        self.request(|reply| Command::SetPinned {
            tab_id,
            pinned,
            reply,
        })
        .await?
    }

    pub async fn reopen_closed_tab(&self) -> Result<Option<String>> {
        self.request(|reply| Command::ReopenClosedTab { reply }).await
    }

    // === Split view ===

    /// Returns whether the tab is split afterwards.
    pub async fn toggle_split_view(&self, tab_id: &str) -> Result<bool> {
        let tab_id = tab_id.to_string();
        self.request(|reply| Command::ToggleSplitView { tab_id, reply })
            .await?
    }

    pub async fn set_active_side(&self, tab_id: &str, side: PaneSide) -> Result<()> {
        let tab_id = tab_id.to_string();
        self.request(|reply| Command::SetActiveSide {
            tab_id,
            side,
            reply,
        })
        .await?
    }

    pub async fn set_pane_width(&self, tab_id: &str, fraction: f64) -> Result<()> {
        let tab_id = tab_id.to_string();
        self.request(|reply| Command::SetPaneWidth {
            tab_id,
            fraction,
            reply,
        })
        .await?
    }

    // === Navigation ===

    pub async fn load_url(&self, input: &str, side: Option<PaneSide>) -> Result<()> {
        let input = input.to_string();
        self.request(|reply| Command::LoadUrl { input, side, reply })
            .await?
    }

    /// Show a local file in the active tab. Resolves once the file has been
    /// staged and handed to the engine, or routed to the system.
    pub async fn open_file(&self, path: PathBuf, side: Option<PaneSide>) -> Result<Dispatch> {
        self.request(|reply| Command::OpenFile { path, side, reply })
            .await?
    }

    pub async fn stop_loading(&self) -> Result<()> {
        self.navigate(NavAction::Stop).await.map(|_| ())
    }

    pub async fn go_back(&self) -> Result<bool> {
        self.navigate(NavAction::Back).await
    }

    pub async fn go_forward(&self) -> Result<bool> {
        self.navigate(NavAction::Forward).await
    }

    pub async fn reload(&self) -> Result<bool> {
        self.navigate(NavAction::Reload).await
    }

    pub async fn go_home(&self) -> Result<()> {
        self.navigate(NavAction::Home).await.map(|_| ())
    }

    async fn navigate(&self, action: NavAction) -> Result<bool> {
        self.request(|reply| Command::Navigate { action, reply })
            .await?
    }

    // === History ===

    pub async fn history(&self, query: &str, limit: usize) -> Result<Vec<HistoryRecord>> {
        let query = query.to_string();
        self.request(|reply| Command::History {
            query,
            limit,
            reply,
        })
        .await
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.request(|reply| Command::ClearHistory { reply }).await?
    }

    // === Downloads ===

    pub async fn download_started(
        &self,
        url: &str,
        file_name: &str,
        total: Option<u64>,
    ) -> Result<DownloadRecord> {
        let url = url.to_string();
        let file_name = file_name.to_string();
        self.request(|reply| Command::DownloadStarted {
            url,
            file_name,
            total,
            reply,
        })
        .await?
    }

    pub async fn download_progress(
        &self,
        id: &str,
        received: u64,
        total: Option<u64>,
    ) -> Result<DownloadRecord> {
        let id = id.to_string();
        self.request(|reply| Command::DownloadProgress {
            id,
            received,
            total,
            reply,
        })
        .await?
    }

    pub async fn download_finished(&self, id: &str, local_path: Option<String>) -> Result<DownloadRecord> {
        let id = id.to_string();
        self.request(|reply| Command::DownloadFinished {
            id,
            local_path,
            reply,
        })
        .await?
    }

    pub async fn download_failed(&self, id: &str, reason: &str) -> Result<DownloadRecord> {
        let id = id.to_string();
        let reason = reason.to_string();
        self.request(|reply| Command::DownloadFailed { id, reason, reply })
            .await?
    }

    pub async fn downloads(&self) -> Result<Vec<DownloadRecord>> {
        self.request(|reply| Command::Downloads { reply }).await
    }

    pub async fn prune_downloads(&self) -> Result<usize> {
        self.request(|reply| Command::PruneDownloads { reply }).await?
    }

    // === Previews ===

    pub async fn preview(&self, tab_id: &str) -> Result<Option<Preview>> {
        let tab_id = tab_id.to_string();
        self.request(|reply| Command::Preview { tab_id, reply })
            .await
    }
}

pub struct SessionActor {
    browser: Browser,
    commands: mpsc::Receiver<Command>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    internal_rx: mpsc::UnboundedReceiver<Internal>,
    state_tx: watch::Sender<SessionState>,
    notifications: broadcast::Sender<SessionNotification>,
}

impl SessionActor {
    /// Move `browser` onto its own task. The task ends when every
    /// [`SessionHandle`] has been dropped.
    pub fn spawn(browser: Browser, events: EngineEvents) -> (SessionHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (state_tx, state_rx) = watch::channel(browser.state().clone());
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let handle = SessionHandle {
            commands: commands_tx,
            state: state_rx,
            notifications: notifications.clone(),
        };

        let mut actor = Self {
            browser,
            commands: commands_rx,
            internal_tx: events.tx,
            internal_rx: events.rx,
            state_tx,
            notifications,
        };
        // Effects queued while the browser was built (the first tab)
        actor.settle();

        let task = tokio::spawn(actor.run());
        (handle, task)
    }

    async fn run(mut self) {
        tracing::info!("Session actor started");

        // Staged documents from an earlier run are never shown again
        if let Err(e) = self.browser.dispatcher().purge().await {
            tracing::warn!(error = %e, "Failed to purge staging directory");
        }

        loop {
            tokio::select! {
                biased;
                Some(message) = self.internal_rx.recv() => self.handle_internal(message),
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
            self.settle();
        }

        tracing::info!("Session actor stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Tabs { reply } => {
                let _ = reply.send(self.browser.store().tabs().to_vec());
            }
            Command::ActiveTab { reply } => {
                let _ = reply.send(self.browser.store().active_tab().cloned());
            }
            Command::AddTab { url, reply } => {
                let _ = reply.send(self.browser.store_mut().add_tab(url.as_deref()));
            }
            Command::CloseTab { tab_id, reply } => {
                let _ = reply.send(self.browser.store_mut().close_tab(&tab_id).map_err(Into::into));
            }
            Command::SwitchToTab { tab_id, reply } => {
                let _ = reply.send(self.browser.store_mut().switch_to_tab(&tab_id).map_err(Into::into));
            }
            Command::MoveTab { tab_id, index, reply } => {
                let _ = reply.send(self.browser.store_mut().move_tab(&tab_id, index).map_err(Into::into));
            }
            Command::SetPinned { tab_id, pinned, reply } => {
                let _ = reply.send(self.browser.store_mut().set_pinned(&tab_id, pinned).map_err(Into::into));
            }
            Command::ReopenClosedTab { reply } => {
                let _ = reply.send(self.browser.store_mut().reopen_closed_tab());
            }
            Command::ToggleSplitView { tab_id, reply } => {
                let result = self.browser.store_mut().split_view().toggle_split(&tab_id);
                let _ = reply.send(result.map_err(Into::into));
            }
            Command::SetActiveSide { tab_id, side, reply } => {
                let result = self
                    .browser
                    .store_mut()
                    .split_view()
                    .set_active_side(&tab_id, side);
                let _ = reply.send(result.map_err(Into::into));
            }
            Command::SetPaneWidth { tab_id, fraction, reply } => {
                let result = self
                    .browser
                    .store_mut()
                    .split_view()
                    .set_pane_width(&tab_id, fraction);
                let _ = reply.send(result.map_err(Into::into));
            }
            Command::LoadUrl { input, side, reply } => {
                let _ = reply.send(self.browser.load_url(&input, side));
            }
            Command::OpenFile { path, side, reply } => self.open_file(path, side, reply),
            Command::Navigate { action, reply } => {
                let store = self.browser.store_mut();
                let result = match action {
                    NavAction::Stop => store.stop_loading().map(|_| true),
                    NavAction::Back => store.go_back(),
                    NavAction::Forward => store.go_forward(),
                    NavAction::Reload => store.reload(),
                    NavAction::Home => store.go_home().map(|_| true),
                };
                let _ = reply.send(result.map_err(Into::into));
            }
            Command::History { query, limit, reply } => {
                let _ = reply.send(self.browser.history().search(&query, limit));
            }
            Command::ClearHistory { reply } => {
                let _ = reply.send(self.browser.history_mut().clear().map_err(Into::into));
            }
            Command::DownloadStarted {
                url,
                file_name,
                total,
                reply,
            } => {
                let result = self.browser.downloads().begin(&url, &file_name, total);
                let _ = reply.send(self.download_updated(result));
            }
            Command::DownloadProgress {
                id,
                received,
                total,
                reply,
            } => {
                let result = self.browser.downloads().update_progress(&id, received, total);
                let _ = reply.send(self.download_updated(result));
            }
            Command::DownloadFinished { id, local_path, reply } => {
                let result = self.browser.downloads().complete(&id, local_path);
                let _ = reply.send(self.download_updated(result));
            }
            Command::DownloadFailed { id, reason, reply } => {
                let result = self.browser.downloads().fail(&id, &reason);
                let _ = reply.send(self.download_updated(result));
            }
            Command::Downloads { reply } => {
                let _ = reply.send(self.browser.downloads().list());
            }
            Command::PruneDownloads { reply } => {
                let _ = reply.send(self.browser.downloads().prune_finished().map_err(Into::into));
            }
            Command::Preview { tab_id, reply } => {
                let _ = reply.send(self.browser.previews().preview(&tab_id).cloned());
            }
        }
    }

    fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Engine(event) => {
                let pane = event.pane();
                if let Err(e) = self.browser.store_mut().handle_engine_event(event) {
                    tracing::warn!(pane = %pane, error = %e, "Failed to apply engine event");
                }
            }
            Internal::PreviewDue { tab_id, generation } => {
                let Some((pane, rect)) = self.browser.preview_due(&tab_id, generation) else {
                    return;
                };
                let snapshot = self.browser.store().engine().snapshot(pane, rect);
                let tx = self.internal_tx.clone();
                tokio::spawn(async move {
                    let result = snapshot.await;
                    let _ = tx.send(Internal::PreviewCaptured { tab_id, result });
                });
            }
            Internal::PreviewCaptured { tab_id, result } => {
                let followups = self.browser.preview_captured(&tab_id, result);
                self.run_followups(followups);
            }
            Internal::FileStaged { tab_id, result, reply } => {
                let result = result.map_err(CoreError::from).and_then(|dispatch| {
                    let notification = self.browser.apply_dispatch(&tab_id, dispatch.clone())?;
                    if let Some(notification) = notification {
                        self.notify(notification);
                    }
                    Ok(dispatch)
                });
                let _ = reply.send(result);
            }
        }
    }

    fn open_file(&mut self, path: PathBuf, side: Option<PaneSide>, reply: oneshot::Sender<Result<Dispatch>>) {
        let (tab_id, side) = match self.browser.file_target(side) {
            Ok(target) => target,
            Err(e) => {
                let _ = reply.send(Err(e));
                return;
            }
        };

        let dispatcher = self.browser.dispatcher();
        let tx = self.internal_tx.clone();
        tokio::spawn(async move {
            let result = dispatcher.dispatch(&path, side).await;
            let _ = tx.send(Internal::FileStaged {
                tab_id,
                result,
                reply,
            });
        });
    }

    fn download_updated(
        &self,
        result: tandem_download::Result<DownloadRecord>,
    ) -> Result<DownloadRecord> {
        let download = result?;
        self.notify(SessionNotification::DownloadUpdated {
            download_id: download.id.clone(),
        });
        Ok(download)
    }

    fn notify(&self, notification: SessionNotification) {
        // No subscribers is fine
        let _ = self.notifications.send(notification);
    }

    fn run_followups(&self, followups: Vec<Followup>) {
        for followup in followups {
            match followup {
                Followup::SchedulePreview(scheduled) => {
                    let tx = self.internal_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(scheduled.delay).await;
                        let _ = tx.send(Internal::PreviewDue {
                            tab_id: scheduled.tab_id,
                            generation: scheduled.generation,
                        });
                    });
                }
                Followup::ReleaseStaged { document_url } => {
                    let dispatcher = self.browser.dispatcher();
                    tokio::spawn(async move {
                        if let Err(e) = dispatcher.release(&document_url).await {
                            tracing::warn!(document = %document_url, error = %e, "Failed to remove staged document");
                        }
                    });
                }
                Followup::Notify(notification) => self.notify(notification),
            }
        }
    }

    /// Apply queued effects, start any follow-up work and publish the state.
    fn settle(&mut self) {
        let followups = self.browser.drain_effects();
        self.run_followups(followups);

        let state = self.browser.state();
        self.state_tx.send_if_modified(|published| {
            if *published != *state {
                *published = state.clone();
                true
            } else {
                false
            }
        });
    }
}
