//! In-memory engine that records every command it receives.

use futures_util::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::engine::{
    EngineError, LoadSeq, PaneId, PaneLiveState, RenderEngine, SnapshotFuture, SnapshotImage,
    SnapshotRect,
};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Create(PaneId),
    Release(PaneId),
    Load { pane: PaneId, url: String, seq: LoadSeq },
    Stop { pane: PaneId, seq: LoadSeq },
    GoBack { pane: PaneId, seq: LoadSeq },
    GoForward { pane: PaneId, seq: LoadSeq },
    Reload { pane: PaneId, seq: LoadSeq },
    Snapshot { pane: PaneId, rect: SnapshotRect },
}

pub struct RecordingEngine {
    next_pane: AtomicU64,
    commands: Mutex<Vec<EngineCommand>>,
    live: Mutex<HashMap<PaneId, PaneLiveState>>,
    snapshot_result: Mutex<Result<SnapshotImage, EngineError>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self {
            next_pane: AtomicU64::new(1),
            commands: Mutex::new(Vec::new()),
            live: Mutex::new(HashMap::new()),
            snapshot_result: Mutex::new(Ok(SnapshotImage {
                width: 320,
                height: 200,
                data: vec![0x89, b'P', b'N', b'G'],
            })),
        }
    }

    pub fn commands(&self) -> Vec<EngineCommand> {
        self.commands.lock().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.lock().clear();
    }

    /// URLs loaded into `pane`, oldest first.
    pub fn loads_for(&self, pane: PaneId) -> Vec<String> {
        self.commands
            .lock()
            .iter()
            .filter_map(|c| match c {
                EngineCommand::Load { pane: p, url, .. } if *p == pane => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    /// Sequence number the engine would tag the next event from `pane` with:
    /// that of the most recent load, traversal or stop.
    pub fn last_seq(&self, pane: PaneId) -> Option<LoadSeq> {
        self.commands.lock().iter().rev().find_map(|c| match c {
            EngineCommand::Load { pane: p, seq, .. }
            | EngineCommand::GoBack { pane: p, seq }
            | EngineCommand::GoForward { pane: p, seq }
            | EngineCommand::Reload { pane: p, seq }
            | EngineCommand::Stop { pane: p, seq }
                if *p == pane =>
            {
                Some(*seq)
            }
            _ => None,
        })
    }

    pub fn is_released(&self, pane: PaneId) -> bool {
        self.commands
            .lock()
            .iter()
            .any(|c| *c == EngineCommand::Release(pane))
    }

    pub fn set_live_url(&self, pane: PaneId, url: &str) {
        self.live.lock().entry(pane).or_default().current_url = Some(url.to_string());
    }

    pub fn set_snapshot_result(&self, result: Result<SnapshotImage, EngineError>) {
        *self.snapshot_result.lock() = result;
    }

    fn record(&self, command: EngineCommand) {
        self.commands.lock().push(command);
    }
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderEngine for RecordingEngine {
    fn create_pane(&self) -> PaneId {
        let pane = PaneId(self.next_pane.fetch_add(1, Ordering::SeqCst));
        self.live.lock().insert(pane, PaneLiveState::default());
        self.record(EngineCommand::Create(pane));
        pane
    }

    fn release_pane(&self, pane: PaneId) {
        self.live.lock().remove(&pane);
        self.record(EngineCommand::Release(pane));
    }

    fn load(&self, pane: PaneId, url: &str, seq: LoadSeq) {
        if let Some(live) = self.live.lock().get_mut(&pane) {
            live.current_url = Some(url.to_string());
            live.is_loading = true;
        }
        self.record(EngineCommand::Load {
            pane,
            url: url.to_string(),
            seq,
        });
    }

    fn stop(&self, pane: PaneId, seq: LoadSeq) {
        if let Some(live) = self.live.lock().get_mut(&pane) {
            live.is_loading = false;
        }
        self.record(EngineCommand::Stop { pane, seq });
    }

    fn go_back(&self, pane: PaneId, seq: LoadSeq) {
        self.record(EngineCommand::GoBack { pane, seq });
    }

    fn go_forward(&self, pane: PaneId, seq: LoadSeq) {
        self.record(EngineCommand::GoForward { pane, seq });
    }

    fn reload(&self, pane: PaneId, seq: LoadSeq) {
        self.record(EngineCommand::Reload { pane, seq });
    }

    fn snapshot(&self, pane: PaneId, rect: SnapshotRect) -> SnapshotFuture {
        self.record(EngineCommand::Snapshot { pane, rect });
        let result = if self.live.lock().contains_key(&pane) {
            self.snapshot_result.lock().clone()
        } else {
            Err(EngineError::UnknownPane(pane))
        };
        futures_util::future::ready(result).boxed()
    }

    fn live_state(&self, pane: PaneId) -> Option<PaneLiveState> {
        self.live.lock().get(&pane).cloned()
    }
}
