//! Preview bookkeeping
//!
//! Each tab has a needs-refresh flag (set until a capture succeeds), its
//! last preview, and a generation counter. Every [`PreviewScheduler::schedule`]
//! bumps the generation, so when several debounce timers fire only the one
//! carrying the latest generation goes on to capture.
//!
//! A capture remembers the tab's revision when it starts. If the tab was
//! invalidated again before the snapshot came back, the snapshot is kept
//! for display but the tab stays stale.

use std::collections::HashMap;
use std::time::Duration;

use tandem_tabs::{EngineError, PaneId, SnapshotImage, SnapshotRect, Tab};

use crate::config::PreviewConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Snapshot(SnapshotImage),
    /// Placeholder shown when the primary pane failed to load
    ErrorCard { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledCapture {
    pub tab_id: String,
    pub generation: u64,
    /// How long the caller should wait before reporting back
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureDecision {
    /// Preview is up to date, or a capture is already running
    Skip,
    /// Primary pane is still loading; its finish will schedule again
    SkipLoading,
    Capture { pane: PaneId, rect: SnapshotRect },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Snapshot stored and the tab is up to date
    Stored,
    /// Snapshot stored, but the tab changed while it was taken
    Superseded,
    Failed,
    /// The tab was forgotten while the capture ran
    Dropped,
}

impl CaptureOutcome {
    /// A new snapshot is on display.
    pub fn stored(self) -> bool {
        matches!(self, Self::Stored | Self::Superseded)
    }
}

#[derive(Debug, Clone)]
struct PreviewRecord {
    preview: Option<Preview>,
    needs_refresh: bool,
    generation: u64,
    /// Bumped by every invalidation
    revision: u64,
    /// Revision the running capture started from
    in_flight: Option<u64>,
}

impl PreviewRecord {
    fn invalidate(&mut self) {
        self.needs_refresh = true;
        self.revision += 1;
    }
}

impl Default for PreviewRecord {
    fn default() -> Self {
        Self {
            preview: None,
            needs_refresh: true,
            generation: 0,
            revision: 0,
            in_flight: None,
        }
    }
}

pub struct PreviewScheduler {
    records: HashMap<String, PreviewRecord>,
    config: PreviewConfig,
}

impl PreviewScheduler {
    pub fn new(config: PreviewConfig) -> Self {
        Self {
            records: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub fn mark_needs_refresh(&mut self, tab_id: &str) {
        self.records.entry(tab_id.to_string()).or_default().invalidate();
    }

    /// Unknown tabs always need a capture.
    pub fn needs_refresh(&self, tab_id: &str) -> bool {
        self.records.get(tab_id).map_or(true, |r| r.needs_refresh)
    }

    /// Mark the tab stale and start a new debounce window for it.
    pub fn schedule(&mut self, tab_id: &str) -> ScheduledCapture {
        let record = self.records.entry(tab_id.to_string()).or_default();
        record.invalidate();
        record.generation += 1;

        ScheduledCapture {
            tab_id: tab_id.to_string(),
            generation: record.generation,
            delay: self.config.debounce(),
        }
    }

    /// True if `generation` is still the latest schedule for the tab.
    pub fn is_current(&self, tab_id: &str, generation: u64) -> bool {
        self.records
            .get(tab_id)
            .is_some_and(|r| r.generation == generation)
    }

    /// Decide whether `tab` should be captured now. A `Capture` decision
    /// marks the capture as running until [`Self::complete`] is called.
    pub fn capture_if_needed(&mut self, tab: &Tab) -> CaptureDecision {
        let rect = self.config.capture_rect();
        let record = self.records.entry(tab.id.clone()).or_default();

        let primary = tab.primary();
        if primary.state.is_loading {
            record.needs_refresh = true;
            return CaptureDecision::SkipLoading;
        }
        if record.in_flight.is_some() || (record.preview.is_some() && !record.needs_refresh) {
            return CaptureDecision::Skip;
        }

        record.in_flight = Some(record.revision);
        tracing::debug!(tab_id = %tab.id, pane = %primary.id, "Capturing preview");

        CaptureDecision::Capture {
            pane: primary.id,
            rect,
        }
    }

    /// Record the outcome of a capture. Results for forgotten tabs are
    /// dropped. A snapshot taken before the latest invalidation is shown
    /// but leaves the tab stale, so the caller should schedule again.
    pub fn complete(
        &mut self,
        tab_id: &str,
        result: Result<SnapshotImage, EngineError>,
    ) -> CaptureOutcome {
        let Some(record) = self.records.get_mut(tab_id) else {
            tracing::debug!(tab_id = %tab_id, "Dropped preview for closed tab");
            return CaptureOutcome::Dropped;
        };
        let started_at = record.in_flight.take();

        let image = match result {
            Ok(image) => image,
            Err(e) => {
                tracing::debug!(tab_id = %tab_id, error = %e, "Preview capture failed");
                return CaptureOutcome::Failed;
            }
        };

        if started_at == Some(record.revision) {
            record.preview = Some(Preview::Snapshot(image));
            record.needs_refresh = false;
            return CaptureOutcome::Stored;
        }

        tracing::debug!(tab_id = %tab_id, "Tab changed during capture");
        // An error card set since the capture started wins over it.
        if matches!(record.preview, Some(Preview::ErrorCard { .. })) {
            return CaptureOutcome::Failed;
        }
        record.preview = Some(Preview::Snapshot(image));
        CaptureOutcome::Superseded
    }

    /// Show a placeholder instead of a snapshot until the next successful
    /// load.
    pub fn set_error_card(&mut self, tab_id: &str, reason: &str) {
        let record = self.records.entry(tab_id.to_string()).or_default();
        record.preview = Some(Preview::ErrorCard {
            reason: reason.to_string(),
        });
        record.needs_refresh = false;
    }

    /// Drop everything known about a tab.
    pub fn forget(&mut self, tab_id: &str) {
        self.records.remove(tab_id);
    }

    pub fn preview(&self, tab_id: &str) -> Option<&Preview> {
        self.records.get(tab_id).and_then(|r| r.preview.as_ref())
    }
}

impl Default for PreviewScheduler {
    fn default() -> Self {
        Self::new(PreviewConfig::default())
    }
}
