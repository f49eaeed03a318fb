//! Preview capture settings

use serde::{Deserialize, Serialize};
use std::time::Duration;

use tandem_tabs::SnapshotRect;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewConfig {
    /// Quiet period after the last trigger before a capture runs
    pub debounce_ms: u64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Captured area relative to the viewport (> 1.0 zooms out)
    pub zoom_out: f64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            viewport_width: 1280.0,
            viewport_height: 800.0,
            zoom_out: 1.5,
        }
    }
}

impl PreviewConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Region handed to the engine for every capture.
    pub fn capture_rect(&self) -> SnapshotRect {
        let zoom = self.zoom_out.max(1.0);
        SnapshotRect {
            x: 0.0,
            y: 0.0,
            width: self.viewport_width * zoom,
            height: self.viewport_height * zoom,
        }
    }
}
