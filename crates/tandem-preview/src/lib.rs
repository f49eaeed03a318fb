//! Tandem Tab Previews
//!
//! Keeps one preview per tab (a snapshot of the primary pane, or an error
//! card when its load failed) and decides when a fresh capture is worth
//! taking. Timers and the capture itself belong to the caller; the
//! scheduler only hands out generations and capture requests.

mod config;
mod scheduler;

pub use config::PreviewConfig;
pub use scheduler::{CaptureDecision, CaptureOutcome, Preview, PreviewScheduler, ScheduledCapture};
