//! Tandem Navigation
//!
//! - [`NavigationCoordinator`] folds renderer lifecycle events
//!   (`started → committed → finished | failed`) into per-pane tab state
//! - [`HistoryTracker`] keeps the newest-first visit log
//! - [`InputResolver`] turns address bar text into a URL to load

mod coordinator;
mod error;
mod history;
mod input;

pub use coordinator::{EventOutcome, NavigationCoordinator, PageVisit};
pub use error::NavigationError;
pub use history::{HistoryRecord, HistoryTracker, HISTORY_LIMIT};
pub use input::{InputResolution, InputResolver};

pub type Result<T> = std::result::Result<T, NavigationError>;
