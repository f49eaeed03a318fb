//! Navigation error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Tab {tab_id} has no {side} pane")]
    MissingPane {
        tab_id: String,
        side: tandem_tabs::PaneSide,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] tandem_storage::StorageError),

    #[error("History record is corrupt: {0}")]
    Persistence(#[from] serde_json::Error),
}
