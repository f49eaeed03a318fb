//! Download error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Download not found: {0}")]
    NotFound(String),

    #[error("Download is not in progress: {0}")]
    NotInProgress(String),

    #[error("Storage error: {0}")]
    Storage(#[from] tandem_storage::StorageError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] serde_json::Error),
}
