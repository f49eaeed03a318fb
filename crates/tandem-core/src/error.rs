//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] tandem_storage::StorageError),

    #[error("Tab error: {0}")]
    Tab(#[from] tandem_tabs::TabError),

    #[error("Session error: {0}")]
    Session(#[from] tandem_session::SessionError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] tandem_navigation::NavigationError),

    #[error("Download error: {0}")]
    Download(#[from] tandem_download::DownloadError),

    #[error("File error: {0}")]
    File(#[from] tandem_files::FileError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session actor is not running")]
    ActorClosed,
}
