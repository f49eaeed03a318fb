//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Tab not found: {0}")]
    TabNotFound(String),

    /// A call site asked for something the session invariants forbid,
    /// such as loading into a secondary pane that does not exist.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tab error: {0}")]
    Tab(#[from] tandem_tabs::TabError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] tandem_navigation::NavigationError),
}
