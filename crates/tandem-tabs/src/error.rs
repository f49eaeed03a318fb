//! Tab error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TabError {
    #[error("Tab {0} has no secondary pane")]
    NoSecondaryPane(String),

    #[error("Tab {0} is already split")]
    AlreadySplit(String),
}
