//! File dispatch error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("Not an absolute file path: {0}")]
    NotAbsolute(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
