//! Tandem Download Log
//!
//! - One record per download, persisted as a single JSON document
//! - Progress reported by the engine while the transfer runs
//! - Finished entries kept until explicitly pruned

mod download;
mod error;
mod tracker;

pub use download::{DownloadRecord, DownloadState};
pub use error::DownloadError;
pub use tracker::DownloadTracker;

pub type Result<T> = std::result::Result<T, DownloadError>;
