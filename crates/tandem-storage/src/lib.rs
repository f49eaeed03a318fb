//! Tandem Storage Layer
//!
//! SQLite-backed key/record store. The session core never writes rows of
//! its own: trackers serialize their logs to JSON and hand the text to
//! this crate under a well-known record key.

mod database;
mod error;
mod migrations;

pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
