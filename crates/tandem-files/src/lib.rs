//! Tandem File Dispatch
//!
//! Opening a local file picks one of three routes by MIME type:
//!
//! - **Direct**: the engine renders it natively (HTML, PDF, SVG, XHTML);
//!   a copy is staged and loaded as is
//! - **Wrapped**: images, media and text get a small host document written
//!   to the staging directory
//! - **External**: everything else is handed to the system
//!
//! A failed direct staging falls back to a wrapped document, and a failed
//! wrapped staging falls back to external.

mod classify;
mod dispatcher;
mod error;

pub use classify::{classify, ContentKind, WrapKind};
pub use dispatcher::{Dispatch, FileContentDispatcher};
pub use error::FileError;

pub type Result<T> = std::result::Result<T, FileError>;
