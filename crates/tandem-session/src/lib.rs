//! Tandem Session Management
//!
//! - [`SessionStore`] owns the ordered tab list, the active tab and the
//!   pane → tab lookup table, and routes engine events to the coordinator
//! - [`SplitViewController`] creates and destroys secondary panes and moves
//!   focus between sides
//! - [`derive_global_state`] computes the published [`SessionState`] from
//!   the active tab; it is re-run after every mutation that can affect it
//!
//! The store never talks to previews, history or the presentation layer
//! directly. It queues [`SessionEffect`]s for whoever drives it.

mod effect;
mod error;
mod split;
mod state;
mod store;

pub use effect::SessionEffect;
pub use error::SessionError;
pub use split::SplitViewController;
pub use state::{derive_global_state, SessionState};
pub use store::{ClosedTab, SessionStore};

pub type Result<T> = std::result::Result<T, SessionError>;
