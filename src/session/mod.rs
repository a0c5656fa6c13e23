//! Camera session management.
//!
//! A [`Session`] owns the driver connection and tracks its lifecycle.
//! Every operation other than `open`/`close` requires a ready session and
//! fails without side effects otherwise.

mod manager;
mod metadata;
mod script;
mod state;

pub use manager::{Session, SessionStats};
pub use metadata::CAMERA_NAME_CAPACITY;
pub use state::SessionState;

/// Compatibility token expected by current CCDCOM2 driver releases.
pub const DEFAULT_MAGIC: i32 = 20120101;
