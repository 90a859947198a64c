use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the shell-apps crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for application operations.
///
/// Lookups that fail return `None` rather than an error; invariant
/// violations (e.g. a Running to Starting transition) panic. Only
/// user-recoverable failures surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// Launching an application failed. Carries the display name so the
    /// shell can show a notification, and the launcher's message.
    #[error("failed to launch '{name}': {message}")]
    Launch {
        /// Display name of the application.
        name: String,
        /// Underlying failure reported by the launch primitive.
        message: String,
    },
}
