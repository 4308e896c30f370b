//! Error types for the telemetry adapter

use thiserror::Error;

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Adapter error types
///
/// These never cross the public boundary: `attach` and the session methods
/// convert every failure into a warning plus a safe default so the host
/// page keeps running without telemetry.
#[derive(Error, Debug)]
pub enum Error {
    // Host validation errors
    #[error("player handle does not carry a version marker")]
    InvalidPlayer,

    // Binding errors
    #[error("media element is unavailable on the player")]
    MediaElementUnavailable,

    // Lifecycle errors
    #[error("session was already destroyed")]
    SessionDestroyed,
}

impl Error {
    /// Returns the stable error code used in diagnostics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidPlayer => "INVALID_PLAYER",
            Error::MediaElementUnavailable => "MEDIA_UNAVAILABLE",
            Error::SessionDestroyed => "SESSION_DESTROYED",
        }
    }
}
