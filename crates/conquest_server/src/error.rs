//! Server error types.

use std::path::PathBuf;

use conquest_core::error::GameError;
use thiserror::Error;

use crate::lobby::JoinRejection;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while configuring or talking to a session.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Server settings are unusable.
    #[error("Invalid server config: {0}")]
    InvalidConfig(String),

    /// The simulation refused the request.
    #[error(transparent)]
    Game(#[from] GameError),

    /// The lobby refused a join.
    #[error("Join rejected: {0}")]
    JoinRejected(#[from] JoinRejection),

    /// The session task is gone.
    #[error("Session closed")]
    SessionClosed,
}
