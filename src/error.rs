//! Error types for the device exporter

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while collecting device metadata
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decode error
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),

    /// External command exited with a failure status
    #[error("command '{program}' failed (status {code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// External command did not complete within the configured timeout
    #[error("command '{program}' timed out after {timeout_ms}ms")]
    CommandTimeout { program: String, timeout_ms: u64 },

    /// Command output did not have the expected shape
    #[error("unexpected output from '{program}': {reason}")]
    UnexpectedOutput { program: String, reason: String },

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}
