//! Error types.
//!
//! `AppError` is what the binary reports: a message plus a process exit code.
//! The fetch and export layers have their own typed errors so callers can
//! react to specific failures (e.g. the TUI surfaces an empty export as a
//! notice rather than a failure).
//!
//! Exit codes:
//! - `2` usage / input error
//! - `3` nothing to export
//! - `4` runtime failure (network, terminal, file system)

use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Failure of a single upstream query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("ADEME request failed: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("ADEME API error ({status}): {body}")]
    Status { status: u16, body: String },

    /// The body was not the expected `{ total, results }` JSON document.
    #[error("failed to parse ADEME response: {0}")]
    Decode(String),
}

/// Failure of a CSV export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Aucune donnée à exporter.")]
    Empty,

    #[error("failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        AppError::new(4, err.to_string())
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Empty => AppError::new(3, err.to_string()),
            ExportError::Io { .. } => AppError::new(4, err.to_string()),
        }
    }
}
