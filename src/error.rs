use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration, talking to the data provider,
/// or reading and writing artifacts.
///
/// Only [`IngestError::Config`] is fatal to a run. Everything else is caught
/// at the symbol boundary by the orchestrator and counted.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The symbol-to-ticker map is missing, unreadable or malformed.
    #[error("invalid ticker configuration {}: {}", .path.display(), .reason)]
    Config { path: PathBuf, reason: String },

    /// The HTTP request itself failed (connect, TLS, body decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status code.
    #[error("unexpected response status {status} at {url}")]
    Status { status: u16, url: String },

    /// The provider answered but reported an error in its payload.
    #[error("provider error: {0}")]
    Provider(String),

    #[error("I/O error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
