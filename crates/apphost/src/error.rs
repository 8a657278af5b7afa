use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration loading, payload encoding and the CLI.
///
/// Launch and acquisition paths never surface this to their callers; they
/// degrade to a dialog or a default value instead.
#[derive(Debug, Error)]
pub enum AppHostError {
    /// Invalid input provided by the caller.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Filesystem failure while reading or writing configuration.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A payload or config file was not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// A `data` parameter was not valid percent-encoded UTF-8.
    #[error("invalid url encoding: {0}")]
    UrlEncoding(String),
    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppHostError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppHostError::InvalidInput(_) => 2,
            AppHostError::Json(_) | AppHostError::UrlEncoding(_) => 3,
            AppHostError::Io { .. } | AppHostError::Internal(_) => 1,
        }
    }
}

/// Result type alias using [`AppHostError`].
pub type AppHostResult<T> = Result<T, AppHostError>;
