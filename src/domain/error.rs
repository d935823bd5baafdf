use std::time::Duration;
use thiserror::Error;

/// Failure of a single request against the portfolio endpoint.
///
/// Cloneable because every caller sharing a single-flight fetch receives the
/// same outcome.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{message}")]
    Validation { fields: Vec<String>, message: String },

    #[error("Submission rejected: {0}")]
    Rejected(String),

    #[error("Analytics error: {0}")]
    Analytics(String),

    #[error("Request abandoned: {0}")]
    Abandoned(String),
}

impl RequestError {
    /// Connection failures, timeouts and server-side (5xx) statuses are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            RequestError::Network(_) | RequestError::Timeout(_) => true,
            RequestError::HttpStatus(code) => *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            // reqwest does not report the configured duration
            RequestError::Timeout(Duration::ZERO)
        } else if e.is_decode() {
            RequestError::MalformedResponse(e.to_string())
        } else if let Some(status) = e.status() {
            RequestError::HttpStatus(status.as_u16())
        } else {
            RequestError::Network(e.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum FolioError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
