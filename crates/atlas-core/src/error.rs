//! Error types for the atlas service.

use thiserror::Error;

/// Result type alias using the atlas Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for atlas operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A remote gazetteer did not answer within its deadline
    #[error("{source_name} did not respond within {secs}s")]
    RemoteTimeout { source_name: &'static str, secs: u64 },

    /// A remote gazetteer answered with something unusable
    /// (non-200 status, unparseable body, error sentinel in the page)
    #[error("Remote protocol error: {0}")]
    RemoteProtocol(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Query could not be parsed into a search specification
    #[error("Parse error: {0}")]
    Parse(String),

    /// Gazetteer dictionaries could not be initialized
    #[error("Init error: {0}")]
    Init(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl Error {
    /// Whether this error leaves the other legs of a federated search usable.
    ///
    /// Remote-source failures never sink a request; DB failures are recoverable
    /// once the retry has been spent (remote results still stand, §7).
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Init(_) | Error::Config(_) | Error::Internal(_))
    }
}
