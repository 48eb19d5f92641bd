//! Error types for the InfoBerry client

use ibengine::FetchError;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the InfoBerry server
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request failed (connection, timeout, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server does not know this serial
    #[error("Player {0} is not registered")]
    NotRegistered(String),

    /// The server answered with an unexpected status
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The body could not be decoded
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<Error> for FetchError {
    fn from(err: Error) -> Self {
        match err {
            Error::NotRegistered(serial) => FetchError::NotRegistered(serial),
            Error::Decode(e) => FetchError::Malformed(e.to_string()),
            Error::Http(e) if e.is_decode() => FetchError::Malformed(e.to_string()),
            other => FetchError::Transient(other.to_string()),
        }
    }
}
