//! Swift client error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors reported by an [`ObjectClient`](super::ObjectClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The object (or container) does not exist.
    #[error("object not found")]
    NotFound,

    /// The store rejected a write whose body did not match the supplied ETag.
    #[error("object checksum did not match the supplied ETag")]
    ChecksumMismatch,

    /// The token or temporary URL signature was rejected.
    #[error("request rejected by the object store: {0}")]
    Unauthorized(String),

    /// Any other non-success status.
    #[error("object store returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        message: String,
    },

    /// Transport failure from the HTTP client.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Failure reading an upload body.
    #[error("failed to read upload body: {0}")]
    Io(#[from] std::io::Error),

    /// The store answered with something the client could not interpret.
    #[error("invalid response from object store: {0}")]
    InvalidResponse(String),

    /// The client could not be configured.
    #[error("invalid client configuration: {0}")]
    Configuration(String),

    /// A storage or temporary URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// Maps a non-success status to the matching variant.
    #[must_use]
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        match status {
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::UNPROCESSABLE_ENTITY => Self::ChecksumMismatch,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized(message.into()),
            _ => Self::Status {
                status: status.as_u16(),
                message: message.into(),
            },
        }
    }

    /// Create an invalid response error.
    #[must_use]
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Returns true if the error means the object does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}
