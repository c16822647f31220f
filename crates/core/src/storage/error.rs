//! Storage error types.

use thiserror::Error;

use crate::swift::ClientError;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not verify the uploaded body against its checksum.
    #[error("checksum verification failed for {key}")]
    Integrity {
        /// Key of the rejected upload.
        key: String,
    },

    /// File not found in storage.
    #[error("file not found: {key}")]
    FileNotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// A checksum could not be decoded.
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    /// Temporary URLs must expire in the future.
    #[error("temporary URL expiry must be at least one second in the future")]
    InvalidExpiry,

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Some objects of a bulk delete could not be removed.
    #[error("bulk delete failed for {} objects: {}", failures.len(), summarize(failures))]
    BulkDelete {
        /// `(path, status)` per failed object.
        failures: Vec<(String, String)>,
    },

    /// Transport or protocol failure from the object store client.
    #[error(transparent)]
    Client(#[from] ClientError),
}

fn summarize(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .take(3)
        .map(|(path, status)| format!("{path} ({status})"))
        .collect::<Vec<_>>()
        .join(", ")
}

impl StorageError {
    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::FileNotFound { key: key.into() }
    }

    /// Create an integrity error.
    #[must_use]
    pub fn integrity(key: impl Into<String>) -> Self {
        Self::Integrity { key: key.into() }
    }

    /// Create an invalid checksum error.
    #[must_use]
    pub fn invalid_checksum(msg: impl Into<String>) -> Self {
        Self::InvalidChecksum(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Attach `key` to the client failures that have a named storage meaning.
    #[must_use]
    pub fn from_client(key: &str, err: ClientError) -> Self {
        match err {
            ClientError::NotFound => Self::not_found(key),
            ClientError::ChecksumMismatch => Self::integrity(key),
            other => Self::Client(other),
        }
    }

    /// Returns true for [`StorageError::FileNotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }
}
