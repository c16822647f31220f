//! Storage configuration types.

use serde::{Deserialize, Serialize};
use swiftblob_shared::{ConnectionSettings, ProviderKind, StorageSettings};

use super::error::StorageError;

/// Storage provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// OpenStack Swift reached over HTTP.
    Swift {
        /// Account storage URL, e.g. `https://swift.example.com/v1/AUTH_tenant`.
        storage_url: String,
        /// Pre-issued auth token.
        auth_token: String,
        /// Account temp-URL key.
        temp_url_key: String,
    },
    /// In-process store (development and tests only).
    Memory {
        /// Storage URL temporary URLs are built against.
        storage_url: String,
        /// Temp-URL key.
        temp_url_key: String,
    },
}

impl std::fmt::Debug for StorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Swift { storage_url, .. } => f
                .debug_struct("Swift")
                .field("storage_url", storage_url)
                .finish_non_exhaustive(),
            Self::Memory { storage_url, .. } => f
                .debug_struct("Memory")
                .field("storage_url", storage_url)
                .finish_non_exhaustive(),
        }
    }
}

impl StorageProvider {
    /// Create a Swift provider.
    #[must_use]
    pub fn swift(
        storage_url: impl Into<String>,
        auth_token: impl Into<String>,
        temp_url_key: impl Into<String>,
    ) -> Self {
        Self::Swift {
            storage_url: storage_url.into(),
            auth_token: auth_token.into(),
            temp_url_key: temp_url_key.into(),
        }
    }

    /// Create an in-memory provider (development only).
    #[must_use]
    pub fn memory(storage_url: impl Into<String>, temp_url_key: impl Into<String>) -> Self {
        Self::Memory {
            storage_url: storage_url.into(),
            temp_url_key: temp_url_key.into(),
        }
    }

    /// Provider name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Swift { .. } => "swift",
            Self::Memory { .. } => "memory",
        }
    }

    /// Account storage URL.
    #[must_use]
    pub fn storage_url(&self) -> &str {
        match self {
            Self::Swift { storage_url, .. } | Self::Memory { storage_url, .. } => storage_url,
        }
    }

    /// Temp-URL key.
    #[must_use]
    pub fn temp_url_key(&self) -> &str {
        match self {
            Self::Swift { temp_url_key, .. } | Self::Memory { temp_url_key, .. } => temp_url_key,
        }
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Container holding every blob of this deployment.
    pub container: String,
    /// Per-connection overrides.
    pub connection: ConnectionSettings,
}

impl StorageConfig {
    /// Create a new storage config with default connection settings.
    #[must_use]
    pub fn new(provider: StorageProvider, container: impl Into<String>) -> Self {
        Self {
            provider,
            container: container.into(),
            connection: ConnectionSettings::default(),
        }
    }

    /// Build from loaded application settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the Swift provider is selected without a token.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let provider = match settings.provider {
            ProviderKind::Swift => {
                let auth_token = settings.auth_token.clone().ok_or_else(|| {
                    StorageError::configuration("auth_token is required for the swift provider")
                })?;
                StorageProvider::swift(
                    settings.storage_url.clone(),
                    auth_token,
                    settings.temp_url_key.clone(),
                )
            }
            ProviderKind::Memory => StorageProvider::memory(
                settings.storage_url.clone(),
                settings.temp_url_key.clone(),
            ),
        };

        Ok(Self::new(provider, settings.container.clone())
            .with_connection(settings.connection.clone()))
    }

    /// Replace all connection settings.
    #[must_use]
    pub fn with_connection(mut self, connection: ConnectionSettings) -> Self {
        self.connection = connection;
        self
    }

    /// Set the streaming download chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.connection.chunk_size = chunk_size;
        self
    }

    /// Enable or disable TLS certificate verification.
    #[must_use]
    pub fn with_ssl_verify_peer(mut self, verify: bool) -> Self {
        self.connection.ssl_verify_peer = verify;
        self
    }

    /// Check the values that cannot be caught by deserialization.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid field.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.container.trim().is_empty() {
            return Err(StorageError::configuration("container name is empty"));
        }
        if self.provider.temp_url_key().is_empty() {
            return Err(StorageError::configuration("temp_url_key is empty"));
        }
        if let StorageProvider::Swift { auth_token, .. } = &self.provider
            && auth_token.trim().is_empty()
        {
            return Err(StorageError::configuration("auth_token is empty"));
        }
        if self.connection.chunk_size == 0 {
            return Err(StorageError::configuration("chunk_size must be positive"));
        }
        Ok(())
    }
}
