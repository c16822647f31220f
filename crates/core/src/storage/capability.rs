//! Optional capabilities a blob service may offer its host.

use async_trait::async_trait;

use super::error::StorageError;
use super::service::BlobService;

/// Rewrites the stored content type of an existing blob in place.
#[async_trait]
pub trait ContentTypeReconciler: Send + Sync {
    /// Set the content type of `key`, leaving the body untouched.
    ///
    /// Returns `false` when `key` does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the update.
    async fn change_content_type(&self, key: &str, content_type: &str)
    -> Result<bool, StorageError>;
}

/// What the host knows about a stored blob after analysing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRecord {
    /// Object key.
    pub key: String,
    /// Content type the host identified.
    pub content_type: Option<String>,
    /// True once content identification has run.
    pub identified: bool,
}

/// Push an identified content type to the store, if the service can.
///
/// Returns `true` only when the store was updated.
///
/// # Errors
///
/// Returns the reconciler's error.
pub async fn reconcile_identified_content_type(
    service: &dyn BlobService,
    record: &BlobRecord,
) -> Result<bool, StorageError> {
    if !record.identified {
        return Ok(false);
    }
    let Some(content_type) = record
        .content_type
        .as_deref()
        .filter(|value| !value.trim().is_empty())
    else {
        return Ok(false);
    };
    let Some(reconciler) = service.content_type_reconciler() else {
        tracing::debug!(key = %record.key, "service cannot change content types");
        return Ok(false);
    };

    reconciler
        .change_content_type(&record.key, content_type)
        .await
}
