//! The object store client seam.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use super::endpoint::ObjectEndpoint;
use super::error::ClientError;
use crate::storage::{ByteRange, Payload};

/// Stream of body chunks as the transport delivers them.
pub type ObjectStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// A write of one object.
#[derive(Debug)]
pub struct PutObject {
    /// Object key.
    pub key: String,
    /// Body.
    pub body: Payload,
    /// Content type stored with the object.
    pub content_type: String,
    /// Hex MD5 the store verifies the body against.
    pub etag: Option<String>,
    /// `Content-Disposition` stored with the object.
    pub content_disposition: Option<String>,
}

/// Metadata-only update of one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataUpdate {
    /// New content type.
    pub content_type: String,
    /// New `Content-Disposition`, if any.
    pub content_disposition: Option<String>,
}

/// Object metadata as reported by a HEAD request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Size in bytes.
    pub content_length: u64,
    /// Stored content type.
    pub content_type: Option<String>,
    /// Hex MD5 of the body.
    pub etag: Option<String>,
    /// Stored `Content-Disposition`.
    pub content_disposition: Option<String>,
}

/// Body of a GET request.
pub struct ObjectBody {
    /// Body chunks.
    pub stream: ObjectStream,
    /// False when a range was requested but the store sent the whole object.
    pub range_applied: bool,
}

/// Outcome of a bulk delete request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDeleteReport {
    /// Objects removed.
    pub deleted: usize,
    /// Objects that were already gone.
    pub not_found: usize,
    /// `(path, status)` of every object the store failed to remove.
    pub errors: Vec<(String, String)>,
}

impl BulkDeleteReport {
    /// Fold another batch into this report.
    pub fn merge(&mut self, other: Self) {
        self.deleted += other.deleted;
        self.not_found += other.not_found;
        self.errors.extend(other.errors);
    }
}

/// Swift object operations for one container.
///
/// Each call is a single request/response round trip. Implementations own
/// transport, connection pooling and timeouts; no retries happen above them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectClient: Send + Sync {
    /// Container and account this client addresses.
    fn endpoint(&self) -> &ObjectEndpoint;

    /// Create or overwrite an object, returning the ETag the store recorded.
    async fn put_object(&self, request: PutObject) -> Result<Option<String>, ClientError>;

    /// Read an object, optionally restricted to `range`.
    async fn get_object(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ObjectBody, ClientError>;

    /// Read object metadata.
    async fn head_object(&self, key: &str) -> Result<ObjectInfo, ClientError>;

    /// Remove an object.
    async fn delete_object(&self, key: &str) -> Result<(), ClientError>;

    /// Every key in the container starting with `prefix`, in listing order.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, ClientError>;

    /// Remove many objects at once.
    async fn bulk_delete(&self, keys: &[String]) -> Result<BulkDeleteReport, ClientError>;

    /// Replace the content type and disposition without rewriting the body.
    async fn post_metadata(&self, key: &str, update: MetadataUpdate) -> Result<(), ClientError>;
}
