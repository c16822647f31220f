//! Blob service backed by an OpenStack Swift container.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use swiftblob_shared::ConnectionSettings;
use tracing::{debug, info, warn};

use super::capability::ContentTypeReconciler;
use super::checksum::Checksum;
use super::chunking::rechunk;
use super::config::{StorageConfig, StorageProvider};
use super::disposition::{ContentDisposition, Disposition};
use super::error::StorageError;
use super::mime::{ExtensionSniffer, MimeSniffer, SNIFF_LEN, resolve_content_type};
use super::payload::Payload;
use super::range::ByteRange;
use crate::swift::{
    ClientError, HttpSwiftClient, MemorySwiftClient, MetadataUpdate, ObjectClient,
    ObjectEndpoint, ObjectStream, PutObject, TempUrlMethod, TempUrlParams, TempUrlSigner,
};

/// Downloaded blob as a stream of fixed-size chunks.
pub type BlobStream = BoxStream<'static, Result<Bytes, StorageError>>;

/// Options for [`BlobService::upload`].
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Base64 MD5 of the payload; the store rejects the write on mismatch.
    pub checksum: Option<String>,
    /// Content type, overriding anything declared on the payload.
    pub content_type: Option<String>,
    /// Stored as the object's `Content-Disposition`.
    pub disposition: Option<ContentDisposition>,
}

impl UploadOptions {
    /// Verify the upload against a base64 MD5.
    #[must_use]
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    /// Store under an explicit content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Store a `Content-Disposition` with the object.
    #[must_use]
    pub fn with_disposition(mut self, disposition: ContentDisposition) -> Self {
        self.disposition = Some(disposition);
        self
    }
}

/// Options for [`BlobService::url`].
#[derive(Debug, Clone)]
pub struct UrlOptions {
    /// Lifetime of the URL.
    pub expires_in: Duration,
    /// Inline unless explicitly an attachment.
    pub disposition: Disposition,
    /// Filename the store reports in `Content-Disposition`.
    pub filename: Option<String>,
    /// Accepted for interface parity; Swift cannot override it per URL.
    pub content_type: Option<String>,
}

impl UrlOptions {
    /// Inline URL valid for `expires_in`.
    #[must_use]
    pub fn new(expires_in: Duration) -> Self {
        Self {
            expires_in,
            disposition: Disposition::Inline,
            filename: None,
            content_type: None,
        }
    }

    /// Set the disposition.
    #[must_use]
    pub fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = disposition;
        self
    }

    /// Set the filename.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the requested content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Options for [`BlobService::url_for_direct_upload`].
#[derive(Debug, Clone)]
pub struct DirectUploadOptions {
    /// Lifetime of the URL.
    pub expires_in: Duration,
    /// Content type the client will send.
    pub content_type: Option<String>,
    /// Size the client will send.
    pub content_length: Option<u64>,
    /// Base64 MD5 the client will send.
    pub checksum: Option<String>,
}

impl DirectUploadOptions {
    /// Upload URL valid for `expires_in`.
    #[must_use]
    pub fn new(expires_in: Duration) -> Self {
        Self {
            expires_in,
            content_type: None,
            content_length: None,
            checksum: None,
        }
    }

    /// Set the announced size.
    #[must_use]
    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = Some(content_length);
        self
    }
}

/// Input of [`BlobService::headers_for_direct_upload`].
#[derive(Debug, Clone)]
pub struct DirectUploadHeaders {
    /// Content type of the upload.
    pub content_type: String,
    /// Base64 MD5 of the upload.
    pub checksum: String,
    /// Size of the upload.
    pub content_length: Option<u64>,
    /// Disposition stored with the object.
    pub disposition: Option<ContentDisposition>,
}

impl DirectUploadHeaders {
    /// Headers for a body of `content_type` with base64 MD5 `checksum`.
    #[must_use]
    pub fn new(content_type: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            checksum: checksum.into(),
            content_length: None,
            disposition: None,
        }
    }

    /// Include `Content-Length`.
    #[must_use]
    pub fn with_content_length(mut self, content_length: u64) -> Self {
        self.content_length = Some(content_length);
        self
    }

    /// Include `Content-Disposition`.
    #[must_use]
    pub fn with_disposition(mut self, disposition: ContentDisposition) -> Self {
        self.disposition = Some(disposition);
        self
    }
}

/// The operations a host attachment framework needs from a blob store.
#[async_trait]
pub trait BlobService: Send + Sync {
    /// Store `payload` at `key`, replacing any previous blob.
    ///
    /// # Errors
    ///
    /// [`StorageError::Integrity`] if the checksum does not match the body.
    async fn upload(
        &self,
        key: &str,
        payload: Payload,
        options: UploadOptions,
    ) -> Result<(), StorageError>;

    /// The whole blob.
    ///
    /// # Errors
    ///
    /// [`StorageError::FileNotFound`] if `key` does not exist.
    async fn download(&self, key: &str) -> Result<Bytes, StorageError>;

    /// The blob as a chunk stream.
    ///
    /// # Errors
    ///
    /// [`StorageError::FileNotFound`] if `key` does not exist.
    async fn download_stream(&self, key: &str) -> Result<BlobStream, StorageError>;

    /// Feed the blob to `sink` one chunk at a time, in order.
    ///
    /// # Errors
    ///
    /// [`StorageError::FileNotFound`] if `key` does not exist, or the first
    /// transport error.
    async fn download_to(
        &self,
        key: &str,
        sink: &mut (dyn FnMut(Bytes) + Send),
    ) -> Result<(), StorageError> {
        let mut stream = self.download_stream(key).await?;
        while let Some(chunk) = stream.next().await {
            sink(chunk?);
        }
        Ok(())
    }

    /// The bytes of the blob covered by `range`.
    ///
    /// # Errors
    ///
    /// [`StorageError::FileNotFound`] if `key` does not exist.
    async fn download_chunk(&self, key: &str, range: ByteRange) -> Result<Bytes, StorageError>;

    /// Remove the blob. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns transport failures.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Remove every blob whose key starts with `prefix`, returning the count.
    ///
    /// # Errors
    ///
    /// [`StorageError::BulkDelete`] if some objects could not be removed.
    async fn delete_prefixed(&self, prefix: &str) -> Result<usize, StorageError>;

    /// True if the blob exists.
    ///
    /// # Errors
    ///
    /// Returns failures other than not-found.
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Signed, time-limited download URL.
    ///
    /// # Errors
    ///
    /// [`StorageError::InvalidExpiry`] for a zero lifetime.
    fn url(&self, key: &str, options: &UrlOptions) -> Result<String, StorageError>;

    /// Signed, time-limited upload URL.
    ///
    /// # Errors
    ///
    /// [`StorageError::InvalidExpiry`] for a zero lifetime.
    fn url_for_direct_upload(
        &self,
        key: &str,
        options: &DirectUploadOptions,
    ) -> Result<String, StorageError>;

    /// Headers a client must send with a direct upload.
    ///
    /// # Errors
    ///
    /// [`StorageError::InvalidChecksum`] if the checksum is not base64 MD5.
    fn headers_for_direct_upload(
        &self,
        key: &str,
        headers: DirectUploadHeaders,
    ) -> Result<HashMap<String, String>, StorageError>;

    /// Replace content type and, when given, disposition without rewriting
    /// the body.
    ///
    /// # Errors
    ///
    /// [`StorageError::FileNotFound`] if `key` does not exist.
    async fn update_metadata(
        &self,
        key: &str,
        content_type: &str,
        disposition: Option<ContentDisposition>,
    ) -> Result<(), StorageError>;

    /// The content type reconciler, if this service has one.
    fn content_type_reconciler(&self) -> Option<&dyn ContentTypeReconciler> {
        None
    }
}

/// [`BlobService`] storing blobs in one Swift container.
pub struct SwiftStorageService {
    client: Arc<dyn ObjectClient>,
    signer: TempUrlSigner,
    sniffer: Arc<dyn MimeSniffer>,
    chunk_size: usize,
}

impl fmt::Debug for SwiftStorageService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwiftStorageService")
            .field("endpoint", self.client.endpoint())
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

impl SwiftStorageService {
    /// Create a service from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Configuration`] if the configuration is
    /// invalid or the client cannot be built.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        config.validate()?;

        let configuration = |e: ClientError| StorageError::configuration(e.to_string());
        let endpoint = ObjectEndpoint::new(config.provider.storage_url(), &config.container)
            .map_err(configuration)?;
        let signer = TempUrlSigner::new(config.provider.temp_url_key()).map_err(configuration)?;

        let client: Arc<dyn ObjectClient> = match &config.provider {
            StorageProvider::Swift { auth_token, .. } => Arc::new(
                HttpSwiftClient::new(endpoint, auth_token.clone(), &config.connection)
                    .map_err(configuration)?,
            ),
            StorageProvider::Memory { .. } => {
                warn!("using the in-memory object store; blobs are not persisted");
                Arc::new(MemorySwiftClient::new(endpoint, signer.clone()))
            }
        };

        info!(
            provider = config.provider.name(),
            container = %config.container,
            "storage service ready"
        );
        Ok(Self::new(client, signer).with_chunk_size(config.connection.chunk_size))
    }

    /// Create a service over an existing client.
    #[must_use]
    pub fn new(client: Arc<dyn ObjectClient>, signer: TempUrlSigner) -> Self {
        Self {
            client,
            signer,
            sniffer: Arc::new(ExtensionSniffer),
            chunk_size: ConnectionSettings::default().chunk_size,
        }
    }

    /// Replace the MIME collaborator.
    #[must_use]
    pub fn with_sniffer(mut self, sniffer: Arc<dyn MimeSniffer>) -> Self {
        self.sniffer = sniffer;
        self
    }

    /// Set the streaming download chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Container name.
    #[must_use]
    pub fn container(&self) -> &str {
        self.client.endpoint().container()
    }

    fn signed_url(
        &self,
        method: TempUrlMethod,
        key: &str,
        expires_in: Duration,
        params: &TempUrlParams<'_>,
    ) -> Result<String, StorageError> {
        let expires_at = expires_at(expires_in)?;
        Ok(self
            .signer
            .temp_url(self.client.endpoint(), method, key, expires_at, params))
    }
}

/// Unix time `expires_in` from now, rounded up to whole seconds.
fn expires_at(expires_in: Duration) -> Result<i64, StorageError> {
    if expires_in.is_zero() {
        return Err(StorageError::InvalidExpiry);
    }
    let seconds = expires_in.as_secs() + u64::from(expires_in.subsec_nanos() > 0);
    let seconds = i64::try_from(seconds).map_err(|_| StorageError::InvalidExpiry)?;
    Utc::now()
        .timestamp()
        .checked_add(seconds)
        .ok_or(StorageError::InvalidExpiry)
}

async fn collect(key: &str, stream: ObjectStream) -> Result<Bytes, StorageError> {
    let buf = stream
        .try_fold(BytesMut::new(), |mut buf, chunk| async move {
            buf.extend_from_slice(&chunk);
            Ok(buf)
        })
        .await
        .map_err(|e| StorageError::from_client(key, e))?;
    Ok(buf.freeze())
}

#[async_trait]
impl BlobService for SwiftStorageService {
    async fn upload(
        &self,
        key: &str,
        payload: Payload,
        options: UploadOptions,
    ) -> Result<(), StorageError> {
        let checksum = options
            .checksum
            .as_deref()
            .map(Checksum::from_base64)
            .transpose()?;

        let mut payload = payload;
        let head = if options
            .content_type
            .as_deref()
            .is_some_and(|explicit| !explicit.trim().is_empty())
        {
            Bytes::new()
        } else {
            payload.head(SNIFF_LEN).await.map_err(ClientError::from)?
        };
        let filename = payload.filename().or(options
            .disposition
            .as_ref()
            .map(|disposition| disposition.filename.as_str()));
        let content_type = resolve_content_type(
            self.sniffer.as_ref(),
            options.content_type.as_deref(),
            &head,
            filename,
            payload.content_type(),
        );

        let request = PutObject {
            key: key.to_string(),
            body: payload,
            content_type: content_type.clone(),
            etag: checksum.map(|checksum| checksum.to_hex()),
            content_disposition: options
                .disposition
                .as_ref()
                .map(ContentDisposition::header_value),
        };

        let stored = match self.client.put_object(request).await {
            Ok(stored) => stored,
            Err(err) => {
                let err = StorageError::from_client(key, err);
                if matches!(err, StorageError::Integrity { .. }) {
                    warn!(key = %key, "store rejected upload: checksum mismatch");
                }
                return Err(err);
            }
        };

        if let (Some(checksum), Some(stored)) = (checksum, stored.as_deref())
            && !checksum.matches_etag(stored)
        {
            warn!(
                key = %key,
                expected = %checksum.to_hex(),
                stored = %stored,
                "stored ETag does not match checksum, removing object"
            );
            if let Err(err) = self.client.delete_object(key).await
                && !err.is_not_found()
            {
                warn!(key = %key, error = %err, "failed to remove mismatched upload");
            }
            return Err(StorageError::integrity(key));
        }

        info!(key = %key, content_type = %content_type, "uploaded blob");
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Bytes, StorageError> {
        let body = self
            .client
            .get_object(key, None)
            .await
            .map_err(|e| StorageError::from_client(key, e))?;
        let data = collect(key, body.stream).await?;
        debug!(key = %key, size = data.len(), "downloaded blob");
        Ok(data)
    }

    async fn download_stream(&self, key: &str) -> Result<BlobStream, StorageError> {
        let body = self
            .client
            .get_object(key, None)
            .await
            .map_err(|e| StorageError::from_client(key, e))?;

        let owned = key.to_string();
        Ok(rechunk(body.stream, self.chunk_size)
            .map_err(move |e| StorageError::from_client(&owned, e))
            .boxed())
    }

    async fn download_chunk(&self, key: &str, range: ByteRange) -> Result<Bytes, StorageError> {
        if range.is_empty() {
            self.client
                .head_object(key)
                .await
                .map_err(|e| StorageError::from_client(key, e))?;
            return Ok(Bytes::new());
        }

        let body = self
            .client
            .get_object(key, Some(range))
            .await
            .map_err(|e| StorageError::from_client(key, e))?;
        let range_applied = body.range_applied;
        let data = collect(key, body.stream).await?;

        if range_applied {
            Ok(data)
        } else {
            debug!(key = %key, "store ignored the range, slicing locally");
            Ok(range.slice(&data))
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        match self.client.delete_object(key).await {
            Ok(()) => {
                info!(key = %key, "deleted blob");
                Ok(true)
            }
            Err(err) if err.is_not_found() => {
                debug!(key = %key, "blob already absent");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn delete_prefixed(&self, prefix: &str) -> Result<usize, StorageError> {
        let keys: Vec<String> = self
            .client
            .list_objects(prefix)
            .await?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect();

        if keys.is_empty() {
            debug!(prefix = %prefix, "no blobs under prefix");
            return Ok(0);
        }

        let report = self.client.bulk_delete(&keys).await?;
        if !report.errors.is_empty() {
            warn!(
                prefix = %prefix,
                failed = report.errors.len(),
                "bulk delete left objects behind"
            );
            return Err(StorageError::BulkDelete {
                failures: report.errors,
            });
        }

        info!(
            prefix = %prefix,
            count = report.deleted,
            not_found = report.not_found,
            "deleted blobs under prefix"
        );
        Ok(report.deleted)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self.client.head_object(key).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn url(&self, key: &str, options: &UrlOptions) -> Result<String, StorageError> {
        if let Some(content_type) = &options.content_type {
            debug!(
                key = %key,
                content_type = %content_type,
                "temporary URLs serve the stored content type"
            );
        }

        let params = TempUrlParams {
            filename: options.filename.as_deref(),
            inline: options.disposition != Disposition::Attachment,
        };
        self.signed_url(TempUrlMethod::Get, key, options.expires_in, &params)
    }

    fn url_for_direct_upload(
        &self,
        key: &str,
        options: &DirectUploadOptions,
    ) -> Result<String, StorageError> {
        let url = self.signed_url(
            TempUrlMethod::Put,
            key,
            options.expires_in,
            &TempUrlParams::default(),
        )?;
        debug!(
            key = %key,
            content_type = ?options.content_type,
            content_length = ?options.content_length,
            "issued direct upload URL"
        );
        Ok(url)
    }

    fn headers_for_direct_upload(
        &self,
        key: &str,
        headers: DirectUploadHeaders,
    ) -> Result<HashMap<String, String>, StorageError> {
        let checksum = Checksum::from_base64(&headers.checksum)?;

        let mut out = HashMap::from([
            ("Content-Type".to_string(), headers.content_type),
            ("ETag".to_string(), checksum.to_hex()),
        ]);
        if let Some(content_length) = headers.content_length {
            out.insert("Content-Length".to_string(), content_length.to_string());
        }
        if let Some(disposition) = headers.disposition {
            out.insert(
                "Content-Disposition".to_string(),
                disposition.header_value(),
            );
        }

        debug!(key = %key, "built direct upload headers");
        Ok(out)
    }

    async fn update_metadata(
        &self,
        key: &str,
        content_type: &str,
        disposition: Option<ContentDisposition>,
    ) -> Result<(), StorageError> {
        let current = self
            .client
            .head_object(key)
            .await
            .map_err(|e| StorageError::from_client(key, e))?;

        let update = MetadataUpdate {
            content_type: content_type.to_string(),
            content_disposition: disposition
                .as_ref()
                .map(ContentDisposition::header_value)
                .or(current.content_disposition),
        };
        self.client
            .post_metadata(key, update)
            .await
            .map_err(|e| StorageError::from_client(key, e))?;

        info!(key = %key, content_type = %content_type, "updated blob metadata");
        Ok(())
    }

    fn content_type_reconciler(&self) -> Option<&dyn ContentTypeReconciler> {
        Some(self)
    }
}

#[async_trait]
impl ContentTypeReconciler for SwiftStorageService {
    async fn change_content_type(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<bool, StorageError> {
        match self.update_metadata(key, content_type, None).await {
            Ok(()) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }
}
