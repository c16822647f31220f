//! In-process object store with Swift semantics (development and tests only).
//!
//! Besides the [`ObjectClient`] operations it answers out-of-band temporary
//! URL requests the way Swift's tempurl middleware does, so signed URLs and
//! direct uploads can be exercised without a cluster.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::StreamExt;
use futures::stream;
use tokio::sync::RwLock;
use url::Url;

use super::client::{
    BulkDeleteReport, MetadataUpdate, ObjectBody, ObjectClient, ObjectInfo, PutObject,
};
use super::endpoint::ObjectEndpoint;
use super::error::ClientError;
use super::temp_url::{TempUrlMethod, TempUrlSigner};
use crate::storage::{ByteRange, Checksum, ContentDisposition, DEFAULT_CONTENT_TYPE, Disposition};

/// Size of the chunks GET responses are delivered in.
const TRANSPORT_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    content_disposition: Option<String>,
    etag: String,
}

impl StoredObject {
    fn info(&self) -> ObjectInfo {
        ObjectInfo {
            content_length: self.data.len() as u64,
            content_type: Some(self.content_type.clone()),
            etag: Some(self.etag.clone()),
            content_disposition: self.content_disposition.clone(),
        }
    }
}

/// Response headers of a request made through a temporary URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedResponse {
    /// `Content-Type`.
    pub content_type: String,
    /// `Content-Length`.
    pub content_length: u64,
    /// `Content-Disposition`, if any.
    pub content_disposition: Option<String>,
}

struct TempUrlQuery {
    key: String,
    method: TempUrlMethod,
    filename: Option<String>,
    inline: bool,
}

/// In-memory Swift container.
#[derive(Debug)]
pub struct MemorySwiftClient {
    endpoint: ObjectEndpoint,
    signer: TempUrlSigner,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemorySwiftClient {
    /// Create an empty container that accepts URLs signed by `signer`.
    #[must_use]
    pub fn new(endpoint: ObjectEndpoint, signer: TempUrlSigner) -> Self {
        Self {
            endpoint,
            signer,
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// True if the container holds no objects.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Serve a `PUT` made through a temporary URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] for bad or expired signatures and
    /// [`ClientError::ChecksumMismatch`] when the `ETag` header does not match.
    pub async fn put_signed(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: Bytes,
    ) -> Result<(), ClientError> {
        let query = self.authorize(url, &[TempUrlMethod::Put])?;
        let content_type = header(headers, "Content-Type")
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        self.store(
            query.key,
            body,
            content_type,
            header(headers, "ETag"),
            header(headers, "Content-Disposition").map(ToString::to_string),
        )
        .await
        .map(|_| ())
    }

    /// Serve a `HEAD` made through a temporary URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Unauthorized`] for bad or expired signatures and
    /// [`ClientError::NotFound`] for missing objects.
    pub async fn head_signed(&self, url: &str) -> Result<SignedResponse, ClientError> {
        let query = self.authorize(
            url,
            &[TempUrlMethod::Get, TempUrlMethod::Head, TempUrlMethod::Put],
        )?;
        let objects = self.objects.read().await;
        let object = objects.get(&query.key).ok_or(ClientError::NotFound)?;

        let content_disposition = match (&query.filename, query.inline) {
            (Some(filename), inline) => {
                let disposition = if inline {
                    Disposition::Inline
                } else {
                    Disposition::Attachment
                };
                Some(ContentDisposition::new(disposition, filename.clone()).header_value())
            }
            (None, true) => Some(Disposition::Inline.to_string()),
            (None, false) => object.content_disposition.clone().or_else(|| {
                (query.method == TempUrlMethod::Get).then(|| {
                    let name = query.key.rsplit('/').next().unwrap_or(&query.key);
                    ContentDisposition::attachment(name).header_value()
                })
            }),
        };

        Ok(SignedResponse {
            content_type: object.content_type.clone(),
            content_length: object.data.len() as u64,
            content_disposition,
        })
    }

    fn authorize(&self, url: &str, methods: &[TempUrlMethod]) -> Result<TempUrlQuery, ClientError> {
        let url = Url::parse(url).map_err(|e| ClientError::InvalidUrl(format!("{url}: {e}")))?;

        let mut signature = None;
        let mut expires_at = None;
        let mut filename = None;
        let mut inline = false;
        for (name, value) in url.query_pairs() {
            match name.as_ref() {
                "temp_url_sig" => signature = Some(value.into_owned()),
                "temp_url_expires" => expires_at = value.parse::<i64>().ok(),
                "filename" => filename = Some(value.into_owned()),
                "inline" => inline = true,
                _ => {}
            }
        }

        let (Some(signature), Some(expires_at)) = (signature, expires_at) else {
            return Err(ClientError::Unauthorized(
                "temporary URL parameters missing".to_string(),
            ));
        };
        if expires_at <= Utc::now().timestamp() {
            return Err(ClientError::Unauthorized("temporary URL expired".to_string()));
        }

        let key = self
            .endpoint
            .key_from_path(url.path())
            .ok_or_else(|| ClientError::Unauthorized("URL outside of container".to_string()))?;
        let path = self.endpoint.object_path(&key);
        let Some(method) = methods
            .iter()
            .copied()
            .find(|method| self.signer.verify(*method, expires_at, &path, &signature))
        else {
            return Err(ClientError::Unauthorized(
                "temporary URL signature mismatch".to_string(),
            ));
        };

        Ok(TempUrlQuery {
            key,
            method,
            filename,
            inline,
        })
    }

    async fn store(
        &self,
        key: String,
        data: Bytes,
        content_type: String,
        expected_etag: Option<&str>,
        content_disposition: Option<String>,
    ) -> Result<Option<String>, ClientError> {
        let checksum = Checksum::compute(&data);
        if let Some(expected) = expected_etag
            && !checksum.matches_etag(expected)
        {
            return Err(ClientError::ChecksumMismatch);
        }

        let etag = checksum.to_hex();
        self.objects.write().await.insert(
            key,
            StoredObject {
                data,
                content_type,
                content_disposition,
                etag: etag.clone(),
            },
        );
        Ok(Some(etag))
    }
}

fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[async_trait]
impl ObjectClient for MemorySwiftClient {
    fn endpoint(&self) -> &ObjectEndpoint {
        &self.endpoint
    }

    async fn put_object(&self, request: PutObject) -> Result<Option<String>, ClientError> {
        let data = request.body.into_bytes().await?;
        self.store(
            request.key,
            data,
            request.content_type,
            request.etag.as_deref(),
            request.content_disposition,
        )
        .await
    }

    async fn get_object(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ObjectBody, ClientError> {
        let data = {
            let objects = self.objects.read().await;
            let object = objects.get(key).ok_or(ClientError::NotFound)?;
            match range {
                Some(range) => range.slice(&object.data),
                None => object.data.clone(),
            }
        };

        let chunks: Vec<Result<Bytes, ClientError>> = (0..data.len())
            .step_by(TRANSPORT_CHUNK)
            .map(|start| Ok(data.slice(start..(start + TRANSPORT_CHUNK).min(data.len()))))
            .collect();

        Ok(ObjectBody {
            stream: stream::iter(chunks).boxed(),
            range_applied: true,
        })
    }

    async fn head_object(&self, key: &str) -> Result<ObjectInfo, ClientError> {
        self.objects
            .read()
            .await
            .get(key)
            .map(StoredObject::info)
            .ok_or(ClientError::NotFound)
    }

    async fn delete_object(&self, key: &str) -> Result<(), ClientError> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or(ClientError::NotFound)
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, ClientError> {
        Ok(self
            .objects
            .read()
            .await
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn bulk_delete(&self, keys: &[String]) -> Result<BulkDeleteReport, ClientError> {
        let mut objects = self.objects.write().await;
        let mut report = BulkDeleteReport::default();
        for key in keys {
            if objects.remove(key).is_some() {
                report.deleted += 1;
            } else {
                report.not_found += 1;
            }
        }
        Ok(report)
    }

    async fn post_metadata(&self, key: &str, update: MetadataUpdate) -> Result<(), ClientError> {
        let mut objects = self.objects.write().await;
        let object = objects.get_mut(key).ok_or(ClientError::NotFound)?;
        object.content_type = update.content_type;
        object.content_disposition = update.content_disposition;
        Ok(())
    }
}
