//! Swift client over HTTP using reqwest.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use reqwest::header::{
    ACCEPT, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, ETAG, HeaderMap, RANGE,
};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use swiftblob_shared::ConnectionSettings;
use tracing::debug;

use super::client::{
    BulkDeleteReport, MetadataUpdate, ObjectBody, ObjectClient, ObjectInfo, PutObject,
};
use super::endpoint::ObjectEndpoint;
use super::error::ClientError;
use crate::storage::ByteRange;
use crate::storage::Body;

const AUTH_TOKEN: &str = "X-Auth-Token";

/// Swift caps listings at 10000 entries per page.
const LIST_PAGE: usize = 10_000;

/// Keys per bulk delete request.
const BULK_DELETE_BATCH: usize = 1_000;

/// Longest error body kept in [`ClientError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Swift client authenticated with a pre-issued token.
#[derive(Clone)]
pub struct HttpSwiftClient {
    http: reqwest::Client,
    endpoint: ObjectEndpoint,
    token: String,
}

impl fmt::Debug for HttpSwiftClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSwiftClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct BulkDeleteResponse {
    #[serde(rename = "Number Deleted", default)]
    deleted: usize,
    #[serde(rename = "Number Not Found", default)]
    not_found: usize,
    #[serde(rename = "Response Status", default)]
    status: String,
    #[serde(rename = "Response Body", default)]
    body: String,
    #[serde(rename = "Errors", default)]
    errors: Vec<(String, String)>,
}

impl BulkDeleteResponse {
    fn into_report(self) -> Result<BulkDeleteReport, ClientError> {
        let code = self
            .status
            .split_whitespace()
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .unwrap_or(200);

        if !(200..300).contains(&code) && self.errors.is_empty() {
            return Err(ClientError::Status {
                status: code,
                message: if self.body.is_empty() {
                    self.status
                } else {
                    self.body
                },
            });
        }

        Ok(BulkDeleteReport {
            deleted: self.deleted,
            not_found: self.not_found,
            errors: self.errors,
        })
    }
}

impl HttpSwiftClient {
    /// Create a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the HTTP client cannot be built.
    pub fn new(
        endpoint: ObjectEndpoint,
        token: impl Into<String>,
        settings: &ConnectionSettings,
    ) -> Result<Self, ClientError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ClientError::Configuration("auth token is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("swiftblob/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .danger_accept_invalid_certs(!settings.ssl_verify_peer)
            .build()?;

        Ok(Self {
            http,
            endpoint,
            token,
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTH_TOKEN, &self.token)
    }
}

/// Pass successful responses through, map the rest to [`ClientError`].
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut message = response.text().await.unwrap_or_default();
    if message.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    Err(ClientError::from_status(status, message))
}

fn header_str(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}

fn etag(headers: &HeaderMap) -> Option<String> {
    header_str(headers, ETAG).map(|value| value.trim_matches('"').to_string())
}

fn object_info(headers: &HeaderMap) -> Result<ObjectInfo, ClientError> {
    let content_length = header_str(headers, CONTENT_LENGTH)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| ClientError::invalid_response(format!("bad Content-Length {value}")))
        })
        .transpose()?
        .unwrap_or(0);

    Ok(ObjectInfo {
        content_length,
        content_type: header_str(headers, CONTENT_TYPE),
        etag: etag(headers),
        content_disposition: header_str(headers, CONTENT_DISPOSITION),
    })
}

#[async_trait]
impl ObjectClient for HttpSwiftClient {
    fn endpoint(&self) -> &ObjectEndpoint {
        &self.endpoint
    }

    async fn put_object(&self, request: PutObject) -> Result<Option<String>, ClientError> {
        let PutObject {
            key,
            body,
            content_type,
            etag: expected,
            content_disposition,
        } = request;

        let mut builder = self
            .request(Method::PUT, &self.endpoint.object_url(&key))
            .header(CONTENT_TYPE, content_type);
        if let Some(expected) = expected {
            builder = builder.header(ETAG, expected);
        }
        if let Some(content_disposition) = content_disposition {
            builder = builder.header(CONTENT_DISPOSITION, content_disposition);
        }
        let builder = match body.into_body() {
            Body::Bytes(bytes) => builder.body(bytes),
            Body::Stream(stream) => builder.body(reqwest::Body::wrap_stream(stream)),
        };

        let response = check(builder.send().await?).await?;
        Ok(etag(response.headers()))
    }

    async fn get_object(
        &self,
        key: &str,
        range: Option<ByteRange>,
    ) -> Result<ObjectBody, ClientError> {
        let mut builder = self.request(Method::GET, &self.endpoint.object_url(key));
        if let Some(value) = range.and_then(|range| range.header_value()) {
            builder = builder.header(RANGE, value);
        }

        let response = builder.send().await?;
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            debug!(key = %key, "requested range starts past the end of the object");
            return Ok(ObjectBody {
                stream: stream::empty().boxed(),
                range_applied: true,
            });
        }

        let response = check(response).await?;
        let range_applied = range.is_none() || response.status() == StatusCode::PARTIAL_CONTENT;
        Ok(ObjectBody {
            stream: response.bytes_stream().map_err(ClientError::from).boxed(),
            range_applied,
        })
    }

    async fn head_object(&self, key: &str) -> Result<ObjectInfo, ClientError> {
        let response = self
            .request(Method::HEAD, &self.endpoint.object_url(key))
            .send()
            .await?;
        object_info(check(response).await?.headers())
    }

    async fn delete_object(&self, key: &str) -> Result<(), ClientError> {
        let response = self
            .request(Method::DELETE, &self.endpoint.object_url(key))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, ClientError> {
        let url = self.endpoint.container_url();
        let mut keys = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut query = vec![
                ("format", "json".to_string()),
                ("prefix", prefix.to_string()),
                ("limit", LIST_PAGE.to_string()),
            ];
            if let Some(marker) = &marker {
                query.push(("marker", marker.clone()));
            }

            let response = check(self.request(Method::GET, &url).query(&query).send().await?).await?;
            if response.status() == StatusCode::NO_CONTENT {
                break;
            }

            let page: Vec<ListEntry> = response.json().await?;
            let Some(last) = page.last() else {
                break;
            };
            marker = Some(last.name.clone());
            keys.extend(page.into_iter().map(|entry| entry.name));
        }

        Ok(keys)
    }

    async fn bulk_delete(&self, keys: &[String]) -> Result<BulkDeleteReport, ClientError> {
        let mut report = BulkDeleteReport::default();

        for batch in keys.chunks(BULK_DELETE_BATCH) {
            let body = batch
                .iter()
                .map(|key| self.endpoint.bulk_delete_entry(key))
                .collect::<Vec<_>>()
                .join("\n");

            let response = self
                .request(Method::POST, &self.endpoint.bulk_delete_url())
                .header(CONTENT_TYPE, "text/plain")
                .header(ACCEPT, "application/json")
                .body(body)
                .send()
                .await?;
            let parsed: BulkDeleteResponse = check(response).await?.json().await?;
            report.merge(parsed.into_report()?);
        }

        Ok(report)
    }

    async fn post_metadata(&self, key: &str, update: MetadataUpdate) -> Result<(), ClientError> {
        let mut builder = self
            .request(Method::POST, &self.endpoint.object_url(key))
            .header(CONTENT_TYPE, update.content_type);
        if let Some(content_disposition) = update.content_disposition {
            builder = builder.header(CONTENT_DISPOSITION, content_disposition);
        }

        check(builder.send().await?).await?;
        Ok(())
    }
}
