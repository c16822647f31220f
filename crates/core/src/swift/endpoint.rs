//! Object URL construction for one Swift container.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use url::Url;

use super::error::ClientError;

/// Everything except RFC 3986 unreserved characters.
pub(crate) const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Object keys keep their `/` separators.
const KEY: &AsciiSet = &COMPONENT.remove(b'/');

/// Storage URL and container of one deployment.
#[derive(Debug, Clone)]
pub struct ObjectEndpoint {
    storage_url: Url,
    container: String,
    escaped_container: String,
}

impl ObjectEndpoint {
    /// Create an endpoint for `container` under the account `storage_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an absolute http(s) URL or the
    /// container name is empty.
    pub fn new(storage_url: &str, container: &str) -> Result<Self, ClientError> {
        if container.trim().is_empty() {
            return Err(ClientError::InvalidUrl("container name is empty".to_string()));
        }

        let url = Url::parse(storage_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{storage_url}: {e}")))?;
        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl(format!(
                "{storage_url}: expected an http(s) storage URL"
            )));
        }

        Ok(Self {
            storage_url: url,
            container: container.to_string(),
            escaped_container: utf8_percent_encode(container, COMPONENT).to_string(),
        })
    }

    /// Container name as configured.
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Account storage URL.
    #[must_use]
    pub fn storage_url(&self) -> &Url {
        &self.storage_url
    }

    fn base(&self) -> &str {
        self.storage_url.as_str().trim_end_matches('/')
    }

    /// `{storage_url}/{container}`
    #[must_use]
    pub fn container_url(&self) -> String {
        format!("{}/{}", self.base(), self.escaped_container)
    }

    /// `{storage_url}/{container}/{key}` with both components escaped.
    #[must_use]
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.container_url(), utf8_percent_encode(key, KEY))
    }

    /// Unescaped `/v1/{account}/{container}/{key}` path covered by temporary URL signatures.
    #[must_use]
    pub fn object_path(&self, key: &str) -> String {
        let account = percent_decode_str(self.storage_url.path().trim_end_matches('/'))
            .decode_utf8_lossy()
            .into_owned();
        format!("{account}/{}/{key}", self.container)
    }

    /// Account URL of the bulk delete middleware.
    #[must_use]
    pub fn bulk_delete_url(&self) -> String {
        format!("{}?bulk-delete", self.base())
    }

    /// One line of a bulk delete request body.
    #[must_use]
    pub fn bulk_delete_entry(&self, key: &str) -> String {
        format!(
            "/{}/{}",
            self.escaped_container,
            utf8_percent_encode(key, KEY)
        )
    }

    /// Recover the object key from a request path, if it addresses this container.
    #[must_use]
    pub fn key_from_path(&self, path: &str) -> Option<String> {
        let decoded = percent_decode_str(path).decode_utf8().ok()?;
        let prefix = self.object_path("");
        decoded
            .strip_prefix(prefix.as_str())
            .filter(|key| !key.is_empty())
            .map(ToString::to_string)
    }
}
