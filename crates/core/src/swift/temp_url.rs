//! Swift temporary URL signing.
//!
//! A temporary URL carries an HMAC-SHA1 signature over
//! `"{METHOD}\n{expires}\n{path}"`, keyed with the account's
//! `X-Account-Meta-Temp-URL-Key`. The store recomputes the same signature and
//! serves the request without a token until `expires` passes.

use std::fmt;

use hmac::{Hmac, Mac};
use percent_encoding::utf8_percent_encode;
use sha1::Sha1;

use super::endpoint::{COMPONENT, ObjectEndpoint};
use super::error::ClientError;

type HmacSha1 = Hmac<Sha1>;

/// HTTP method a temporary URL is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempUrlMethod {
    /// Download.
    Get,
    /// Metadata only.
    Head,
    /// Direct upload.
    Put,
}

impl TempUrlMethod {
    /// Method name as it appears in the signed string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Put => "PUT",
        }
    }
}

/// Response overrides carried in the query string of a GET temporary URL.
#[derive(Debug, Clone, Default)]
pub struct TempUrlParams<'a> {
    /// Filename the store puts in `Content-Disposition`.
    pub filename: Option<&'a str>,
    /// Ask for `Content-Disposition: inline` instead of `attachment`.
    pub inline: bool,
}

/// Signs temporary URLs with the account temp-URL key.
#[derive(Clone)]
pub struct TempUrlSigner {
    mac: HmacSha1,
}

impl fmt::Debug for TempUrlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TempUrlSigner").finish_non_exhaustive()
    }
}

impl TempUrlSigner {
    /// Create a signer for `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is empty.
    pub fn new(key: &str) -> Result<Self, ClientError> {
        if key.is_empty() {
            return Err(ClientError::Configuration(
                "temp URL key is empty".to_string(),
            ));
        }
        let mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
        Ok(Self { mac })
    }

    fn keyed(&self, method: TempUrlMethod, expires_at: i64, path: &str) -> HmacSha1 {
        let mut mac = self.mac.clone();
        mac.update(format!("{}\n{expires_at}\n{path}", method.as_str()).as_bytes());
        mac
    }

    /// Hex HMAC-SHA1 signature for `method` on `path` until `expires_at`.
    #[must_use]
    pub fn signature(&self, method: TempUrlMethod, expires_at: i64, path: &str) -> String {
        hex::encode(self.keyed(method, expires_at, path).finalize().into_bytes())
    }

    /// Constant-time check of a signature produced by [`Self::signature`].
    #[must_use]
    pub fn verify(
        &self,
        method: TempUrlMethod,
        expires_at: i64,
        path: &str,
        signature: &str,
    ) -> bool {
        let Ok(raw) = hex::decode(signature) else {
            return false;
        };
        self.keyed(method, expires_at, path).verify_slice(&raw).is_ok()
    }

    /// Build a temporary URL for `key` in `endpoint`'s container.
    #[must_use]
    pub fn temp_url(
        &self,
        endpoint: &ObjectEndpoint,
        method: TempUrlMethod,
        key: &str,
        expires_at: i64,
        params: &TempUrlParams<'_>,
    ) -> String {
        let signature = self.signature(method, expires_at, &endpoint.object_path(key));
        let mut url = format!(
            "{}?temp_url_sig={signature}&temp_url_expires={expires_at}",
            endpoint.object_url(key)
        );
        if let Some(filename) = params.filename {
            url.push_str("&filename=");
            url.push_str(&utf8_percent_encode(filename, COMPONENT).to_string());
        }
        if params.inline {
            url.push_str("&inline");
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "/v1/AUTH_test/attachments/avatar.png";

    fn endpoint() -> ObjectEndpoint {
        ObjectEndpoint::new("https://swift.example.com/v1/AUTH_test", "attachments")
            .expect("valid endpoint")
    }

    #[test]
    fn test_signature_known_vectors() {
        let signer = TempUrlSigner::new("secret").expect("signer");
        assert_eq!(
            signer.signature(TempUrlMethod::Get, 1_700_000_000, PATH),
            "a7551fa3e84fbab6963ea8d2bccfd045ae2fc023"
        );
        assert_eq!(
            signer.signature(TempUrlMethod::Put, 1_700_000_000, PATH),
            "d660c5e9947d81e8ca7bc723c3ddb5f59e4f3439"
        );
    }

    #[test]
    fn test_signature_covers_unescaped_path() {
        let signer = TempUrlSigner::new("secret").expect("signer");
        let url = signer.temp_url(
            &endpoint(),
            TempUrlMethod::Get,
            "my dir/avatar.png",
            1_700_000_000,
            &TempUrlParams::default(),
        );
        assert_eq!(
            url,
            "https://swift.example.com/v1/AUTH_test/attachments/my%20dir/avatar.png\
             ?temp_url_sig=b582086d963fcc94363a1b21d693d5cc6e3d0204&temp_url_expires=1700000000"
        );
    }

    #[test]
    fn test_temp_url_with_filename_and_inline() {
        let signer = TempUrlSigner::new("secret").expect("signer");
        let url = signer.temp_url(
            &endpoint(),
            TempUrlMethod::Get,
            "avatar.png",
            1_700_000_000,
            &TempUrlParams {
                filename: Some("my avatar.png"),
                inline: true,
            },
        );
        assert!(url.starts_with(
            "https://swift.example.com/v1/AUTH_test/attachments/avatar.png?temp_url_sig=a7551fa3"
        ));
        assert!(url.ends_with("&temp_url_expires=1700000000&filename=my%20avatar.png&inline"));
    }

    #[test]
    fn test_verify() {
        let signer = TempUrlSigner::new("secret").expect("signer");
        let sig = signer.signature(TempUrlMethod::Put, 42, PATH);

        assert!(signer.verify(TempUrlMethod::Put, 42, PATH, &sig));
        assert!(!signer.verify(TempUrlMethod::Get, 42, PATH, &sig));
        assert!(!signer.verify(TempUrlMethod::Put, 43, PATH, &sig));
        assert!(!signer.verify(TempUrlMethod::Put, 42, "/v1/AUTH_test/attachments/x", &sig));
        assert!(!signer.verify(TempUrlMethod::Put, 42, PATH, "not-hex"));

        let other = TempUrlSigner::new("other").expect("signer");
        assert!(!other.verify(TempUrlMethod::Put, 42, PATH, &sig));
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(TempUrlSigner::new("").is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let signer = TempUrlSigner::new("secret").expect("signer");
        assert!(!format!("{signer:?}").contains("secret"));
    }
}
