//! MD5 checksums in the two encodings the adapter deals with.
//!
//! Callers hand over base64 (`Digest::MD5.base64digest` style) while Swift
//! stores and verifies the hex form as the object's ETag.

use std::fmt;
use std::str::FromStr;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use md5::{Digest, Md5};

use super::error::StorageError;

/// A 16-byte MD5 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Checksum([u8; 16]);

impl Checksum {
    /// Digest of `data`.
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        let mut digest = [0u8; 16];
        digest.copy_from_slice(&Md5::digest(data));
        Self(digest)
    }

    /// Parse a base64 encoded digest.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not base64 or not 16 bytes long.
    pub fn from_base64(encoded: &str) -> Result<Self, StorageError> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| StorageError::invalid_checksum(format!("{encoded}: {e}")))?;
        Self::from_raw(encoded, &raw)
    }

    /// Parse a hex encoded digest, such as an ETag.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not hex or not 16 bytes long.
    pub fn from_hex(encoded: &str) -> Result<Self, StorageError> {
        let raw = hex::decode(encoded.trim().trim_matches('"'))
            .map_err(|e| StorageError::invalid_checksum(format!("{encoded}: {e}")))?;
        Self::from_raw(encoded, &raw)
    }

    fn from_raw(encoded: &str, raw: &[u8]) -> Result<Self, StorageError> {
        <[u8; 16]>::try_from(raw).map(Self).map_err(|_| {
            StorageError::invalid_checksum(format!(
                "{encoded}: expected 16 bytes, got {}",
                raw.len()
            ))
        })
    }

    /// Lowercase hex, the form Swift uses for ETags.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Standard base64.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// True if `etag` (hex, optionally quoted) is this digest.
    #[must_use]
    pub fn matches_etag(&self, etag: &str) -> bool {
        Self::from_hex(etag).is_ok_and(|other| other == *self)
    }
}

impl FromStr for Checksum {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base64(s)
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.to_hex())
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_to_hex() {
        let checksum = Checksum::from_base64("tYyS4lb/tRhMA002OWOQsg==").expect("valid");
        assert_eq!(checksum.to_hex(), "b58c92e256ffb5184c034d36396390b2");
    }

    #[test]
    fn test_compute() {
        let checksum = Checksum::compute(b"Some random string!");
        assert_eq!(checksum.to_base64(), "tYyS4lb/tRhMA002OWOQsg==");
        assert_eq!(Checksum::compute(b"").to_hex(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn test_matches_etag() {
        let checksum = Checksum::compute(b"Some random string!");
        assert!(checksum.matches_etag("b58c92e256ffb5184c034d36396390b2"));
        assert!(checksum.matches_etag("\"B58C92E256FFB5184C034D36396390B2\""));
        assert!(!checksum.matches_etag("d41d8cd98f00b204e9800998ecf8427e"));
        assert!(!checksum.matches_etag("garbage"));
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(matches!(
            Checksum::from_base64("not base64!"),
            Err(StorageError::InvalidChecksum(_))
        ));
        assert!(matches!(
            Checksum::from_base64("YWJj"),
            Err(StorageError::InvalidChecksum(_))
        ));
        assert!(Checksum::from_hex("abcd").is_err());
    }

    #[test]
    fn test_from_str_and_display() {
        let checksum: Checksum = "1B2M2Y8AsgTpgAmY7PhCfg==".parse().expect("valid");
        assert_eq!(checksum.to_string(), "1B2M2Y8AsgTpgAmY7PhCfg==");
        assert_eq!(
            format!("{checksum:?}"),
            "Checksum(d41d8cd98f00b204e9800998ecf8427e)"
        );
    }
}
