//! `Content-Disposition` values.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use super::error::StorageError;

/// RFC 5987 `attr-char` set.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// How a browser should present a downloaded blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    /// Display in place.
    #[default]
    Inline,
    /// Save as a file.
    Attachment,
}

impl Disposition {
    /// Header token.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Disposition {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "attachment" => Ok(Self::Attachment),
            other => Err(StorageError::configuration(format!(
                "unknown disposition '{other}'"
            ))),
        }
    }
}

/// A disposition paired with the filename presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Inline or attachment.
    pub disposition: Disposition,
    /// Filename shown to the user.
    pub filename: String,
}

impl ContentDisposition {
    /// Create a disposition.
    #[must_use]
    pub fn new(disposition: Disposition, filename: impl Into<String>) -> Self {
        Self {
            disposition,
            filename: filename.into(),
        }
    }

    /// `inline` with `filename`.
    #[must_use]
    pub fn inline(filename: impl Into<String>) -> Self {
        Self::new(Disposition::Inline, filename)
    }

    /// `attachment` with `filename`.
    #[must_use]
    pub fn attachment(filename: impl Into<String>) -> Self {
        Self::new(Disposition::Attachment, filename)
    }

    /// Header value with an ASCII `filename` and an RFC 5987 `filename*`.
    #[must_use]
    pub fn header_value(&self) -> String {
        format!(
            "{}; filename=\"{}\"; filename*=UTF-8''{}",
            self.disposition,
            ascii_fallback(&self.filename),
            utf8_percent_encode(&self.filename, ATTR_CHAR)
        )
    }
}

fn ascii_fallback(filename: &str) -> String {
    let mut out = String::with_capacity(filename.len());
    for c in filename.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}
