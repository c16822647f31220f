//! Content type detection for uploads without an explicit type.

/// Fallback when nothing better is known.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Leading bytes of an upload handed to [`MimeSniffer::guess`].
pub const SNIFF_LEN: usize = 512;

/// Guesses a content type for an upload that has no explicit one.
#[cfg_attr(test, mockall::automock)]
pub trait MimeSniffer: Send + Sync {
    /// Best guess from the first bytes of the body (at most [`SNIFF_LEN`]),
    /// the name it was received under and the type the caller declared.
    fn guess<'a, 'b>(
        &self,
        head: &[u8],
        filename: Option<&'a str>,
        declared: Option<&'b str>,
    ) -> Option<String>;
}

/// Trusts a declared type, otherwise guesses from the filename extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionSniffer;

impl MimeSniffer for ExtensionSniffer {
    fn guess(
        &self,
        _head: &[u8],
        filename: Option<&str>,
        declared: Option<&str>,
    ) -> Option<String> {
        declared.map(ToString::to_string).or_else(|| {
            filename
                .and_then(|name| mime_guess::from_path(name).first_raw())
                .map(ToString::to_string)
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Explicit type, else whatever the sniffer makes of the upload.
pub(crate) fn resolve_content_type(
    sniffer: &dyn MimeSniffer,
    explicit: Option<&str>,
    head: &[u8],
    filename: Option<&str>,
    declared: Option<&str>,
) -> String {
    if let Some(explicit) = non_blank(explicit) {
        return explicit.to_string();
    }

    sniffer
        .guess(head, non_blank(filename), non_blank(declared))
        .filter(|guess| !guess.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}
