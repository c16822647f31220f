//! Byte ranges for partial reads.

use std::ops::{Range, RangeFrom, RangeInclusive};

use bytes::Bytes;

/// A half-open byte range `[start, end)`; `end == None` reads to the end.
///
/// Inclusive and exclusive forms covering the same bytes convert to the same
/// value, so `(19..=21).into()` equals `(19..22).into()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    start: u64,
    end: Option<u64>,
}

impl ByteRange {
    /// Create a range. An `end` before `start` yields an empty range.
    #[must_use]
    pub fn new(start: u64, end: Option<u64>) -> Self {
        Self {
            start,
            end: end.map(|end| end.max(start)),
        }
    }

    /// First byte.
    #[must_use]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// One past the last byte, if bounded.
    #[must_use]
    pub fn end(&self) -> Option<u64> {
        self.end
    }

    /// True if the range covers no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end == Some(self.start)
    }

    /// Number of bytes covered, if bounded.
    #[must_use]
    pub fn len(&self) -> Option<u64> {
        self.end.map(|end| end - self.start)
    }

    /// `Range` request header value, e.g. `bytes=19-21`.
    ///
    /// Empty ranges have no header form and return `None`.
    #[must_use]
    pub fn header_value(&self) -> Option<String> {
        match self.end {
            _ if self.is_empty() => None,
            Some(end) => Some(format!("bytes={}-{}", self.start, end - 1)),
            None => Some(format!("bytes={}-", self.start)),
        }
    }

    /// The part of `data` this range covers, clamped to its length.
    #[must_use]
    pub fn slice(&self, data: &Bytes) -> Bytes {
        let clamp = |offset: u64| usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let start = clamp(self.start);
        let end = self.end.map_or(data.len(), clamp);
        data.slice(start..end.max(start))
    }
}

impl From<Range<u64>> for ByteRange {
    fn from(range: Range<u64>) -> Self {
        Self::new(range.start, Some(range.end))
    }
}

impl From<RangeInclusive<u64>> for ByteRange {
    fn from(range: RangeInclusive<u64>) -> Self {
        let start = *range.start();
        if range.is_empty() {
            return Self::new(start, Some(start));
        }
        Self::new(start, range.end().checked_add(1))
    }
}

impl From<RangeFrom<u64>> for ByteRange {
    fn from(range: RangeFrom<u64>) -> Self {
        Self::new(range.start, None)
    }
}
