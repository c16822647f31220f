//! Upload bodies.

use std::fmt;
use std::io;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// Stream of upload chunks.
pub type PayloadStream = BoxStream<'static, io::Result<Bytes>>;

pub(crate) enum Body {
    Bytes(Bytes),
    Stream(PayloadStream),
}

/// The body of an upload plus what the caller declared about it.
pub struct Payload {
    body: Body,
    filename: Option<String>,
    content_type: Option<String>,
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            Body::Bytes(bytes) => format!("{} bytes", bytes.len()),
            Body::Stream(_) => "stream".to_string(),
        };
        f.debug_struct("Payload")
            .field("body", &body)
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl Payload {
    /// Payload held in memory.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::with_body(Body::Bytes(data.into()))
    }

    /// Payload read from any async reader until EOF.
    #[must_use]
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self::from_stream(ReaderStream::new(reader).boxed())
    }

    /// Payload from a chunk stream.
    #[must_use]
    pub fn from_stream(stream: PayloadStream) -> Self {
        Self::with_body(Body::Stream(stream))
    }

    fn with_body(body: Body) -> Self {
        Self {
            body,
            filename: None,
            content_type: None,
        }
    }

    /// Declare the name the payload was received under.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Declare the payload's content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Declared filename.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Declared content type.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Up to `limit` leading bytes of the body, leaving the body intact.
    ///
    /// Stream bodies are read until `limit` bytes are buffered or the stream
    /// ends; the buffered chunks are replayed ahead of the rest.
    pub(crate) async fn head(&mut self, limit: usize) -> io::Result<Bytes> {
        let stream = match &mut self.body {
            Body::Bytes(bytes) => return Ok(bytes.slice(..limit.min(bytes.len()))),
            Body::Stream(stream) => stream,
        };

        let mut buffered: Vec<io::Result<Bytes>> = Vec::new();
        let mut head = BytesMut::new();
        while head.len() < limit {
            let Some(chunk) = stream.next().await.transpose()? else {
                break;
            };
            head.extend_from_slice(&chunk[..chunk.len().min(limit - head.len())]);
            buffered.push(Ok(chunk));
        }

        let rest = std::mem::replace(stream, stream::empty().boxed());
        *stream = stream::iter(buffered).chain(rest).boxed();
        Ok(head.freeze())
    }

    pub(crate) fn into_body(self) -> Body {
        self.body
    }

    /// Read the whole body into memory.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self.body {
            Body::Bytes(bytes) => Ok(bytes),
            Body::Stream(stream) => {
                let buf = stream
                    .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                        buf.extend_from_slice(&chunk);
                        Ok(buf)
                    })
                    .await?;
                Ok(buf.freeze())
            }
        }
    }
}
