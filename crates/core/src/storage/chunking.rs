//! Fixed-size re-chunking of download streams.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};

/// Regroup `inner` into chunks of exactly `chunk_size` bytes, except the last.
///
/// The stream ends after the first error.
pub(crate) fn rechunk<S, E>(inner: S, chunk_size: usize) -> BoxStream<'static, Result<Bytes, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Send + 'static,
{
    let chunk_size = chunk_size.max(1);
    let state = (inner, BytesMut::new(), false);

    stream::unfold(state, move |(mut inner, mut buf, mut done)| async move {
        loop {
            if buf.len() >= chunk_size {
                let chunk = buf.split_to(chunk_size).freeze();
                return Some((Ok(chunk), (inner, buf, done)));
            }
            if done {
                if buf.is_empty() {
                    return None;
                }
                let chunk = buf.split().freeze();
                return Some((Ok(chunk), (inner, buf, done)));
            }
            match inner.next().await {
                Some(Ok(bytes)) => buf.extend_from_slice(&bytes),
                Some(Err(err)) => {
                    buf.clear();
                    return Some((Err(err), (inner, buf, true)));
                }
                None => done = true,
            }
        }
    })
    .boxed()
}
