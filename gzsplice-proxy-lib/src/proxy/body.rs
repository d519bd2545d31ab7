//! Streaming response-body transforms.
//!
//! Both adapters wrap the upstream data stream chunk for chunk: nothing is
//! buffered beyond the splicer's bounded trailer lookahead, and the upstream
//! body is only polled when the client side has capacity.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Frame, Incoming};
use pin_project_lite::pin_project;

use crate::error::ProxyError;
use crate::gzip::GzipSplicer;
use crate::inject::InjectionArtifact;
use crate::proxy::RespBody;

/// Relay the upstream body untouched.
pub(crate) fn passthrough_body(body: Incoming) -> RespBody {
    body.map_err(ProxyError::Upstream).boxed()
}

/// Stream the upstream body through the gzip splicer.
pub(crate) fn splice_body(body: Incoming, artifact: Arc<InjectionArtifact>) -> RespBody {
    let stream = SpliceStream::new(body.into_data_stream(), artifact);
    BodyExt::boxed(StreamBody::new(stream.map_ok(Frame::data)))
}

/// Emit the plain markup first, then the upstream body unchanged.
pub(crate) fn prepend_body(body: Incoming, prefix: Bytes) -> RespBody {
    let stream = PrependStream { inner: body.into_data_stream(), prefix: Some(prefix) };
    BodyExt::boxed(StreamBody::new(stream.map_ok(Frame::data)))
}

pin_project! {
    /// Feeds upstream chunks through a [`GzipSplicer`], emitting spliced
    /// output as it becomes available and the rebuilt trailer at the end.
    struct SpliceStream<S> {
        #[pin]
        inner: S,
        splicer: GzipSplicer,
        done: bool,
    }
}

impl<S> SpliceStream<S> {
    fn new(inner: S, artifact: Arc<InjectionArtifact>) -> Self {
        Self { inner, splicer: GzipSplicer::new(artifact), done: false }
    }
}

impl<S, E> Stream for SpliceStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    ProxyError: From<E>,
{
    type Item = Result<Bytes, ProxyError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if *this.done {
                return Poll::Ready(None);
            }
            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    let out = this.splicer.push(&chunk);
                    if out.is_empty() {
                        // Everything fed so far is still inside the trailer
                        // lookahead or a pending header field.
                        continue;
                    }
                    return Poll::Ready(Some(Ok(out)));
                }
                Poll::Ready(Some(Err(e))) => {
                    *this.done = true;
                    return Poll::Ready(Some(Err(ProxyError::from(e))));
                }
                Poll::Ready(None) => {
                    *this.done = true;
                    let tail = this.splicer.finish().map_err(ProxyError::Gzip);
                    return Poll::Ready(Some(tail));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

pin_project! {
    /// Emits the prefix once, then relays the inner stream untouched.
    struct PrependStream<S> {
        #[pin]
        inner: S,
        prefix: Option<Bytes>,
    }
}

impl<S, E> Stream for PrependStream<S>
where
    S: Stream<Item = Result<Bytes, E>>,
    ProxyError: From<E>,
{
    type Item = Result<Bytes, ProxyError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if let Some(prefix) = this.prefix.take() {
            return Poll::Ready(Some(Ok(prefix)));
        }
        this.inner
            .poll_next(cx)
            .map(|next| next.map(|res| res.map_err(ProxyError::from)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{stream, StreamExt};
    use std::io::Read;

    fn gzip(data: &[u8]) -> Vec<u8> {
        use std::io::Write;
        let mut enc =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn gunzip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        flate2::read::GzDecoder::new(data)
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    fn ok_chunks(input: &[u8], size: usize) -> Vec<Result<Bytes, std::io::Error>> {
        input
            .chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect()
    }

    #[tokio::test]
    async fn test_prepend_stream_puts_prefix_first() {
        let chunks = ok_chunks(b"<html>hello</html>", 5);
        let s = PrependStream {
            inner: stream::iter(chunks),
            prefix: Some(Bytes::from_static(b"<b>x</b>")),
        };
        let out: Vec<Bytes> = s.map(|r| r.unwrap()).collect().await;
        let flat: Vec<u8> = out.concat();
        assert_eq!(flat, b"<b>x</b><html>hello</html>");
    }

    #[tokio::test]
    async fn test_prepend_stream_with_empty_body() {
        let s = PrependStream {
            inner: stream::iter(Vec::<Result<Bytes, std::io::Error>>::new()),
            prefix: Some(Bytes::from_static(b"<b>x</b>")),
        };
        let out: Vec<Bytes> = s.map(|r| r.unwrap()).collect().await;
        assert_eq!(out.concat(), b"<b>x</b>");
    }

    #[tokio::test]
    async fn test_splice_stream_output_decompresses_to_markup_plus_original() {
        let artifact =
            Arc::new(InjectionArtifact::build(b"<b>hi</b>").unwrap_or_else(|e| panic!("{e}")));
        let member = gzip(b"<html></html>");

        for size in [1, 3, 1024] {
            let s = SpliceStream::new(stream::iter(ok_chunks(&member, size)), Arc::clone(&artifact));
            let out: Vec<Bytes> = s.map(|r| r.unwrap()).collect().await;
            let spliced: Vec<u8> = out.concat();
            assert_eq!(gunzip(&spliced), b"<b>hi</b><html></html>", "chunk size {size}");
        }
    }

    #[tokio::test]
    async fn test_splice_stream_propagates_upstream_error() {
        let artifact =
            Arc::new(InjectionArtifact::build(b"<b>hi</b>").unwrap_or_else(|e| panic!("{e}")));
        let member = gzip(b"<html></html>");
        let chunks: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::copy_from_slice(&member[..6])),
            Err(std::io::Error::other("upstream reset")),
        ];

        let s = SpliceStream::new(stream::iter(chunks), artifact);
        let out: Vec<Result<Bytes, ProxyError>> = s.collect().await;
        assert!(matches!(out.last(), Some(Err(ProxyError::Io(_)))));
    }

    #[tokio::test]
    async fn test_splice_stream_errors_on_truncated_member() {
        let artifact =
            Arc::new(InjectionArtifact::build(b"<b>hi</b>").unwrap_or_else(|e| panic!("{e}")));
        let member = gzip(b"<html></html>");
        // End the stream with only four bytes past the 10-byte header, too
        // few to ever hold a trailer. A longer cut is undetectable: the last
        // eight retained bytes parse as a trailer regardless of content.
        let chunks = ok_chunks(&member[..14], 7);

        let s = SpliceStream::new(stream::iter(chunks), artifact);
        let out: Vec<Result<Bytes, ProxyError>> = s.collect().await;
        assert!(matches!(out.last(), Some(Err(ProxyError::Gzip(_)))));
    }
}
