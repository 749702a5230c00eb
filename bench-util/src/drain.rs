use bytes::Buf;
use hyper::body::Body;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

pin_project! {
    /// Reads a body to completion, collecting every data frame.
    /// Trailer frames are skipped.
    pub struct DrainBodyFuture<B: Body> {
        #[pin]
        body: B,
        buf: Vec<u8>,
    }
}

impl<B> DrainBodyFuture<B>
where
    B: Body,
{
    #[inline]
    #[must_use]
    pub fn new_trusted_length(body: B, content_length: usize) -> Self {
        Self {
            body,
            buf: Vec::with_capacity(content_length),
        }
    }
}

impl<B> Future for DrainBodyFuture<B>
where
    B: Body,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    type Output = Result<Vec<u8>, anyhow::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slf = self.project();
        loop {
            if slf.body.is_end_stream() {
                return Poll::Ready(Ok(std::mem::take(slf.buf)));
            }
            let Some(next_res) = ready!(slf.body.as_mut().poll_frame(cx)) else {
                return Poll::Ready(Ok(std::mem::take(slf.buf)));
            };
            let next_frame = match next_res {
                Ok(frame) => frame,
                Err(e) => {
                    return Poll::Ready(Err(
                        anyhow::Error::new(e).context("Failed to poll next frame")
                    ));
                }
            };
            if let Ok(data) = next_frame.into_data() {
                slf.buf.extend_from_slice(data.chunk());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{byte_body, empty_body};

    #[tokio::test]
    async fn drains_full_body() {
        let bytes = DrainBodyFuture::new_trusted_length(byte_body("hello"), 5)
            .await
            .unwrap();
        assert_eq!(b"hello".as_slice(), bytes.as_slice());
    }

    #[tokio::test]
    async fn drains_empty_body() {
        let bytes = DrainBodyFuture::new_trusted_length(empty_body(), 0)
            .await
            .unwrap();
        assert!(bytes.is_empty());
    }
}
