use crate::core::RelayCancelHandle;
use bytes::Bytes;
use futures::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A body stream wrapper that triggers the cancellation handle when dropped.
/// This is how a caller disconnect mid-relay is detected: axum drops the
/// response body, which drops this wrapper and with it the inner upstream
/// stream, closing the upstream connection.
pub struct DisconnectBody<S> {
    stream: S,
    cancel_handle: RelayCancelHandle,
}

impl<S> DisconnectBody<S> {
    pub fn new(stream: S, cancel_handle: RelayCancelHandle) -> Self {
        Self {
            stream,
            cancel_handle,
        }
    }
}

impl<S, E> Stream for DisconnectBody<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }
}

impl<S> Drop for DisconnectBody<S> {
    fn drop(&mut self) {
        // Dropped either on normal end-of-body or because the caller went
        // away; the completed flag tells the two apart.
        if !self.cancel_handle.is_completed() {
            tracing::debug!("Caller disconnected before end-of-body, upstream call dropped");
        }
        self.cancel_handle.cancel();
    }
}
