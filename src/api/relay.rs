//! Response relay from the upstream back to the caller.
//!
//! The upstream body is never parsed and never buffered whole: chunks are
//! forwarded in receipt order as they arrive, for streaming and unary
//! responses alike. "Unary" is a framing label, not a buffering strategy.

use crate::api::disconnect::DisconnectBody;
use crate::core::headers::response_headers;
use crate::core::RelayCancelHandle;
use axum::{body::Body, http::StatusCode, response::Response};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::OwnedSemaphorePermit;

type BoxedChunkStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// How the upstream declared its response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Incremental delivery: event-stream content type or unbounded framing
    Streaming,
    /// A single bounded body with a declared length
    Unary,
}

/// Detect the relay mode from declared response framing.
///
/// Deliberately never sniffs body content, so the proxy stays decoupled
/// from any particular provider's payload schema.
pub fn detect_relay_mode(headers: &reqwest::header::HeaderMap) -> RelayMode {
    let is_event_stream = headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("text/event-stream")
        })
        .unwrap_or(false);

    if is_event_stream || !headers.contains_key(reqwest::header::CONTENT_LENGTH) {
        RelayMode::Streaming
    } else {
        RelayMode::Unary
    }
}

/// Turn an upstream response into the response delivered to the caller.
///
/// Status and headers are relayed verbatim (minus transport framing), then
/// the body is pumped chunk-by-chunk. Each wait for the next chunk is
/// bounded by the idle timeout; expiry aborts the relay abruptly, since the
/// status line is already on the wire. The admission permit, when present,
/// travels inside the body stream so it is released only once the relay
/// finishes or the caller goes away.
pub fn relay_response(
    response: reqwest::Response,
    idle_timeout: Duration,
    permit: Option<OwnedSemaphorePermit>,
    request_id: String,
) -> Response {
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let headers = response_headers(response.headers());
    let mode = detect_relay_mode(response.headers());

    tracing::debug!(
        request_id = %request_id,
        status = %status,
        mode = ?mode,
        "Relaying upstream response"
    );

    let cancel_handle = RelayCancelHandle::new();
    let completion = cancel_handle.clone();
    let idle_secs = idle_timeout.as_secs();
    let mut upstream = Box::pin(response.bytes_stream());

    let relay = async_stream::stream! {
        let _permit = permit;
        loop {
            match tokio::time::timeout(idle_timeout, upstream.next()).await {
                Ok(Some(Ok(chunk))) => yield Ok::<Bytes, std::io::Error>(chunk),
                Ok(Some(Err(error))) => {
                    tracing::error!(
                        request_id = %request_id,
                        error = %error,
                        "Upstream body failed mid-relay"
                    );
                    yield Err(std::io::Error::other(error));
                    break;
                }
                Ok(None) => {
                    completion.mark_completed();
                    break;
                }
                Err(_) => {
                    tracing::error!(
                        request_id = %request_id,
                        idle_secs,
                        "No bytes from upstream within the idle window, aborting relay"
                    );
                    yield Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "upstream idle timeout",
                    ));
                    break;
                }
            }
        }
    };

    let body = Body::from_stream(DisconnectBody::new(
        Box::pin(relay) as BoxedChunkStream,
        cancel_handle,
    ));

    let mut relayed = Response::new(body);
    *relayed.status_mut() = status;
    *relayed.headers_mut() = headers;
    relayed
}
