//! Header rewriting policy for both legs of the relay.
//!
//! Pure functions over header maps so credential injection and hop-by-hop
//! stripping can be tested without a live socket. The inbound side uses
//! axum's header types and the outbound side reqwest's; names are bridged
//! by string since the two link different `http` major versions.

use axum::http::HeaderMap;
use reqwest::header::{
    HeaderMap as UpstreamHeaderMap, HeaderName as UpstreamHeaderName,
    HeaderValue as UpstreamHeaderValue, AUTHORIZATION,
};

/// Headers owned by a single transport hop (RFC 7230 §6.1). These never
/// cross the proxy in either direction.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Check if an inbound request header should be forwarded upstream.
///
/// Besides hop-by-hop headers this drops `host` (derived from the upstream
/// URL), `content-length` (recomputed from the forwarded body, which passes
/// through byte-identical) and `authorization` (always replaced with the
/// configured credential, never merged).
pub fn should_forward_request_header(name: &str) -> bool {
    !is_hop_by_hop(name)
        && !name.eq_ignore_ascii_case("host")
        && !name.eq_ignore_ascii_case("content-length")
        && !name.eq_ignore_ascii_case("authorization")
}

/// Build the outbound header set from the inbound one.
///
/// Duplicate header values are preserved in order. Whatever credential the
/// caller sent (or none at all) is discarded and the configured key takes
/// its place.
pub fn outbound_headers(inbound: &HeaderMap, api_key: &str) -> UpstreamHeaderMap {
    let mut outbound = UpstreamHeaderMap::with_capacity(inbound.len() + 1);

    for (name, value) in inbound {
        if !should_forward_request_header(name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            UpstreamHeaderName::from_bytes(name.as_str().as_bytes()),
            UpstreamHeaderValue::from_bytes(value.as_bytes()),
        ) {
            outbound.append(name, value);
        }
    }

    // Config validation guarantees the key is a representable header value.
    if let Ok(mut credential) = UpstreamHeaderValue::from_str(&format!("Bearer {}", api_key)) {
        credential.set_sensitive(true);
        outbound.insert(AUTHORIZATION, credential);
    }

    outbound
}

/// Copy upstream response headers onto the relayed response.
///
/// Transport framing belongs to the local stack, so hop-by-hop headers are
/// dropped. `content-length` is kept when the upstream declared one: the
/// body is relayed unmodified, so the length still holds and framing stays
/// identity instead of being rewritten to chunked.
pub fn response_headers(upstream: &UpstreamHeaderMap) -> HeaderMap {
    let mut relayed = HeaderMap::with_capacity(upstream.len());

    for (name, value) in upstream {
        if is_hop_by_hop(name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            axum::http::HeaderName::from_bytes(name.as_str().as_bytes()),
            axum::http::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            relayed.append(name, value);
        }
    }

    relayed
}
