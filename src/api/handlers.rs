//! HTTP surface of the relay.
//!
//! There is exactly one handler and it is the router fallback: every path
//! and method is forwarded verbatim to the configured upstream. No routing
//! table, no method restriction, no inspection of the payload.

use crate::api::relay::relay_response;
use crate::core::headers::outbound_headers;
use crate::core::logging::{generate_request_id, get_request_id};
use crate::core::{ProxyConfig, ProxyError, Result};
use crate::with_request_id;
use axum::{
    extract::{Request, State},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state, read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub http_client: reqwest::Client,
    /// Admission gate for in-flight upstream calls, present only when a
    /// concurrency cap is configured. Permits are acquired in arrival order.
    upstream_gate: Option<Arc<Semaphore>>,
}

impl AppState {
    pub fn new(config: ProxyConfig, http_client: reqwest::Client) -> Self {
        let upstream_gate = config
            .max_concurrent_upstream
            .map(|permits| Arc::new(Semaphore::new(permits)));

        Self {
            config: Arc::new(config),
            http_client,
            upstream_gate,
        }
    }
}

/// Build the router: a single catch-all forwarding handler plus the
/// cross-cutting layers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(forward)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Forward one inbound request to the upstream and relay the response.
pub async fn forward(State(state): State<AppState>, request: Request) -> Response {
    let request_id = generate_request_id();
    with_request_id!(request_id, async move {
        match proxy_request(state, request).await {
            Ok(response) => response,
            Err(error) => error.into_response(),
        }
    })
}

async fn proxy_request(state: AppState, request: Request) -> Result<Response> {
    let (parts, body) = request.into_parts();

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/")
        .to_string();
    let url = format!("{}{}", state.config.upstream_base_url, path_and_query);

    tracing::debug!(
        request_id = %get_request_id(),
        method = %parts.method,
        path = %path_and_query,
        "Forwarding request"
    );

    // Chat payloads are bounded; buffering keeps the outbound content-length
    // identical to what the caller declared.
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| ProxyError::CallerDisconnected)?;

    // With a cap configured, requests queue here in arrival order; the
    // permit is released only once the previous response has fully relayed.
    let permit = match &state.upstream_gate {
        Some(gate) => Some(
            gate.clone()
                .acquire_owned()
                .await
                .map_err(|_| ProxyError::Internal("admission gate closed".to_string()))?,
        ),
        None => None,
    };

    let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
        .map_err(|_| ProxyError::Internal("unsupported request method".to_string()))?;
    let headers = outbound_headers(&parts.headers, state.config.upstream_api_key.expose());

    let mut outbound = state.http_client.request(method, &url).headers(headers);
    if !body.is_empty() {
        outbound = outbound.body(body);
    }

    // The connect timeout lives on the client; the wait for the response
    // head gets the same idle bound as every later chunk gap. Failing here
    // is the only place a proxy-level error status can still be produced,
    // since nothing has been relayed yet.
    let idle_timeout = state.config.idle_timeout;
    let response = match tokio::time::timeout(idle_timeout, outbound.send()).await {
        Ok(Ok(response)) => response,
        Ok(Err(error)) => {
            tracing::error!(
                request_id = %get_request_id(),
                error = %error,
                is_connect = error.is_connect(),
                is_timeout = error.is_timeout(),
                "Upstream request failed"
            );
            return Err(ProxyError::from_transport(&error));
        }
        Err(_) => {
            tracing::error!(
                request_id = %get_request_id(),
                idle_secs = idle_timeout.as_secs(),
                "Upstream sent no response head within the idle window"
            );
            return Err(ProxyError::UpstreamTimeout {
                idle_secs: idle_timeout.as_secs(),
            });
        }
    };

    // Non-2xx statuses are the provider's own error semantics, relayed
    // verbatim rather than rewrapped.
    if response.status().is_client_error() || response.status().is_server_error() {
        tracing::warn!(
            request_id = %get_request_id(),
            status = %response.status(),
            "Upstream returned an error status, relaying verbatim"
        );
    }

    Ok(relay_response(response, idle_timeout, permit, get_request_id()))
}
