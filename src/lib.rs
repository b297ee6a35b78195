//! LLM Relay - a reverse proxy for a single chat-completion upstream
//!
//! This library implements a credential-injecting forwarder for LLM APIs:
//!
//! - **Opaque passthrough**: any path, any method, bodies forwarded
//!   byte-for-byte with no schema validation
//! - **Credential injection**: the caller's `Authorization` header is always
//!   replaced with the configured upstream key
//! - **Streaming support**: incremental relay of Server-Sent Events and any
//!   other unbounded response body, in receipt order
//! - **Failure translation**: upstream connect failures and idle timeouts
//!   become structured 502/504 responses; upstream error statuses pass
//!   through untouched
//! - **Bounded concurrency**: an optional admission gate caps in-flight
//!   upstream calls (cap 1 reproduces strict sequential forwarding)
//!
//! # Architecture
//!
//! - [`core`]: configuration, errors, header policy, logging context,
//!   cancellation
//! - [`api`]: the forwarding handler and response relay
//!
//! # Configuration
//!
//! Required environment variables:
//! - `API_ENDPOINT`: base URL of the upstream provider
//! - `API_KEY`: credential substituted into every outbound request
//! - `PORT`: local listen port
//!
//! Optional environment variables:
//! - `MAX_CONCURRENT_UPSTREAM`: cap on in-flight upstream calls
//! - `IDLE_TIMEOUT_SECONDS`: idle-read timeout (default: 60)
//! - `CONNECT_TIMEOUT_SECONDS`: connect timeout (default: 10)

pub mod api;
pub mod core;

// Re-export commonly used types for convenience
pub use api::{build_router, AppState};
pub use core::{ProxyConfig, ProxyError, Result, UpstreamKey};
