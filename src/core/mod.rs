//! Core functionality for the relay.
//!
//! This module contains fundamental components used throughout the
//! application:
//! - Configuration management
//! - Error handling
//! - Header rewriting policy
//! - Request-id logging context
//! - Relay cancellation

pub mod cancel;
pub mod config;
pub mod error;
pub mod headers;
pub mod logging;

// Re-export commonly used types
pub use cancel::RelayCancelHandle;
pub use config::{ProxyConfig, UpstreamKey};
pub use error::{ProxyError, Result};
pub use logging::{generate_request_id, get_request_id, REQUEST_ID};
