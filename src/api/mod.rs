//! API layer for the relay.
//!
//! This module contains the forwarding handler, the response relay and the
//! disconnect detection wrapper.

pub mod disconnect;
pub mod handlers;
pub mod relay;

// Re-export commonly used types
pub use handlers::{build_router, forward, AppState};
pub use relay::{detect_relay_mode, relay_response, RelayMode};
