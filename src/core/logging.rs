//! Logging utilities with request-id context support.
//!
//! Every inbound request gets a UUID held in task-local storage so log
//! lines across the handling task can be correlated without threading the
//! id through every call.

tokio::task_local! {
    /// Task-local storage for the current request ID.
    pub static REQUEST_ID: String;
}

/// Get the current request ID from context, if set.
///
/// Returns an empty string if no request ID is set.
pub fn get_request_id() -> String {
    REQUEST_ID.try_with(|id| id.clone()).unwrap_or_default()
}

/// Generate a new unique request ID using UUID v4.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Execute an async block with a request-id context.
#[macro_export]
macro_rules! with_request_id {
    ($request_id:expr, $body:expr) => {
        $crate::core::logging::REQUEST_ID.scope($request_id, $body).await
    };
}
