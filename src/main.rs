//! LLM Relay - Main entry point
//!
//! This binary loads configuration from the environment, builds the
//! forwarding router and runs the HTTP server.

use anyhow::{Context, Result};
use chrono::Local;
use llm_relay::{build_router, AppState, ProxyConfig};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Custom time formatter that uses local timezone (respects TZ environment variable)
struct LocalTime;

impl tracing_subscriber::fmt::time::FormatTime for LocalTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before reading any environment variables)
    dotenvy::dotenv().ok();

    init_tracing();

    let config = ProxyConfig::from_env()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));

    tracing::info!("Forwarding to upstream at {}", config.upstream_base_url);
    tracing::info!(
        "Idle timeout {}s, connect timeout {}s",
        config.idle_timeout.as_secs(),
        config.connect_timeout.as_secs()
    );
    if let Some(cap) = config.max_concurrent_upstream {
        tracing::info!("Upstream concurrency capped at {}", cap);
    }

    let http_client = create_http_client(&config);
    let app = build_router(AppState::new(config, http_client));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Resolve once a termination signal arrives (SIGINT, plus SIGTERM on unix).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = terminate.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Termination signal received, draining");
}

fn init_tracing() {
    // Check if NO_COLOR environment variable is set (for file logging without ANSI codes)
    let no_color = std::env::var("NO_COLOR").is_ok();

    // Default filter: info level for most crates, debug for llm_relay.
    //
    // IMPORTANT: We always append noise-suppression filters for hyper/h2/
    // reqwest because if RUST_LOG is set to just "info" or "trace", it would
    // override our defaults and allow noisy trace logs through.
    let base_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,llm_relay=debug".to_string());
    let filter_str = format!(
        "{},hyper=warn,hyper::proto=warn,h2=warn,reqwest=warn",
        base_filter
    );
    let filter = tracing_subscriber::EnvFilter::new(filter_str);

    if no_color {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_timer(LocalTime)
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_timer(LocalTime))
            .init();
    }
}

/// Create the shared HTTP client with connection pooling.
///
/// No overall request timeout: streaming completions may legitimately run
/// for minutes. Only the connect timeout lives here; the idle-read bound is
/// applied per chunk in the relay.
fn create_http_client(config: &ProxyConfig) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .pool_max_idle_per_host(100)
        .pool_idle_timeout(std::time::Duration::from_secs(90))
        .tcp_keepalive(std::time::Duration::from_secs(60))
        .build()
        .expect("Failed to build HTTP client")
}
