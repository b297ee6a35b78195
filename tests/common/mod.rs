//! Shared helpers for integration tests.
//!
//! Includes a hand-rolled chunked-HTTP upstream for the scenarios wiremock
//! cannot express: per-chunk delays, mid-body stalls and observing the
//! proxy close its side of the connection.
#![allow(dead_code)]

use llm_relay::{build_router, AppState, ProxyConfig, UpstreamKey};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

pub const TEST_API_KEY: &str = "sk-relay-test-key";

pub fn test_config(upstream_url: &str) -> ProxyConfig {
    ProxyConfig {
        upstream_base_url: upstream_url.trim_end_matches('/').to_string(),
        upstream_api_key: UpstreamKey::new(TEST_API_KEY),
        listen_port: 0,
        max_concurrent_upstream: None,
        idle_timeout: Duration::from_secs(60),
        connect_timeout: Duration::from_secs(5),
    }
}

pub fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .build()
        .expect("Failed to build HTTP client")
}

pub fn test_app(config: ProxyConfig) -> axum::Router {
    build_router(AppState::new(config, test_client()))
}

/// Serve the app on an ephemeral local port and return its address.
pub async fn spawn_app(config: ProxyConfig) -> SocketAddr {
    let app = test_app(config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// What the hand-rolled upstream does after reading one request.
pub enum UpstreamScript {
    /// Send a chunked 200 event-stream head, then each chunk after its
    /// delay. With `finish` the body is terminated properly; otherwise the
    /// connection stalls silently after the last chunk.
    Chunks {
        chunks: Vec<(Duration, &'static str)>,
        finish: bool,
    },
    /// Accept the request and never send a response head.
    NoHead,
}

/// Spawn a single-connection upstream following `script`.
///
/// The returned [`Notify`] holds a permit once the upstream observes the
/// proxy closing the connection.
pub async fn spawn_scripted_upstream(script: UpstreamScript) -> (SocketAddr, Arc<Notify>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let closed = Arc::new(Notify::new());
    let observer = closed.clone();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        if !read_request(&mut socket).await {
            observer.notify_one();
            return;
        }

        match script {
            UpstreamScript::NoHead => {
                wait_for_close(&mut socket).await;
                observer.notify_one();
            }
            UpstreamScript::Chunks { chunks, finish } => {
                let head = "HTTP/1.1 200 OK\r\n\
                            content-type: text/event-stream\r\n\
                            transfer-encoding: chunked\r\n\r\n";
                if socket.write_all(head.as_bytes()).await.is_err() {
                    observer.notify_one();
                    return;
                }
                for (delay, data) in chunks {
                    tokio::time::sleep(delay).await;
                    let frame = format!("{:x}\r\n{}\r\n", data.len(), data);
                    if socket.write_all(frame.as_bytes()).await.is_err() {
                        observer.notify_one();
                        return;
                    }
                    let _ = socket.flush().await;
                }
                if finish {
                    let _ = socket.write_all(b"0\r\n\r\n").await;
                    let _ = socket.flush().await;
                } else {
                    wait_for_close(&mut socket).await;
                    observer.notify_one();
                }
            }
        }
    });

    (addr, closed)
}

/// Read one HTTP/1.1 request (head plus content-length body) off the socket.
async fn read_request(socket: &mut TcpStream) -> bool {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let header_end = loop {
        match socket.read(&mut tmp).await {
            Ok(0) | Err(_) => return false,
            Ok(n) => {
                buf.extend_from_slice(&tmp[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            }
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body_read = buf.len() - header_end;
    while body_read < content_length {
        match socket.read(&mut tmp).await {
            Ok(0) | Err(_) => return false,
            Ok(n) => body_read += n,
        }
    }
    true
}

/// Block until the peer closes the connection.
async fn wait_for_close(socket: &mut TcpStream) {
    let mut tmp = [0u8; 1024];
    loop {
        match socket.read(&mut tmp).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}
