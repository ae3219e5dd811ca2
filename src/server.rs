// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Accept Loop and Peek Routing
//!
//! The main port serves both plain HTTP (`GET /`, `GET /health`) and the
//! WebSocket endpoint. The first bytes of each connection are peeked to
//! tell them apart before anything is consumed.

use std::time::{Duration, Instant};

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};

use crate::handler::{self, ConnectionDeps};

/// The only path accepting WebSocket upgrades.
pub const WEBSOCKET_PATH: &str = "/websocket";

/// Large enough to capture the Upgrade header of a typical handshake.
const PEEK_BUF_SIZE: usize = 512;

/// Clients must finish the WebSocket handshake within this time.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// State shared by every accepted connection.
#[derive(Clone)]
pub struct ServerState {
    pub deps: ConnectionDeps,
    pub start_time: Instant,
}

impl ServerState {
    pub fn new(deps: ConnectionDeps) -> Self {
        ServerState {
            deps,
            start_time: Instant::now(),
        }
    }
}

/// What the first bytes of a connection look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Peeked {
    /// HTTP request asking for a WebSocket upgrade.
    Upgrade { path: String },
    /// Plain HTTP GET.
    Get { path: String },
    /// Anything else. Left to the WebSocket handshake to reject.
    Other,
}

/// Classifies the start of a connection.
pub fn classify(head: &[u8]) -> Peeked {
    let text = String::from_utf8_lossy(head);
    // Header names are case-insensitive.
    let lower = text.to_ascii_lowercase();

    // Request line, e.g. "GET /websocket?x=1 HTTP/1.1"
    let path = text
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();

    let is_websocket_upgrade = lower.contains("upgrade: websocket")
        && lower.contains("connection:")
        && lower.contains("upgrade");

    if is_websocket_upgrade {
        Peeked::Upgrade { path }
    } else if lower.starts_with("get ") {
        Peeked::Get { path }
    } else {
        Peeked::Other
    }
}

/// True for the WebSocket endpoint, with or without a query string.
pub fn is_websocket_path(path: &str) -> bool {
    let route = path.split_once('?').map_or(path, |(route, _)| route);
    route == WEBSOCKET_PATH
}

/// Accepts connections forever, one task each.
pub async fn serve(listener: TcpListener, state: ServerState) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("Accepted connection from {}", addr);
                let state = state.clone();
                tokio::spawn(async move {
                    dispatch(stream, state).await;
                });
            }
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Routes one accepted connection by peeking at its first bytes.
pub async fn dispatch(stream: TcpStream, state: ServerState) {
    let mut peek_buf = [0u8; PEEK_BUF_SIZE];
    let peeked = match stream.peek(&mut peek_buf).await {
        Ok(n) if n > 0 => classify(&peek_buf[..n]),
        _ => return,
    };

    match peeked {
        Peeked::Upgrade { path } if !is_websocket_path(&path) => {
            warn!("Refusing WebSocket upgrade on {}", path);
            state.deps.metrics.connection_errors.inc();
            write_http(stream, "404 Not Found", &json!({"error": "Not found"})).await;
            return;
        }
        Peeked::Get { path } => {
            serve_http_get(stream, &path, &state).await;
            return;
        }
        // Falls through to the handshake, which rejects non-WebSocket traffic.
        Peeked::Upgrade { .. } | Peeked::Other => {}
    }

    let deps = state.deps;
    let metrics = deps.metrics.clone();

    // Slow clients that never finish the handshake are dropped.
    match timeout(HANDSHAKE_TIMEOUT, accept_async(stream)).await {
        Ok(Ok(ws_stream)) => {
            metrics.connections_total.inc();
            metrics.connections_active.inc();
            info!("New WebSocket connection");

            handler::handle_connection(ws_stream, deps).await;

            metrics.connections_active.dec();
            info!("WebSocket connection closed");
        }
        Ok(Err(e)) => {
            error!("WebSocket handshake failed: {}", e);
            metrics.connection_errors.inc();
        }
        Err(_) => {
            warn!("WebSocket handshake timeout");
            metrics.connection_errors.inc();
        }
    }
}

async fn serve_http_get(stream: TcpStream, path: &str, state: &ServerState) {
    let route = path.split_once('?').map_or(path, |(route, _)| route);
    match route {
        "/" => {
            let body = json!({
                "message": "fnOS Mock Server",
                "version": env!("CARGO_PKG_VERSION"),
            });
            write_http(stream, "200 OK", &body).await;
        }
        "/health" => {
            let body = json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "uptime_seconds": state.start_time.elapsed().as_secs(),
                "fixtures_cached": state.deps.router.fixtures().cached_count(),
            });
            write_http(stream, "200 OK", &body).await;
        }
        _ => {
            write_http(stream, "404 Not Found", &json!({"error": "Not found"})).await;
        }
    }
    debug!("Handled HTTP GET {}", path);
}

/// Writes a complete JSON response and closes the connection.
async fn write_http(mut stream: TcpStream, status: &str, body: &serde_json::Value) {
    // Consume the peeked request so closing does not reset the connection.
    let mut request = [0u8; PEEK_BUF_SIZE];
    let _ = stream.read(&mut request).await;

    let body = body.to_string();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}
