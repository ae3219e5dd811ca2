// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! WebSocket Connection Handler
//!
//! Handles individual client connections: one reply per received message,
//! in order, until the client goes away.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, error, info, warn};

use crate::envelope::{self, EnvelopeError};
use crate::metrics::MockMetrics;
use crate::responses::{self, Response};
use crate::router::{Request, Router};

/// Characters of a message shown in debug logs.
pub const LOG_PREVIEW_CHARS: usize = 100;

/// Sent if a reply cannot be serialized.
const INTERNAL_ERROR_REPLY: &str = r#"{"result":"fail","errmsg":"Internal server error"}"#;

/// Shared dependencies for handling a WebSocket connection.
#[derive(Clone)]
pub struct ConnectionDeps {
    pub router: Arc<Router>,
    pub metrics: MockMetrics,
    /// Larger messages get a failure reply instead of being routed.
    pub max_message_size: usize,
    /// Silent connections are closed after this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
}

/// Decodes and routes one raw message.
pub fn respond(router: &Router, raw: &str) -> Response {
    match envelope::decode(raw) {
        Ok(doc) => router.route(&Request::from_value(doc)),
        Err(e) => {
            warn!("Failed to decode message: {}", preview(raw));
            responses::error(None, e.to_string())
        }
    }
}

/// First [`LOG_PREVIEW_CHARS`] characters of `text`.
pub fn preview(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((end, _)) => Cow::Owned(format!("{}...", &text[..end])),
        None => Cow::Borrowed(text),
    }
}

/// Handles a WebSocket connection.
pub async fn handle_connection(ws_stream: WebSocketStream<TcpStream>, deps: ConnectionDeps) {
    let ConnectionDeps {
        router,
        metrics,
        max_message_size,
        idle_timeout,
    } = deps;
    // Random label so log lines of one connection can be correlated.
    let session = &uuid::Uuid::new_v4().to_string()[..8];

    let (mut write, mut read) = ws_stream.split();
    info!("[{}] Client connected", session);

    loop {
        let next = match idle_timeout {
            Some(limit) => timeout(limit, read.next()).await,
            None => Ok(read.next().await),
        };
        let msg = match next {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                debug!("[{}] Disconnected", session);
                break;
            }
            Err(_) => {
                warn!("[{}] Idle timeout", session);
                break;
            }
        };

        let text = match msg {
            Ok(Message::Text(text)) => Ok(text),
            Ok(Message::Binary(data)) => String::from_utf8(data).map_err(|_| {
                warn!("[{}] Binary message is not valid UTF-8", session);
                responses::error(None, EnvelopeError::Unparsable.to_string())
            }),
            Ok(Message::Ping(data)) => {
                if write.send(Message::Pong(data)).await.is_err() {
                    break;
                }
                continue;
            }
            Ok(Message::Close(_)) => {
                debug!("[{}] Client sent close", session);
                break;
            }
            Ok(_) => {
                // Pong, raw frames
                continue;
            }
            Err(e) => {
                warn!("[{}] Connection error: {}", session, e);
                break;
            }
        };

        metrics.messages_received.inc();
        let timer = metrics.message_duration.start_timer();

        let response = match text {
            Err(rejected) => rejected,
            Ok(text) if text.len() > max_message_size => {
                warn!("[{}] Message too large: {} bytes", session, text.len());
                responses::error(None, format!("Message too large: {} bytes", text.len()))
            }
            Ok(text) => {
                debug!("[{}] Received: {}", session, preview(&text));
                respond(&router, &text)
            }
        };

        let reply = response.to_json().unwrap_or_else(|e| {
            error!("[{}] Failed to encode response: {}", session, e);
            INTERNAL_ERROR_REPLY.to_string()
        });
        timer.observe_duration();

        if response.is_failure() {
            metrics.failure_responses.inc();
        }
        debug!("[{}] Sent: {}", session, preview(&reply));

        if let Err(e) = write.send(Message::Text(reply)).await {
            warn!("[{}] Failed to send response: {}", session, e);
            break;
        }
        metrics.messages_sent.inc();
    }

    let _ = write.close().await;
    info!("[{}] Client disconnected", session);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{FixtureStore, MemorySource};
    use crate::keys::KeyMaterial;
    use serde_json::{json, Value};
    use std::path::Path;

    fn router() -> Router {
        let keys_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("keys");
        let keys = Arc::new(KeyMaterial::load(&keys_dir).unwrap());
        let fixtures = FixtureStore::new(
            MemorySource::new().with("user.info", r#"{"result":"succ","reqid":"0","data":{}}"#),
        );
        Router::new(keys, Arc::new(fixtures), MockMetrics::new().unwrap())
    }

    fn respond_value(router: &Router, raw: &str) -> Value {
        serde_json::to_value(respond(router, raw)).unwrap()
    }

    #[test]
    fn test_respond_signed_fixture_request() {
        let router = router();
        let raw = format!(
            "{}{}",
            "s".repeat(44),
            json!({"req": "user.info", "reqid": "abc"})
        );
        let value = respond_value(&router, &raw);
        assert_eq!(value["result"], "succ");
        assert_eq!(value["reqid"], "abc");
    }

    #[test]
    fn test_respond_unparsable_message() {
        let router = router();
        assert_eq!(
            respond_value(&router, "garbage"),
            json!({"result": "fail", "errmsg": "Invalid request format: cannot parse JSON"})
        );
    }

    #[test]
    fn test_respond_ping_with_short_prefix() {
        let router = router();
        assert_eq!(
            respond_value(&router, r#"abc{"req":"ping"}"#),
            json!({"res": "pong"})
        );
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(250);
        let shown = preview(&long);
        assert_eq!(shown.len(), LOG_PREVIEW_CHARS + 3);
        assert!(shown.ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn test_preview_multibyte() {
        let long = "é".repeat(150);
        assert_eq!(preview(&long).chars().count(), LOG_PREVIEW_CHARS + 3);
    }
}
