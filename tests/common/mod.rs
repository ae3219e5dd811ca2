// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Common test utilities for mock server integration tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use rand::rngs::OsRng;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use fnos_mock_server::crypto;
use fnos_mock_server::fixtures::FixtureStore;
use fnos_mock_server::handler::ConnectionDeps;
use fnos_mock_server::keys::KeyMaterial;
use fnos_mock_server::metrics::MockMetrics;
use fnos_mock_server::router::Router;
use fnos_mock_server::server::{self, ServerState};

pub type ClientStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Stand-in for the 44-character request signature clients prepend.
pub const FAKE_SIGNATURE: &str = "c2lnbmF0dXJlLW5vdC1jaGVja2VkLWJ5LXRoZS1tb2Nr";

/// Key pair shipped with the repository.
#[allow(dead_code)]
pub fn keys_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("keys")
}

/// Fixtures shipped with the repository.
#[allow(dead_code)]
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("responses")
}

/// Connection dependencies backed by the shipped keys and fixtures.
#[allow(dead_code)]
pub fn test_deps() -> (ConnectionDeps, MockMetrics) {
    test_deps_with(1_048_576, None)
}

#[allow(dead_code)]
pub fn test_deps_with(
    max_message_size: usize,
    idle_timeout: Option<Duration>,
) -> (ConnectionDeps, MockMetrics) {
    let keys = Arc::new(KeyMaterial::load(&keys_dir()).unwrap());
    let fixtures = Arc::new(FixtureStore::from_dir(fixtures_dir()));
    let metrics = MockMetrics::new().unwrap();
    let deps = ConnectionDeps {
        router: Arc::new(Router::new(keys, fixtures, metrics.clone())),
        metrics: metrics.clone(),
        max_message_size,
        idle_timeout,
    };
    (deps, metrics)
}

/// Starts the full accept loop on an ephemeral port. Returns `host:port`.
#[allow(dead_code)]
pub async fn start_server(deps: ConnectionDeps) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        server::serve(listener, ServerState::new(deps)).await;
    });

    format!("127.0.0.1:{}", addr.port())
}

/// Connects to the WebSocket endpoint of a server started with [`start_server`].
#[allow(dead_code)]
pub async fn connect(addr: &str) -> ClientStream {
    let url = format!("ws://{}/websocket", addr);
    let (ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    ws
}

/// Request text the way clients frame it: signature, then JSON.
#[allow(dead_code)]
pub fn signed(request: &Value) -> String {
    format!("{}{}", FAKE_SIGNATURE, request)
}

/// Sends a signed request and returns the next reply.
#[allow(dead_code)]
pub async fn send_recv(ws: &mut ClientStream, request: &Value) -> Value {
    ws.send(Message::Text(signed(request))).await.unwrap();
    recv(ws).await
}

/// Receives the next text message as JSON.
#[allow(dead_code)]
pub async fn recv(ws: &mut ClientStream) -> Value {
    let msg = timeout(Duration::from_secs(3), ws.next())
        .await
        .expect("Timeout waiting for message")
        .expect("Stream ended")
        .expect("WebSocket error");

    match msg {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("Expected Text message, got {:?}", other),
    }
}

/// Builds an `encrypted` login request the way the client does.
#[allow(dead_code)]
pub fn encrypted_login(public_key_pem: &str, aes_key: &[u8], iv: &[u8], reqid: &str) -> Value {
    let public_key = RsaPublicKey::from_public_key_pem(public_key_pem.trim()).unwrap();
    let wrapped = public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, aes_key)
        .unwrap();
    let login = json!({
        "req": "user.login",
        "reqid": reqid,
        "user": "testuser",
        "password": "testpass",
        "stay": true,
        "deviceType": "Browser",
    });
    let sealed = crypto::cbc_encrypt(aes_key, iv, login.to_string().as_bytes()).unwrap();
    json!({
        "req": "encrypted",
        "iv": STANDARD.encode(iv),
        "rsa": STANDARD.encode(wrapped),
        "aes": STANDARD.encode(sealed),
    })
}
