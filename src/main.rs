// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! fnOS Mock Server
//!
//! Stands in for an fnOS NAS during client development.
//! Provides:
//! - WebSocket endpoint speaking the fnOS request protocol
//! - Simulated RSA/AES login handshake
//! - Canned responses from a fixture directory
//! - HTTP info/health on the main port, Prometheus metrics on a second one

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use fnos_mock_server::config::{Cli, MockConfig};
use fnos_mock_server::fixtures::FixtureStore;
use fnos_mock_server::handler::ConnectionDeps;
use fnos_mock_server::http::{create_router, HttpState};
use fnos_mock_server::keys::KeyMaterial;
use fnos_mock_server::metrics::MockMetrics;
use fnos_mock_server::router::Router;
use fnos_mock_server::server::{self, ServerState, WEBSOCKET_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let mut config = MockConfig::from_env();
    Cli::parse().apply(&mut config);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_directive().parse()?),
        )
        .init();

    info!("Starting fnOS Mock Server v{}", env!("CARGO_PKG_VERSION"));

    let keys = KeyMaterial::load(&config.keys_dir).with_context(|| {
        format!("failed to load RSA keys from {}", config.keys_dir.display())
    })?;
    let keys = Arc::new(keys);

    if !config.fixtures_dir.is_dir() {
        warn!(
            "Fixture directory {} does not exist; fixture requests will fail",
            config.fixtures_dir.display()
        );
    }
    let fixtures = Arc::new(FixtureStore::from_dir(&config.fixtures_dir));

    let metrics = MockMetrics::new().context("failed to register metrics")?;
    let router = Arc::new(Router::new(keys, fixtures.clone(), metrics.clone()));

    info!("WebSocket: ws://{}{}", config.listen_addr, WEBSOCKET_PATH);
    info!("Health check (main port): {}", config.listen_addr);
    info!("Metrics endpoint: {}", config.metrics_addr);
    info!("Fixtures: {}", config.fixtures_dir.display());
    match config.idle_timeout() {
        Some(limit) => info!("Idle timeout: {}s", limit.as_secs()),
        None => info!("Idle timeout: disabled"),
    }

    // Start HTTP server for metrics
    let http_router = create_router(HttpState {
        metrics: metrics.clone(),
        fixtures,
    });
    let http_listener = TcpListener::bind(config.metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", config.metrics_addr))?;

    let metrics_addr = config.metrics_addr;
    tokio::spawn(async move {
        info!("HTTP server listening on {}", metrics_addr);
        if let Err(e) = axum::serve(http_listener, http_router).await {
            error!("Metrics server stopped: {}", e);
        }
    });

    // Start TCP listener for WebSocket
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind WebSocket listener on {}", config.listen_addr))?;

    info!("WebSocket server listening on {}", config.listen_addr);

    let state = ServerState::new(ConnectionDeps {
        router,
        metrics,
        max_message_size: config.max_message_size,
        idle_timeout: config.idle_timeout(),
    });

    tokio::select! {
        _ = server::serve(listener, state) => {}
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("Shutting down");
        }
    }

    Ok(())
}
