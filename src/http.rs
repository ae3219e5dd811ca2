// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HTTP Server for Metrics
//!
//! Runs on its own address, separate from the client-facing port.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::error;

use crate::fixtures::FixtureStore;
use crate::metrics::MockMetrics;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub metrics: MockMetrics,
    pub fixtures: Arc<FixtureStore>,
}

/// Creates the HTTP router with metrics endpoints.
pub fn create_router(state: HttpState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/", get(root_handler))
        .with_state(state)
}

/// Root handler - returns basic info.
async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "fnos-mock-server-metrics",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/metrics"]
    }))
}

/// Prometheus text exposition.
async fn metrics_handler(State(state): State<HttpState>) -> Response {
    state
        .metrics
        .fixtures_cached
        .set(state.fixtures.cached_count() as i64);

    match state.metrics.encode() {
        Ok(text) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
