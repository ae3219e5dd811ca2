// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Prometheus Metrics for the fnOS Mock Server
//!
//! Counts connections, messages and the failure paths a client developer
//! usually wants to see (missing fixtures, handshake fallbacks).

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};

/// Mock server metrics.
#[derive(Clone)]
pub struct MockMetrics {
    /// Registry for all metrics.
    pub registry: Arc<Registry>,

    // Connection metrics
    /// Total WebSocket connections accepted.
    pub connections_total: IntCounter,
    /// Current active WebSocket connections.
    pub connections_active: IntGauge,
    /// Failed or timed out WebSocket handshakes, refused paths.
    pub connection_errors: IntCounter,

    // Message metrics
    pub messages_received: IntCounter,
    pub messages_sent: IntCounter,
    /// Replies carrying `"result":"fail"`.
    pub failure_responses: IntCounter,
    /// Decode, route and encode time per message, in seconds.
    pub message_duration: Histogram,

    // Fixture metrics
    /// Requests for a type with no fixture.
    pub fixture_misses: IntCounter,
    /// Fixture templates currently cached.
    pub fixtures_cached: IntGauge,

    // Handshake metrics
    /// Encrypted logins answered with the synthetic fallback.
    pub handshake_fallbacks: IntCounter,
}

impl MockMetrics {
    /// Creates a new metrics instance with all collectors registered.
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let connections_total = register(
            &registry,
            IntCounter::with_opts(Opts::new(
                "fnos_mock_connections_total",
                "Total WebSocket connections accepted",
            ))?,
        )?;
        let connections_active = register(
            &registry,
            IntGauge::with_opts(Opts::new(
                "fnos_mock_connections_active",
                "Current active WebSocket connections",
            ))?,
        )?;
        let connection_errors = register(
            &registry,
            IntCounter::with_opts(Opts::new(
                "fnos_mock_connection_errors_total",
                "Total connection errors",
            ))?,
        )?;

        let messages_received = register(
            &registry,
            IntCounter::with_opts(Opts::new(
                "fnos_mock_messages_received_total",
                "Total messages received",
            ))?,
        )?;
        let messages_sent = register(
            &registry,
            IntCounter::with_opts(Opts::new(
                "fnos_mock_messages_sent_total",
                "Total messages sent",
            ))?,
        )?;
        let failure_responses = register(
            &registry,
            IntCounter::with_opts(Opts::new(
                "fnos_mock_failure_responses_total",
                "Total failure responses sent",
            ))?,
        )?;
        let message_duration = register(
            &registry,
            Histogram::with_opts(HistogramOpts::new(
                "fnos_mock_message_duration_seconds",
                "Message processing duration in seconds",
            ))?,
        )?;

        let fixture_misses = register(
            &registry,
            IntCounter::with_opts(Opts::new(
                "fnos_mock_fixture_misses_total",
                "Requests for a type with no fixture",
            ))?,
        )?;
        let fixtures_cached = register(
            &registry,
            IntGauge::with_opts(Opts::new(
                "fnos_mock_fixtures_cached",
                "Fixture templates currently cached",
            ))?,
        )?;

        let handshake_fallbacks = register(
            &registry,
            IntCounter::with_opts(Opts::new(
                "fnos_mock_handshake_fallbacks_total",
                "Encrypted logins answered with a fallback response",
            ))?,
        )?;

        Ok(MockMetrics {
            registry: Arc::new(registry),
            connections_total,
            connections_active,
            connection_errors,
            messages_received,
            messages_sent,
            failure_responses,
            message_duration,
            fixture_misses,
            fixtures_cached,
            handshake_fallbacks,
        })
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> prometheus::Result<String> {
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn register<C>(registry: &Registry, collector: C) -> prometheus::Result<C>
where
    C: Collector + Clone + 'static,
{
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_lists_all_families() {
        let metrics = MockMetrics::new().unwrap();
        metrics.connections_total.inc();
        metrics.fixture_misses.inc_by(3);
        metrics.message_duration.observe(0.01);

        let text = metrics.encode().unwrap();
        assert!(text.contains("fnos_mock_connections_total 1"));
        assert!(text.contains("fnos_mock_fixture_misses_total 3"));
        assert!(text.contains("fnos_mock_handshake_fallbacks_total 0"));
        assert!(text.contains("fnos_mock_message_duration_seconds_count 1"));
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let a = MockMetrics::new().unwrap();
        let b = MockMetrics::new().unwrap();
        a.messages_received.inc();
        assert_eq!(a.messages_received.get(), 1);
        assert_eq!(b.messages_received.get(), 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = MockMetrics::new().unwrap();
        let clone = metrics.clone();
        clone.failure_responses.inc();
        assert_eq!(metrics.failure_responses.get(), 1);
    }
}
