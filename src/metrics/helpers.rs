//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    DECODE_FAILURES_TOTAL, IDENTITIES_REGISTERED, MESSAGES_RECEIVED_TOTAL, RELAYS_DELIVERED_TOTAL,
    RELAYS_DROPPED_TOTAL, ROOMS_ACTIVE, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_CLOSED,
    WS_CONNECTIONS_OPENED,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording connection lifecycle metrics
pub struct ConnectionMetrics;

impl ConnectionMetrics {
    pub fn record_opened() {
        WS_CONNECTIONS_OPENED.inc();
        WS_CONNECTIONS_ACTIVE.inc();
    }

    pub fn record_closed() {
        WS_CONNECTIONS_CLOSED.inc();
        WS_CONNECTIONS_ACTIVE.dec();
    }

    /// Refresh registry gauges from current sizes
    pub fn set_registry_sizes(identities: usize, rooms: usize) {
        IDENTITIES_REGISTERED.set(identities as i64);
        ROOMS_ACTIVE.set(rooms as i64);
    }
}

/// Helper struct for recording signaling protocol metrics
pub struct SignalMetrics;

impl SignalMetrics {
    pub fn record_received(kind: &str) {
        MESSAGES_RECEIVED_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn record_decode_failure(reason: &str) {
        DECODE_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn record_relay_delivered(kind: &str) {
        RELAYS_DELIVERED_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn record_relay_dropped(kind: &str) {
        RELAYS_DROPPED_TOTAL.with_label_values(&[kind]).inc();
    }
}
