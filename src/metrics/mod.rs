//! Prometheus metrics for the signaling relay.
//!
//! - Connection metrics (opened, closed, active)
//! - Registry gauges (identities, rooms)
//! - Protocol metrics (messages received by type, decode failures, relays)

mod helpers;

pub use helpers::{encode_metrics, ConnectionMetrics, SignalMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, IntCounter,
    IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "signal_relay";

lazy_static! {
    // ============================================================================
    // Connection Metrics
    // ============================================================================

    /// Total WebSocket connections opened
    pub static ref WS_CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_opened_total", METRIC_PREFIX),
        "Total WebSocket connections opened"
    ).unwrap();

    /// Total WebSocket connections closed
    pub static ref WS_CONNECTIONS_CLOSED: IntCounter = register_int_counter!(
        format!("{}_ws_connections_closed_total", METRIC_PREFIX),
        "Total WebSocket connections closed"
    ).unwrap();

    /// Currently open WebSocket connections
    pub static ref WS_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_ws_connections_active", METRIC_PREFIX),
        "Number of open WebSocket connections"
    ).unwrap();

    // ============================================================================
    // Registry Metrics
    // ============================================================================

    /// Logged-in identities
    pub static ref IDENTITIES_REGISTERED: IntGauge = register_int_gauge!(
        format!("{}_identities_registered", METRIC_PREFIX),
        "Number of registered identities"
    ).unwrap();

    /// Registered rooms
    pub static ref ROOMS_ACTIVE: IntGauge = register_int_gauge!(
        format!("{}_rooms_active", METRIC_PREFIX),
        "Number of registered rooms"
    ).unwrap();

    // ============================================================================
    // Protocol Metrics
    // ============================================================================

    /// Decoded client messages by type
    pub static ref MESSAGES_RECEIVED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_messages_received_total", METRIC_PREFIX),
        "Total client messages received",
        &["type"]
    ).unwrap();

    /// Frames that could not be decoded, by reason
    pub static ref DECODE_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_decode_failures_total", METRIC_PREFIX),
        "Total inbound frames that failed to decode",
        &["reason"]
    ).unwrap();

    /// Offers/answers/candidates handed to their target
    pub static ref RELAYS_DELIVERED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_relays_delivered_total", METRIC_PREFIX),
        "Total relayed messages queued for their target",
        &["type"]
    ).unwrap();

    /// Offers/answers/candidates dropped because the target was unavailable
    pub static ref RELAYS_DROPPED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_relays_dropped_total", METRIC_PREFIX),
        "Total relayed messages dropped",
        &["type"]
    ).unwrap();
}
