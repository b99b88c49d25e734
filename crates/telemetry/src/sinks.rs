// Path: crates/telemetry/src/sinks.rs
//! Defines abstract traits for metrics reporting, decoupling core logic from the backend.

use once_cell::sync::OnceCell;

// --- Static Sink Access ---

/// A no-op sink for use in tests or when telemetry is disabled.
#[derive(Debug, Clone, Copy)]
pub struct NopSink;

/// A lazily-initialized static reference to the global `MetricsSink` implementation.
pub static SINK: OnceCell<&'static dyn MetricsSink> = OnceCell::new();
static NOP_SINK: NopSink = NopSink;

/// Returns the configured Action Gateway metrics sink, or a no-op sink.
pub fn gateway_metrics() -> &'static dyn GatewayMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured bridge metrics sink, or a no-op sink.
pub fn bridge_metrics() -> &'static dyn BridgeMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured HTTP metrics sink, or a no-op sink.
pub fn rpc_metrics() -> &'static dyn RpcMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

/// Returns the configured error metrics sink, or a no-op sink.
pub fn error_metrics() -> &'static dyn ErrorMetricsSink {
    SINK.get().copied().unwrap_or(&NOP_SINK)
}

// --- Trait Definitions ---

/// A sink for metrics emitted by the TON Action Gateway.
pub trait GatewayMetricsSink: Send + Sync + std::fmt::Debug {
    /// Counts a request rejected at the validation boundary, labeled by reason code.
    fn inc_rejected(&self, reason: &'static str);
    /// Observes the latency of an upstream JSON-RPC call, labeled by RPC method.
    fn observe_upstream_latency(&self, rpc_method: &str, duration_secs: f64);
    /// Counts upstream call outcomes (`ok`, `timeout`, `transport`).
    fn inc_upstream_result(&self, rpc_method: &str, outcome: &'static str);
}
impl GatewayMetricsSink for NopSink {
    fn inc_rejected(&self, _reason: &'static str) {}
    fn observe_upstream_latency(&self, _rpc_method: &str, _duration_secs: f64) {}
    fn inc_upstream_result(&self, _rpc_method: &str, _outcome: &'static str) {}
}

/// A sink for metrics emitted by the Observation/Control Bridge.
pub trait BridgeMetricsSink: Send + Sync + std::fmt::Debug {
    /// Counts commands written to the command slot.
    fn inc_commands_dispatched(&self);
    /// Counts snapshots written through the renderer endpoint.
    fn inc_snapshots_published(&self);
    /// Increments the gauge of open observation connections.
    fn inc_observers(&self);
    /// Decrements the gauge of open observation connections.
    fn dec_observers(&self);
    /// Counts frames pushed to observers.
    fn inc_frames_pushed(&self);
}
impl BridgeMetricsSink for NopSink {
    fn inc_commands_dispatched(&self) {}
    fn inc_snapshots_published(&self) {}
    fn inc_observers(&self) {}
    fn dec_observers(&self) {}
    fn inc_frames_pushed(&self) {}
}

/// A sink for metrics related to the public HTTP server.
pub trait RpcMetricsSink: Send + Sync + std::fmt::Debug {
    /// Observes the latency of an HTTP request, labeled by route.
    fn observe_request_duration(&self, route: &str, duration_secs: f64);
    /// Increments a counter for total HTTP requests, labeled by route and status code.
    fn inc_requests_total(&self, route: &str, status_code: u16);
}
impl RpcMetricsSink for NopSink {
    fn observe_request_duration(&self, _route: &str, _duration_secs: f64) {}
    fn inc_requests_total(&self, _route: &str, _status_code: u16) {}
}

/// A sink for recording structured error metrics.
pub trait ErrorMetricsSink: Send + Sync + std::fmt::Debug {
    /// Increments a counter for a specific error, categorized by its kind and variant.
    fn inc_error(&self, kind: &'static str, variant: &'static str);
}
impl ErrorMetricsSink for NopSink {
    fn inc_error(&self, _kind: &'static str, _variant: &'static str) {}
}

/// A unified sink that implements all domain-specific traits, providing a single
/// point of implementation for metrics backends like Prometheus.
pub trait MetricsSink:
    GatewayMetricsSink + BridgeMetricsSink + RpcMetricsSink + ErrorMetricsSink
{
}

impl<T> MetricsSink for T where
    T: GatewayMetricsSink + BridgeMetricsSink + RpcMetricsSink + ErrorMetricsSink
{
}
