// Path: crates/telemetry/src/prometheus.rs
//! A concrete implementation of the metrics sinks using the Prometheus crate.

use crate::sinks::*;
use once_cell::sync::OnceCell;
use prometheus::{
    exponential_buckets, register_gauge, register_histogram_vec, register_int_counter,
    register_int_counter_vec, Gauge, HistogramVec, IntCounter, IntCounterVec,
};

// --- Metric Statics ---
// Initialized exactly once by `install`.

static GATEWAY_REJECTED_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static UPSTREAM_LATENCY_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static UPSTREAM_RESULTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static BRIDGE_COMMANDS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static BRIDGE_SNAPSHOTS_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static BRIDGE_OBSERVERS: OnceCell<Gauge> = OnceCell::new();
static BRIDGE_FRAMES_TOTAL: OnceCell<IntCounter> = OnceCell::new();
static HTTP_REQUESTS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();
static HTTP_REQUEST_DURATION_SECONDS: OnceCell<HistogramVec> = OnceCell::new();
static ERRORS_TOTAL: OnceCell<IntCounterVec> = OnceCell::new();

#[derive(Debug, Clone, Copy)]
pub struct PrometheusSink;

/// Panics if `install()` has not been called, which indicates a setup error.
macro_rules! get_metric {
    ($metric:ident) => {
        $metric
            .get()
            .expect("Prometheus sink not initialized. Call telemetry::prometheus::install() first.")
    };
}

impl GatewayMetricsSink for PrometheusSink {
    fn inc_rejected(&self, reason: &'static str) {
        get_metric!(GATEWAY_REJECTED_TOTAL)
            .with_label_values(&[reason])
            .inc();
    }
    fn observe_upstream_latency(&self, rpc_method: &str, duration_secs: f64) {
        get_metric!(UPSTREAM_LATENCY_SECONDS)
            .with_label_values(&[rpc_method])
            .observe(duration_secs);
    }
    fn inc_upstream_result(&self, rpc_method: &str, outcome: &'static str) {
        get_metric!(UPSTREAM_RESULTS_TOTAL)
            .with_label_values(&[rpc_method, outcome])
            .inc();
    }
}

impl BridgeMetricsSink for PrometheusSink {
    fn inc_commands_dispatched(&self) {
        get_metric!(BRIDGE_COMMANDS_TOTAL).inc();
    }
    fn inc_snapshots_published(&self) {
        get_metric!(BRIDGE_SNAPSHOTS_TOTAL).inc();
    }
    fn inc_observers(&self) {
        get_metric!(BRIDGE_OBSERVERS).inc();
    }
    fn dec_observers(&self) {
        get_metric!(BRIDGE_OBSERVERS).dec();
    }
    fn inc_frames_pushed(&self) {
        get_metric!(BRIDGE_FRAMES_TOTAL).inc();
    }
}

impl RpcMetricsSink for PrometheusSink {
    fn observe_request_duration(&self, route: &str, duration_secs: f64) {
        get_metric!(HTTP_REQUEST_DURATION_SECONDS)
            .with_label_values(&[route])
            .observe(duration_secs);
    }
    fn inc_requests_total(&self, route: &str, status_code: u16) {
        get_metric!(HTTP_REQUESTS_TOTAL)
            .with_label_values(&[route, &status_code.to_string()])
            .inc();
    }
}

impl ErrorMetricsSink for PrometheusSink {
    fn inc_error(&self, kind: &'static str, variant: &'static str) {
        get_metric!(ERRORS_TOTAL)
            .with_label_values(&[kind, variant])
            .inc();
    }
}

/// Initializes all Prometheus metrics collectors and returns a static reference to the sink.
/// This function must be called only once at application startup.
#[allow(clippy::expect_used)]
pub fn install() -> Result<&'static dyn MetricsSink, prometheus::Error> {
    GATEWAY_REJECTED_TOTAL
        .set(register_int_counter_vec!(
            "aether_gateway_rejected_total",
            "Requests rejected at the Action Gateway validation boundary.",
            &["reason"]
        )?)
        .expect("static already initialized");
    UPSTREAM_LATENCY_SECONDS
        .set(register_histogram_vec!(
            "aether_upstream_request_duration_seconds",
            "Latency of outbound JSON-RPC calls to the TON endpoint.",
            &["rpc_method"],
            exponential_buckets(0.005, 2.0, 13)?
        )?)
        .expect("static already initialized");
    UPSTREAM_RESULTS_TOTAL
        .set(register_int_counter_vec!(
            "aether_upstream_results_total",
            "Outcomes of outbound JSON-RPC calls.",
            &["rpc_method", "outcome"]
        )?)
        .expect("static already initialized");
    BRIDGE_COMMANDS_TOTAL
        .set(register_int_counter!(
            "aether_bridge_commands_dispatched_total",
            "Control commands written to the command slot."
        )?)
        .expect("static already initialized");
    BRIDGE_SNAPSHOTS_TOTAL
        .set(register_int_counter!(
            "aether_bridge_snapshots_published_total",
            "UI snapshots written through the renderer endpoint."
        )?)
        .expect("static already initialized");
    BRIDGE_OBSERVERS
        .set(register_gauge!(
            "aether_bridge_observers",
            "Currently open observation connections."
        )?)
        .expect("static already initialized");
    BRIDGE_FRAMES_TOTAL
        .set(register_int_counter!(
            "aether_bridge_frames_pushed_total",
            "Snapshot frames pushed to observers."
        )?)
        .expect("static already initialized");
    HTTP_REQUESTS_TOTAL
        .set(register_int_counter_vec!(
            "aether_http_requests_total",
            "Total HTTP requests.",
            &["route", "status"]
        )?)
        .expect("static already initialized");
    HTTP_REQUEST_DURATION_SECONDS
        .set(register_histogram_vec!(
            "aether_http_request_duration_seconds",
            "Latency of HTTP requests.",
            &["route"],
            exponential_buckets(0.001, 2.0, 15)?
        )?)
        .expect("static already initialized");
    ERRORS_TOTAL
        .set(register_int_counter_vec!(
            "aether_errors_total",
            "Total number of errors, categorized by type and variant.",
            &["kind", "variant"]
        )?)
        .expect("static already initialized");

    static SINK: PrometheusSink = PrometheusSink;
    Ok(&SINK)
}
