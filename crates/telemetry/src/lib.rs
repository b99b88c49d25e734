// Path: crates/telemetry/src/lib.rs
#![cfg_attr(
    not(test),
    deny(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
        clippy::indexing_slicing
    )
)]

//! # Aether Telemetry
//!
//! Observability infrastructure for the Aether runtime: structured logging
//! initialization, a Prometheus metrics endpoint, and abstract sinks that keep
//! the gateway and bridge code independent of the metrics backend.

/// A lightweight HTTP server for exposing `/metrics` and `/healthz`.
pub mod http;
/// The initialization routine for global structured logging.
pub mod init;
/// The concrete implementation of metrics sinks using the `prometheus` crate.
pub mod prometheus;
/// Abstract traits (`*MetricsSink`) that define the contract for metrics reporting.
pub mod sinks;
/// An RAII timer for upstream call latency.
pub mod time;

pub use sinks::{bridge_metrics, error_metrics, gateway_metrics, rpc_metrics};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::*;

    #[test]
    fn accessors_fall_back_to_nop_sink() {
        // No sink installed in unit tests: every call must be a silent no-op.
        gateway_metrics().inc_rejected("INVALID_ADDRESS");
        bridge_metrics().inc_observers();
        bridge_metrics().dec_observers();
        rpc_metrics().inc_requests_total("/ton", 200);
        error_metrics().inc_error("gateway", "TIMEOUT");
    }

    #[test]
    fn timer_reports_on_drop() {
        let sink = NopSink;
        let timer = time::UpstreamTimer::new(&sink, "runGetMethod");
        assert!(timer.elapsed().as_secs() < 5);
        drop(timer);
    }
}
