// Path: crates/telemetry/src/time.rs
use crate::sinks::GatewayMetricsSink;
use std::time::{Duration, Instant};

/// Observes the latency of one upstream JSON-RPC call when dropped.
pub struct UpstreamTimer<'a> {
    sink: &'a dyn GatewayMetricsSink,
    rpc_method: &'a str,
    start: Instant,
}

impl<'a> UpstreamTimer<'a> {
    pub fn new(sink: &'a dyn GatewayMetricsSink, rpc_method: &'a str) -> Self {
        Self {
            sink,
            rpc_method,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for UpstreamTimer<'_> {
    fn drop(&mut self) {
        self.sink
            .observe_upstream_latency(self.rpc_method, self.start.elapsed().as_secs_f64());
    }
}
