// Path: crates/node/src/bin/aether-runtime.rs
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

use aether_http_gateway::GatewayConfig;
use aether_node::{build_state, load_config, RuntimeOpts};
use anyhow::{anyhow, Result};
use clap::Parser;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing FIRST
    aether_telemetry::init::init_tracing()?;
    let metrics_sink = aether_telemetry::prometheus::install()?;
    aether_telemetry::sinks::SINK
        .set(metrics_sink)
        .map_err(|_| anyhow!("metrics sink must only be set once"))?;

    let opts = RuntimeOpts::parse();
    tracing::info!(target: "runtime", event = "startup", config = ?opts.config);

    let config = load_config(&opts)?;
    let state = build_state(&config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // 2. Spawn the telemetry server
    let telemetry_addr_str =
        std::env::var("TELEMETRY_ADDR").unwrap_or_else(|_| "127.0.0.1:9616".to_string());
    let telemetry_addr = telemetry_addr_str.parse()?;
    let telemetry = tokio::spawn(aether_telemetry::http::run_server(
        telemetry_addr,
        shutdown_rx.clone(),
    ));

    let gateway_config = GatewayConfig::from(&config);
    let mut server = tokio::spawn(aether_http_gateway::run_server(
        gateway_config,
        state,
        shutdown_rx,
    ));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(target: "runtime", event = "shutdown", reason = "ctrl-c");
        }
        res = &mut server => {
            // The server only returns early on a startup failure such as a bind error.
            let _ = shutdown_tx.send(true);
            return match res {
                Ok(inner) => inner,
                Err(e) => Err(anyhow!("server task failed: {e}")),
            };
        }
    }

    let _ = shutdown_tx.send(true);
    server.await??;
    telemetry.await?;
    tracing::info!(target: "runtime", event = "shutdown", reason = "complete");

    Ok(())
}
