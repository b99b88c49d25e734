// Path: crates/node/src/lib.rs
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

//! Startup wiring shared by the `aether-runtime` binary and its tests.

use aether_http_gateway::AppState;
use aether_services::bridge::{Bridge, InMemoryStore, RedisStore, SharedStateStore};
use aether_services::ton::{ActionGateway, ToncenterClient};
use aether_types::config::{RuntimeConfig, StoreConfig};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug, Default)]
#[clap(name = "aether-runtime", about = "Observation/control bridge and TON action gateway")]
pub struct RuntimeOpts {
    /// Path to `runtime.toml`. Built-in defaults are used when omitted.
    #[clap(long, env = "AETHER_CONFIG")]
    pub config: Option<PathBuf>,
    #[clap(
        long,
        env = "AETHER_LISTEN_ADDR",
        help = "Overrides listen_addr in runtime.toml"
    )]
    pub listen_addr: Option<String>,
    #[clap(
        long,
        env = "AETHER_REDIS_URL",
        help = "Use the Redis store at this URL, overriding [store]"
    )]
    pub redis_url: Option<String>,
}

/// Reads the config file (if any) and applies command-line overrides.
pub fn load_config(opts: &RuntimeOpts) -> Result<RuntimeConfig> {
    let mut config: RuntimeConfig = match &opts.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => RuntimeConfig::default(),
    };
    if let Some(addr) = &opts.listen_addr {
        config.listen_addr = addr.clone();
    }
    if let Some(url) = &opts.redis_url {
        config.store = StoreConfig::Redis { url: url.clone() };
    }
    validate(&config)?;
    Ok(config)
}

fn validate(config: &RuntimeConfig) -> Result<()> {
    if config.ton.allowed_methods.is_empty() {
        return Err(anyhow!("ton.allowed_methods must not be empty"));
    }
    if config.ton.timeout_secs == 0 {
        return Err(anyhow!("ton.timeout_secs must be positive"));
    }
    if config.request_timeout_secs <= config.ton.timeout_secs {
        tracing::warn!(
            target: "runtime",
            request_timeout_secs = config.request_timeout_secs,
            ton_timeout_secs = config.ton.timeout_secs,
            "HTTP request timeout does not exceed the RPC timeout; slow upstream calls will surface as HTTP 408"
        );
    }
    Ok(())
}

pub async fn build_store(config: &StoreConfig) -> Result<Arc<dyn SharedStateStore>> {
    Ok(match config {
        StoreConfig::Memory => {
            tracing::info!(target: "runtime", "Using in-memory shared state store");
            Arc::new(InMemoryStore::new())
        }
        StoreConfig::Redis { url } => Arc::new(RedisStore::connect(url).await?),
    })
}

/// Builds the gateway and bridge from a validated config.
pub async fn build_state(config: &RuntimeConfig) -> Result<AppState> {
    let rpc = ToncenterClient::new(&config.ton)?;
    let gateway = ActionGateway::new(Arc::new(rpc), &config.ton);
    let store = build_store(&config.store).await?;
    let bridge = Bridge::new(store, &config.bridge);
    tracing::info!(
        target: "runtime",
        methods = config.ton.allowed_methods.len(),
        poll_interval_ms = config.bridge.poll_interval_ms,
        "Runtime components ready"
    );
    Ok(AppState::new(gateway, bridge))
}
