// Path: crates/types/src/config/mod.rs

//! Shared configuration structures for the Aether runtime components.
//!
//! Every field carries a default so that an empty `runtime.toml` yields a
//! working local-mode configuration.
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from `runtime.toml`.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Address the HTTP/WebSocket server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Sustained requests per second allowed per client IP.
    #[serde(default = "default_rps")]
    pub rps: u32,
    /// Token-bucket burst size per client IP.
    #[serde(default = "default_burst")]
    pub burst: u32,
    /// Maximum accepted request body size in KiB.
    #[serde(default = "default_body_limit_kb")]
    pub body_limit_kb: usize,
    /// Timeout applied to non-streaming HTTP requests, in seconds.
    /// Must exceed `ton.timeout_secs` so the gateway reports upstream timeouts itself.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// CIDRs of reverse proxies whose `X-Forwarded-For` header is trusted.
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
    /// Action Gateway configuration.
    #[serde(default)]
    pub ton: TonConfig,
    /// Observation/Control Bridge configuration.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Shared state store configuration.
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}
fn default_rps() -> u32 {
    50
}
fn default_burst() -> u32 {
    100
}
fn default_body_limit_kb() -> usize {
    512
}
fn default_request_timeout_secs() -> u64 {
    15
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            rps: default_rps(),
            burst: default_burst(),
            body_limit_kb: default_body_limit_kb(),
            request_timeout_secs: default_request_timeout_secs(),
            trusted_proxies: Vec::new(),
            ton: TonConfig::default(),
            bridge: BridgeConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Configuration of the TON Action Gateway and its RPC client.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TonConfig {
    /// The JSON-RPC endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// API key sent as `X-API-Key`. Takes precedence over `api_key_env`.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Hard cap on every outbound RPC call, in seconds.
    #[serde(default = "default_ton_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum number of get-method parameters.
    #[serde(default = "default_max_params")]
    pub max_params: usize,
    /// The closed whitelist of read-only get-methods.
    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: Vec<String>,
    /// Whitelisted methods whose single integer result is denominated in nano-TON.
    #[serde(default = "default_nano_methods")]
    pub nano_methods: Vec<String>,
    /// Accept 48-character addresses without a known variant prefix.
    #[serde(default = "default_true")]
    pub allow_raw_addresses: bool,
}

fn default_api_url() -> String {
    "https://toncenter.com/api/v2/jsonRPC".to_string()
}
fn default_api_key_env() -> String {
    "TON_API_KEY".to_string()
}
fn default_ton_timeout_secs() -> u64 {
    10
}
fn default_max_params() -> usize {
    10
}
fn default_allowed_methods() -> Vec<String> {
    [
        "get_balance",
        "seqno",
        "get_public_key",
        "get_subwallet_id",
        "get_wallet_data",
        "get_wallet_address",
        "get_jetton_data",
        "get_nft_data",
        "get_collection_data",
        "get_nft_address_by_index",
        "get_nft_content",
        "get_plugin_list",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_nano_methods() -> Vec<String> {
    vec!["get_balance".to_string()]
}
fn default_true() -> bool {
    true
}

impl Default for TonConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_ton_timeout_secs(),
            max_params: default_max_params(),
            allowed_methods: default_allowed_methods(),
            nano_methods: default_nano_methods(),
            allow_raw_addresses: default_true(),
        }
    }
}

impl TonConfig {
    /// Resolves the API key from the config, then from the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Configuration of the Observation/Control Bridge.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Fixed delay between snapshot pushes on `/observe`, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Suppress a push when the snapshot is identical to the previous one.
    #[serde(default)]
    pub skip_unchanged: bool,
    /// Store key holding the latest command.
    #[serde(default = "default_command_key")]
    pub command_key: String,
    /// Store key holding the latest snapshot.
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,
}

fn default_poll_interval_ms() -> u64 {
    250
}
fn default_command_key() -> String {
    "last_command".to_string()
}
fn default_snapshot_key() -> String {
    "ui_state".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            skip_unchanged: false,
            command_key: default_command_key(),
            snapshot_key: default_snapshot_key(),
        }
    }
}

/// Selects the shared state store backend.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Process-local store; the renderer must use the HTTP renderer endpoints.
    #[default]
    Memory,
    /// A Redis server shared with the renderer.
    Redis {
        /// Connection URL, e.g. `redis://redis:6379/0`.
        #[serde(default = "default_redis_url")]
        url: String,
    },
}

fn default_redis_url() -> String {
    "redis://redis:6379/0".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: RuntimeConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.ton.timeout_secs, 10);
        assert_eq!(cfg.ton.max_params, 10);
        assert!(cfg.ton.allowed_methods.iter().any(|m| m == "get_balance"));
        assert_eq!(cfg.bridge.command_key, "last_command");
        assert_eq!(cfg.bridge.snapshot_key, "ui_state");
        assert_eq!(cfg.store, StoreConfig::Memory);
    }

    #[test]
    fn parses_redis_store_and_whitelist() {
        let cfg: RuntimeConfig = toml::from_str(
            r#"
            listen_addr = "127.0.0.1:9000"

            [ton]
            allowed_methods = ["seqno"]
            timeout_secs = 3

            [bridge]
            poll_interval_ms = 50
            skip_unchanged = true

            [store]
            backend = "redis"
            url = "redis://localhost:6379/1"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
        assert_eq!(cfg.ton.allowed_methods, vec!["seqno".to_string()]);
        assert_eq!(cfg.ton.timeout_secs, 3);
        assert!(cfg.bridge.skip_unchanged);
        assert_eq!(
            cfg.store,
            StoreConfig::Redis {
                url: "redis://localhost:6379/1".into()
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let res: Result<RuntimeConfig, _> = toml::from_str("[ton]\nallow_methods = []\n");
        assert!(res.is_err());
    }

    #[test]
    fn explicit_api_key_wins_over_environment() {
        let cfg = TonConfig {
            api_key: Some("from-config".into()),
            api_key_env: "AETHER_TEST_UNSET_KEY_VAR".into(),
            ..TonConfig::default()
        };
        assert_eq!(cfg.resolve_api_key().as_deref(), Some("from-config"));

        let cfg = TonConfig {
            api_key: Some("  ".into()),
            api_key_env: "AETHER_TEST_UNSET_KEY_VAR".into(),
            ..TonConfig::default()
        };
        assert_eq!(cfg.resolve_api_key(), None);
    }
}
