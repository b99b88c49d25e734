// Path: crates/services/src/ton/client.rs
//! The outbound JSON-RPC client for the TON HTTP API.

use aether_telemetry::gateway_metrics;
use aether_telemetry::time::UpstreamTimer;
use aether_types::app::StackEntry;
use aether_types::config::TonConfig;
use aether_types::error::RpcError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Nano-units per TON.
pub const NANO_PER_TON: f64 = 1_000_000_000.0;

const BODY_SNIPPET_LEN: usize = 160;

/// Account state as returned by `getAddressInformation`.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressInfo {
    /// Balance in nano-units, exactly as reported.
    pub balance_nano: u128,
    /// Account state (`active`, `uninitialized`, `frozen`), if reported.
    pub state: Option<String>,
}

impl AddressInfo {
    /// Extracts the account info from a `getAddressInformation` result.
    /// A missing or non-integer balance is a malformed response.
    pub fn from_result(result: &Value) -> Result<Self, RpcError> {
        let balance_nano = match result.get("balance") {
            Some(Value::String(s)) => s.parse::<u128>().ok(),
            Some(Value::Number(n)) => n.as_u64().map(u128::from),
            _ => None,
        }
        .ok_or_else(|| {
            RpcError::Malformed("getAddressInformation result has no integer balance".into())
        })?;
        Ok(Self {
            balance_nano,
            state: result
                .get("state")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }

    /// The balance in TON.
    pub fn balance(&self) -> f64 {
        nano_to_ton(self.balance_nano)
    }
}

/// Converts nano-units to TON.
pub fn nano_to_ton(nano: u128) -> f64 {
    nano as f64 / NANO_PER_TON
}

/// The read-only RPC surface the Action Gateway depends on.
#[async_trait]
pub trait TonRpc: Send + Sync {
    /// Fetches the state of an account.
    async fn fetch_address_info(&self, address: &str) -> Result<AddressInfo, RpcError>;

    /// Executes a get-method and returns the remote `result` object verbatim.
    async fn run_get_method(
        &self,
        address: &str,
        method: &str,
        stack: &[StackEntry],
    ) -> Result<Value, RpcError>;
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    id: &'static str,
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
}

/// A [`TonRpc`] backed by a toncenter-compatible JSON-RPC endpoint.
#[derive(Clone)]
pub struct ToncenterClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for ToncenterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToncenterClient")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ToncenterClient {
    pub fn new(config: &TonConfig) -> Result<Self, RpcError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        Self::with_timeout(config, timeout)
    }

    /// Like [`ToncenterClient::new`] with an explicit bound, for sub-second timeouts.
    pub fn with_timeout(config: &TonConfig, timeout: Duration) -> Result<Self, RpcError> {
        let api_key = config.resolve_api_key();
        if api_key.is_none() {
            tracing::warn!(
                target: "ton-gateway",
                env = %config.api_key_env,
                "No TON API key configured; requests will be subject to public rate limits"
            );
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            timeout,
        })
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Performs one JSON-RPC exchange and returns the `result` member.
    async fn call(&self, rpc_method: &'static str, params: Value) -> Result<Value, RpcError> {
        let metrics = gateway_metrics();
        let _timer = UpstreamTimer::new(metrics, rpc_method);

        // Hard cap on top of the client timeout, so a stalled body read cannot hang the task.
        let outcome = tokio::time::timeout(self.timeout, self.exchange(rpc_method, params))
            .await
            .unwrap_or(Err(RpcError::Timeout(self.timeout_ms())));

        let label = match &outcome {
            Ok(_) => "ok",
            Err(RpcError::Timeout(_)) => "timeout",
            Err(_) => "transport",
        };
        metrics.inc_upstream_result(rpc_method, label);
        outcome
    }

    async fn exchange(&self, rpc_method: &str, params: Value) -> Result<Value, RpcError> {
        let mut req = self.client.post(&self.api_url).json(&JsonRpcRequest {
            id: "1",
            jsonrpc: "2.0",
            method: rpc_method,
            params,
        });
        if let Some(key) = &self.api_key {
            req = req.header("X-API-Key", key);
        }

        let resp = req.send().await.map_err(|e| self.map_reqwest(e))?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.map_reqwest(e))?;
        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let mut envelope: Value = serde_json::from_slice(&body)
            .map_err(|e| RpcError::Malformed(format!("{e}: {}", snippet(&body))))?;
        if let Some(err) = envelope.get("error").filter(|e| !e.is_null()) {
            return Err(RpcError::Remote(err.to_string()));
        }
        if envelope.get("ok").and_then(Value::as_bool) == Some(false) {
            return Err(RpcError::Remote("endpoint answered ok=false".into()));
        }
        match envelope.get_mut("result").map(Value::take) {
            Some(result) if !result.is_null() => Ok(result),
            _ => Err(RpcError::Malformed("response has no result".into())),
        }
    }

    fn map_reqwest(&self, e: reqwest::Error) -> RpcError {
        if e.is_timeout() {
            RpcError::Timeout(self.timeout_ms())
        } else {
            RpcError::Transport(e.to_string())
        }
    }
}

fn snippet(bytes: &[u8]) -> String {
    let s = String::from_utf8_lossy(bytes);
    s.trim().chars().take(BODY_SNIPPET_LEN).collect()
}

#[async_trait]
impl TonRpc for ToncenterClient {
    async fn fetch_address_info(&self, address: &str) -> Result<AddressInfo, RpcError> {
        let result = self
            .call("getAddressInformation", json!({ "address": address }))
            .await?;
        AddressInfo::from_result(&result)
    }

    async fn run_get_method(
        &self,
        address: &str,
        method: &str,
        stack: &[StackEntry],
    ) -> Result<Value, RpcError> {
        self.call(
            "runGetMethod",
            json!({ "address": address, "method": method, "stack": stack }),
        )
        .await
    }
}
