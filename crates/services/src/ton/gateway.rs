// Path: crates/services/src/ton/gateway.rs
//! The Action Gateway: the single place where agent requests turn into
//! outbound blockchain queries.
//!
//! Every call walks the same fixed pipeline (address, whitelist, parameter
//! count, encoding, dispatch) and the first failing step short-circuits the
//! rest. Nothing reaches the [`TonRpc`] client unless all earlier steps pass.

use super::client::{nano_to_ton, TonRpc};
use super::encoder::{decode_single_num, encode_stack};
use super::rules::{check_param_count, MethodWhitelist, TonAddress};
use aether_telemetry::{error_metrics, gateway_metrics};
use aether_types::app::{ActionPayload, ActionRequest, ActionResult};
use aether_types::config::TonConfig;
use aether_types::error::{GatewayError, GatewayErrorKind};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Validates, encodes and dispatches read-only queries.
///
/// Holds only immutable configuration and a shared client handle, so one
/// instance is shared by all request tasks.
#[derive(Clone)]
pub struct ActionGateway {
    rpc: Arc<dyn TonRpc>,
    whitelist: Arc<MethodWhitelist>,
    nano_methods: Arc<HashSet<String>>,
    max_params: usize,
    allow_raw_addresses: bool,
}

impl std::fmt::Debug for ActionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionGateway")
            .field("whitelist", &self.whitelist)
            .field("max_params", &self.max_params)
            .field("allow_raw_addresses", &self.allow_raw_addresses)
            .finish_non_exhaustive()
    }
}

impl ActionGateway {
    pub fn new(rpc: Arc<dyn TonRpc>, config: &TonConfig) -> Self {
        Self {
            rpc,
            whitelist: Arc::new(MethodWhitelist::new(config.allowed_methods.iter().cloned())),
            nano_methods: Arc::new(config.nano_methods.iter().cloned().collect()),
            max_params: config.max_params,
            allow_raw_addresses: config.allow_raw_addresses,
        }
    }

    /// Routes a parsed `/ton` request.
    pub async fn handle(&self, request: ActionRequest) -> ActionResult {
        match request {
            ActionRequest::Balance { address } => self.get_balance(&address).await,
            ActionRequest::Call {
                address,
                method,
                params,
            } => self.secure_call(&address, &method, &params).await,
        }
    }

    /// Executes a whitelisted get-method. Never panics and never retries.
    pub async fn secure_call(&self, address: &str, method: &str, params: &[Value]) -> ActionResult {
        let outcome = self.try_secure_call(address, method, params).await;
        self.finish("call", outcome)
    }

    /// Fetches an account balance. The method whitelist does not apply.
    pub async fn get_balance(&self, address: &str) -> ActionResult {
        let outcome = self.try_get_balance(address).await;
        self.finish("balance", outcome)
    }

    fn validate_address(&self, address: &str) -> Result<TonAddress, GatewayError> {
        TonAddress::parse(address, self.allow_raw_addresses).map_err(|reason| {
            tracing::warn!(
                target: "ton-gateway",
                input = %address,
                %reason,
                "Rejected invalid address"
            );
            GatewayError::InvalidAddress {
                input: address.to_string(),
                reason,
            }
        })
    }

    async fn try_secure_call(
        &self,
        address: &str,
        method: &str,
        params: &[Value],
    ) -> Result<ActionPayload, GatewayError> {
        let addr = self.validate_address(address)?;

        self.whitelist.check(method).inspect_err(|_| {
            tracing::warn!(
                target: "ton-gateway",
                address = %addr,
                method = %method,
                "Rejected unauthorized method"
            );
        })?;

        check_param_count(params, self.max_params).inspect_err(|_| {
            tracing::warn!(
                target: "ton-gateway",
                address = %addr,
                method = %method,
                count = params.len(),
                max = self.max_params,
                params = ?params,
                "Rejected oversized parameter list"
            );
        })?;

        let stack = encode_stack(params).inspect_err(|e| {
            tracing::warn!(target: "ton-gateway", method = %method, error = %e, "Rejected parameter");
        })?;

        tracing::debug!(
            target: "ton-gateway",
            address = %addr,
            method = %method,
            stack_len = stack.len(),
            "Dispatching get-method"
        );
        let result = self
            .rpc
            .run_get_method(addr.as_str(), method, &stack)
            .await?;

        let value = decode_single_num(&result);
        let balance = value
            .as_deref()
            .filter(|_| self.nano_methods.contains(method))
            .and_then(|v| v.parse::<u128>().ok())
            .map(nano_to_ton);

        Ok(ActionPayload::Call {
            address: addr.to_string(),
            method: method.to_string(),
            result,
            value,
            balance,
        })
    }

    async fn try_get_balance(&self, address: &str) -> Result<ActionPayload, GatewayError> {
        let addr = self.validate_address(address)?;
        let info = self.rpc.fetch_address_info(addr.as_str()).await?;
        Ok(ActionPayload::Balance {
            address: addr.to_string(),
            balance: info.balance(),
            balance_nano: info.balance_nano.to_string(),
            unit: "TON".to_string(),
        })
    }

    /// Records the outcome and converts it into the data-only result type.
    fn finish(&self, op: &'static str, outcome: Result<ActionPayload, GatewayError>) -> ActionResult {
        match outcome {
            Ok(payload) => ActionResult::Success(payload),
            Err(err) => {
                let kind = err.kind();
                error_metrics().inc_error("gateway", kind.as_str());
                match kind {
                    GatewayErrorKind::Timeout | GatewayErrorKind::TransportFailure => {
                        tracing::error!(target: "ton-gateway", op, error = %err, "Upstream RPC failed");
                    }
                    _ => gateway_metrics().inc_rejected(kind.as_str()),
                }
                err.into()
            }
        }
    }
}
