// Path: crates/types/src/app/action.rs

use crate::error::{ErrorCode, GatewayError, GatewayErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The type tag of a single get-method stack entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackTag {
    /// A stringified integer.
    Num,
    /// A verbatim string.
    Str,
}

/// One element of a `runGetMethod` stack, serialized as `["num", "42"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEntry(
    /// The entry type.
    pub StackTag,
    /// The entry value in its string form.
    pub String,
);

impl StackEntry {
    /// Builds a `num` entry from an integer.
    pub fn num(n: impl ToString) -> Self {
        Self(StackTag::Num, n.to_string())
    }

    /// Builds a `str` entry.
    pub fn str(s: impl Into<String>) -> Self {
        Self(StackTag::Str, s.into())
    }
}

/// A validated top-level request for the `/ton` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", deny_unknown_fields)]
pub enum ActionRequest {
    /// Fetch the balance of an account.
    Balance {
        /// The account address (validated by the gateway, not here).
        address: String,
    },
    /// Execute a whitelisted get-method on a contract.
    Call {
        /// The contract address.
        address: String,
        /// The get-method name.
        method: String,
        /// The loosely-typed parameter list.
        params: Vec<Value>,
    },
}

/// Why a raw `/ton` body could not be turned into an `ActionRequest`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRequest {
    /// The `action` field is missing or names an action the gateway does not know.
    #[error("Unknown TON action requested: {0}")]
    UnknownAction(String),
    /// A required field is missing, has the wrong type, or an unknown field is present.
    #[error("Invalid request: {0}")]
    InvalidField(String),
}

impl ErrorCode for MalformedRequest {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownAction(_) => GatewayErrorKind::UnknownAction.as_str(),
            Self::InvalidField(_) => "INVALID_REQUEST",
        }
    }
}

impl ActionRequest {
    /// The action names accepted in the `action` field.
    pub const ACTIONS: [&'static str; 2] = ["balance", "call"];

    /// Parses a loosely-typed JSON body, separating an unknown `action` from
    /// field-level problems so the transport can report them distinctly.
    pub fn from_json(value: Value) -> Result<Self, MalformedRequest> {
        let action = value
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| MalformedRequest::UnknownAction("<missing>".into()))?;
        if !Self::ACTIONS.contains(&action) {
            return Err(MalformedRequest::UnknownAction(action.to_string()));
        }
        serde_json::from_value(value).map_err(|e| MalformedRequest::InvalidField(e.to_string()))
    }
}

/// The successful outcome of a gateway call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload {
    /// An account balance.
    Balance {
        /// The queried address.
        address: String,
        /// The balance in TON (`balance_nano / 10^9`).
        balance: f64,
        /// The balance in nano-units exactly as reported.
        balance_nano: String,
        /// Always `"TON"`.
        unit: String,
    },
    /// The raw result of a get-method.
    Call {
        /// The contract address.
        address: String,
        /// The executed get-method.
        method: String,
        /// The remote result verbatim.
        result: Value,
        /// The decoded integer when the result stack is a single `num` entry.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        /// The decoded value converted to TON for nano-denominated methods.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        balance: Option<f64>,
    },
}

/// The structured failure of a gateway call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFailure {
    /// The closed-set reason.
    pub code: GatewayErrorKind,
    /// A human-readable description.
    pub message: String,
}

impl From<&GatewayError> for ActionFailure {
    fn from(e: &GatewayError) -> Self {
        Self {
            code: e.kind(),
            message: e.to_string(),
        }
    }
}

/// The outcome of every Action Gateway operation. Failures are data, never panics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionResult {
    /// The call succeeded.
    Success(ActionPayload),
    /// The call was rejected or failed upstream.
    Error(ActionFailure),
}

impl ActionResult {
    /// Returns `true` for a `Success` result.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns the error kind for an `Error` result.
    pub fn error_kind(&self) -> Option<GatewayErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Error(f) => Some(f.code),
        }
    }
}

impl From<GatewayError> for ActionResult {
    fn from(e: GatewayError) -> Self {
        Self::Error(ActionFailure::from(&e))
    }
}
