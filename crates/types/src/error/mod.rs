// Path: crates/types/src/error/mod.rs
//! Core error types for the Aether runtime.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// The facet of the address grammar that a candidate address violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// The address is not exactly 48 characters long.
    #[error("address must be 48 characters, got {0}")]
    MalformedLength(usize),
    /// The address contains a character outside the base64url alphabet.
    #[error("invalid character {found:?} at position {position}")]
    InvalidAlphabet {
        /// Zero-based character position of the first offending character.
        position: usize,
        /// The offending character.
        found: char,
    },
    /// The 2-character variant prefix is not one of the known tags.
    #[error("unknown address prefix {0:?}")]
    MalformedPrefix(String),
}

impl ErrorCode for AddressError {
    fn code(&self) -> &'static str {
        match self {
            Self::MalformedLength(_) => "ADDRESS_MALFORMED_LENGTH",
            Self::InvalidAlphabet { .. } => "ADDRESS_INVALID_ALPHABET",
            Self::MalformedPrefix(_) => "ADDRESS_MALFORMED_PREFIX",
        }
    }
}

/// The closed set of reasons an Action Gateway call can fail.
///
/// Serialized as the `code` field of an error `ActionResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayErrorKind {
    /// The address failed the structural grammar.
    InvalidAddress,
    /// The method is not in the whitelist.
    UnauthorizedMethod,
    /// The parameter list exceeds the configured maximum.
    TooManyParams,
    /// A parameter is neither an integer nor a string.
    UnsupportedParamType,
    /// The upstream RPC did not answer within the timeout.
    Timeout,
    /// The upstream RPC failed at the transport or protocol level.
    TransportFailure,
    /// The top-level request was malformed.
    UnknownAction,
}

impl GatewayErrorKind {
    /// The stable code string, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidAddress => "INVALID_ADDRESS",
            Self::UnauthorizedMethod => "UNAUTHORIZED_METHOD",
            Self::TooManyParams => "TOO_MANY_PARAMS",
            Self::UnsupportedParamType => "UNSUPPORTED_PARAM_TYPE",
            Self::Timeout => "TIMEOUT",
            Self::TransportFailure => "TRANSPORT_FAILURE",
            Self::UnknownAction => "UNKNOWN_ACTION",
        }
    }
}

/// Errors produced by the Action Gateway pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    /// The supplied address failed validation.
    #[error("Invalid address {input:?}: {reason}")]
    InvalidAddress {
        /// The raw input as received from the agent.
        input: String,
        /// Which facet of the grammar failed.
        reason: AddressError,
    },
    /// The method is not whitelisted.
    #[error("Method {0:?} is not authorized")]
    UnauthorizedMethod(String),
    /// The parameter list is too long.
    #[error("Too many parameters: {count} (max {max})")]
    TooManyParams {
        /// The number of parameters received.
        count: usize,
        /// The configured maximum.
        max: usize,
    },
    /// A parameter cannot be represented as a tagged `num` or `str` stack entry.
    #[error("Unsupported parameter type at index {index}: {kind}")]
    UnsupportedParamType {
        /// Zero-based position of the offending element.
        index: usize,
        /// The runtime kind of the offending element (e.g. `float`, `null`).
        kind: &'static str,
    },
    /// The upstream RPC timed out.
    #[error("Upstream RPC timed out after {0} ms")]
    Timeout(u64),
    /// The upstream RPC failed.
    #[error("Upstream RPC failure: {0}")]
    TransportFailure(String),
    /// The top-level request was malformed or named an unknown action.
    #[error("Unknown or malformed action: {0}")]
    UnknownAction(String),
}

impl GatewayError {
    /// Returns the closed-set kind of this error.
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::InvalidAddress { .. } => GatewayErrorKind::InvalidAddress,
            Self::UnauthorizedMethod(_) => GatewayErrorKind::UnauthorizedMethod,
            Self::TooManyParams { .. } => GatewayErrorKind::TooManyParams,
            Self::UnsupportedParamType { .. } => GatewayErrorKind::UnsupportedParamType,
            Self::Timeout(_) => GatewayErrorKind::Timeout,
            Self::TransportFailure(_) => GatewayErrorKind::TransportFailure,
            Self::UnknownAction(_) => GatewayErrorKind::UnknownAction,
        }
    }
}

impl ErrorCode for GatewayError {
    fn code(&self) -> &'static str {
        self.kind().as_str()
    }
}

impl From<RpcError> for GatewayError {
    fn from(e: RpcError) -> Self {
        match e {
            RpcError::Timeout(ms) => Self::Timeout(ms),
            other => Self::TransportFailure(other.to_string()),
        }
    }
}

/// Errors returned by the upstream blockchain RPC client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The request did not complete within the configured bound.
    #[error("request timed out after {0} ms")]
    Timeout(u64),
    /// The HTTP exchange itself failed (connect, TLS, I/O).
    #[error("transport error: {0}")]
    Transport(String),
    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP status {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: u16,
        /// A short snippet of the response body.
        body: String,
    },
    /// The endpoint answered with a JSON-RPC error object or `ok: false`.
    #[error("remote error: {0}")]
    Remote(String),
    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ErrorCode for RpcError {
    fn code(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "RPC_TIMEOUT",
            Self::Transport(_) => "RPC_TRANSPORT",
            Self::Status { .. } => "RPC_HTTP_STATUS",
            Self::Remote(_) => "RPC_REMOTE",
            Self::Malformed(_) => "RPC_MALFORMED",
        }
    }
}

/// Errors from the shared key/value store backing the UI bridge.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store backend could not be reached or rejected the operation.
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl ErrorCode for StoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Backend(_) => "STORE_BACKEND_ERROR",
        }
    }
}

/// Errors from the Observation/Control Bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The control command failed field-level validation.
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    /// The command could not be serialized or a stored value could not be decoded.
    #[error("Codec error: {0}")]
    Codec(String),
    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for BridgeError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidCommand(_) => "BRIDGE_INVALID_COMMAND",
            Self::Codec(_) => "BRIDGE_CODEC_ERROR",
            Self::Store(e) => e.code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_codes_match_serialized_kind() {
        let all = [
            GatewayErrorKind::InvalidAddress,
            GatewayErrorKind::UnauthorizedMethod,
            GatewayErrorKind::TooManyParams,
            GatewayErrorKind::UnsupportedParamType,
            GatewayErrorKind::Timeout,
            GatewayErrorKind::TransportFailure,
            GatewayErrorKind::UnknownAction,
        ];
        for kind in all {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn rpc_timeout_maps_to_gateway_timeout() {
        let err: GatewayError = RpcError::Timeout(10_000).into();
        assert_eq!(err.kind(), GatewayErrorKind::Timeout);

        let err: GatewayError = RpcError::Status {
            status: 502,
            body: "bad gateway".into(),
        }
        .into();
        assert_eq!(err.kind(), GatewayErrorKind::TransportFailure);
        assert!(err.to_string().contains("502"));
    }
}
