// Path: crates/services/src/testing.rs
//! In-process fakes for unit and end-to-end tests.

use crate::ton::client::{AddressInfo, TonRpc};
use aether_types::app::StackEntry;
use aether_types::error::RpcError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone)]
enum Behaviour {
    Answer,
    Timeout,
    Transport(String),
}

/// A [`TonRpc`] that answers from canned data and counts every call it receives.
#[derive(Debug)]
pub struct FakeTonRpc {
    calls: AtomicUsize,
    balance_nano: u128,
    get_method_result: Value,
    behaviour: Behaviour,
    last_stack: Mutex<Option<Vec<StackEntry>>>,
}

impl Default for FakeTonRpc {
    fn default() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            balance_nano: 0,
            get_method_result: json!({"stack": [], "exit_code": 0}),
            behaviour: Behaviour::Answer,
            last_stack: Mutex::new(None),
        }
    }
}

impl FakeTonRpc {
    pub fn with_balance_nano(mut self, nano: u128) -> Self {
        self.balance_nano = nano;
        self
    }

    pub fn with_get_method_result(mut self, result: Value) -> Self {
        self.get_method_result = result;
        self
    }

    /// Every call fails with [`RpcError::Timeout`].
    pub fn timing_out(mut self) -> Self {
        self.behaviour = Behaviour::Timeout;
        self
    }

    /// Every call fails with [`RpcError::Transport`].
    pub fn failing(mut self, msg: impl Into<String>) -> Self {
        self.behaviour = Behaviour::Transport(msg.into());
        self
    }

    /// Number of calls received so far, of either kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The stack passed to the most recent `run_get_method`.
    pub fn last_stack(&self) -> Option<Vec<StackEntry>> {
        self.last_stack.lock().clone()
    }

    fn enter(&self) -> Result<(), RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Behaviour::Answer => Ok(()),
            Behaviour::Timeout => Err(RpcError::Timeout(10_000)),
            Behaviour::Transport(msg) => Err(RpcError::Transport(msg.clone())),
        }
    }
}

#[async_trait]
impl TonRpc for FakeTonRpc {
    async fn fetch_address_info(&self, _address: &str) -> Result<AddressInfo, RpcError> {
        self.enter()?;
        Ok(AddressInfo {
            balance_nano: self.balance_nano,
            state: Some("active".into()),
        })
    }

    async fn run_get_method(
        &self,
        _address: &str,
        _method: &str,
        stack: &[StackEntry],
    ) -> Result<Value, RpcError> {
        *self.last_stack.lock() = Some(stack.to_vec());
        self.enter()?;
        Ok(self.get_method_result.clone())
    }
}
