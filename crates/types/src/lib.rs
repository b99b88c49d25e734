// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Aether Runtime Types
//!
//! The foundational library for the Aether runtime, containing the request and
//! result types exchanged with the agent, the error taxonomy of the Action
//! Gateway and the Observation/Control Bridge, and the configuration objects.
//!
//! ## Architectural Role
//!
//! As the base crate, `aether-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. This keeps the wire
//! shapes (`ActionRequest`, `ActionResult`, `ControlCommand`) defined in one
//! place for both the server and the client.

/// Agent-facing request/response structures for the TON gateway and the UI bridge.
pub mod app;
/// Runtime configuration structures (`RuntimeConfig`, `TonConfig`, `BridgeConfig`).
pub mod config;
/// A unified set of all error types used across the runtime.
pub mod error;
