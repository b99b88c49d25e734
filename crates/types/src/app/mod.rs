// Path: crates/types/src/app/mod.rs
//! Agent-facing data structures.

/// Requests to and results from the TON Action Gateway.
pub mod action;
/// UI control commands and observation snapshots.
pub mod control;

pub use action::*;
pub use control::*;
