// Path: crates/services/src/lib.rs
#![forbid(unsafe_code)]
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

//! # Aether Services
//!
//! The two trust boundaries of the runtime:
//!
//! * [`ton`]: the Action Gateway. Free-form agent requests are validated,
//!   whitelisted and encoded before a single read-only JSON-RPC call is made.
//! * [`bridge`]: the Observation/Control Bridge. Commands and snapshots are
//!   exchanged with the UI renderer through two last-write-wins slots of an
//!   injected key/value store.

pub mod bridge;
pub mod ton;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
