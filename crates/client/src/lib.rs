// Path: crates/client/src/lib.rs
//! # Aether Client Crate Lints
//!
//! Panics are disallowed in non-test code; every failure is returned to the caller.
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

//! # Aether Client
//!
//! A typed client for the runtime's HTTP surface, used by agents and by the
//! end-to-end tests. The `/observe` stream is a plain WebSocket; use
//! [`RuntimeClient::observe_url`] with any WebSocket client.

pub mod runtime_client;

pub use runtime_client::RuntimeClient;
