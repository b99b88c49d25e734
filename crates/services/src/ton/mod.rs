// Path: crates/services/src/ton/mod.rs
//! The TON Action Gateway.

pub mod client;
pub mod encoder;
pub mod gateway;
pub mod rules;

pub use client::{AddressInfo, TonRpc, ToncenterClient};
pub use gateway::ActionGateway;
pub use rules::{MethodWhitelist, TonAddress};
