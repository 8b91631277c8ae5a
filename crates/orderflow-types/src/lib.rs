//! Common types for the orderflow system.
//!
//! This crate defines the data model shared by every orderflow component:
//! operation kinds and their payloads, payment instructions, wallet results,
//! bus events and the payment network registry.

/// Bus events for lifecycle, wallet and notification traffic.
pub mod events;
/// Payment networks, chains and the token registry.
pub mod networks;
/// Order operations, their payloads and endpoints.
pub mod order;
/// Payment instructions and transaction results.
pub mod payment;
/// Small helpers for log formatting.
pub mod utils;
/// Payload validation errors.
pub mod validation;

pub use events::*;
pub use networks::{default_tokens, is_fiat_coin, Chain, NetworkType, TokenConfig, TokenRegistry};
pub use order::*;
pub use payment::*;
pub use utils::truncate_id;
pub use validation::ValidationError;

/// Result payload returned by an action endpoint.
pub type ActionResult = serde_json::Value;
