//! Core order-flow engine for storefront clients.
//!
//! This crate ties the pieces together: the [`OrderCoordinator`] runs order
//! operations end to end, the [`RequestLedger`] collapses duplicate requests,
//! the [`CryptoBridge`] hands payment transactions to the wallet over the
//! [`EventBus`], and the builder wires everything from configuration.

pub mod bridge;
pub mod builder;
pub mod engine;
pub mod notify;
pub mod state;
pub mod wallet;

pub use bridge::{normalize_transaction_error, BridgeError, CryptoBridge};
pub use builder::{BuilderError, CoordinatorBuilder};
pub use engine::event_bus::{EventBus, ListenerId};
pub use engine::{OperationError, OrderCoordinator};
pub use notify::{BusNotifier, LogNotifier, Notifier};
pub use state::{Begin, InFlightRequest, OperationOutcome, RequestHandle, RequestLedger};
pub use wallet::relay::{TransactionExecutor, TransactionRelay, TransactionRequest};
pub use wallet::{StaticWallet, WalletConnection, WalletInterface};
