//! Event types published on the storefront event bus.
//!
//! Events are grouped by the component that produces them. Every event has a
//! stable wire name (e.g. "acceptingOrder", "cryptoTransactionComplete") that
//! listeners subscribe to.

use crate::{NetworkType, OperationKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Main event type encompassing all order-flow events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
	/// Order operation lifecycle transitions.
	Order(OrderEvent),
	/// Requests to and replies from the wallet integration.
	Wallet(WalletEvent),
	/// Messages meant for the user.
	Notification(Notification),
}

/// Lifecycle transitions of an order operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderEvent {
	/// The operation has started.
	Pending {
		kind: OperationKind,
		order_id: String,
	},
	/// The action endpoint accepted the operation.
	Completed {
		kind: OperationKind,
		order_id: String,
		result: Value,
	},
	/// The operation failed at some step.
	Failed {
		kind: OperationKind,
		order_id: String,
		reason: String,
	},
}

/// Wallet transaction protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WalletEvent {
	/// Asks the wallet integration to sign and submit a transaction.
	ExecuteTransaction {
		order_id: String,
		network: NetworkType,
		instructions: Value,
		metadata: Value,
	},
	/// The wallet reports a settled transaction.
	TransactionComplete {
		order_id: String,
		network: NetworkType,
		result: Value,
	},
	/// The wallet reports a failed transaction.
	TransactionError {
		order_id: String,
		network: NetworkType,
		error: String,
	},
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
	Success,
	Warning,
	Error,
}

/// A message for the user, e.g. rendered as a toast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
	pub level: NotificationLevel,
	pub header: Option<String>,
	pub message: String,
}

impl Notification {
	pub fn error(header: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			level: NotificationLevel::Error,
			header: Some(header.into()),
			message: message.into(),
		}
	}

	pub fn warning(message: impl Into<String>) -> Self {
		Self {
			level: NotificationLevel::Warning,
			header: None,
			message: message.into(),
		}
	}
}

pub const EXECUTE_CRYPTO_TRANSACTION: &str = "executeCryptoTransaction";
pub const CRYPTO_TRANSACTION_COMPLETE: &str = "cryptoTransactionComplete";
pub const CRYPTO_TRANSACTION_ERROR: &str = "cryptoTransactionError";
pub const NOTIFICATION: &str = "notification";

impl MarketEvent {
	/// Wire name listeners subscribe to.
	pub fn name(&self) -> &'static str {
		match self {
			MarketEvent::Order(OrderEvent::Pending { kind, .. }) => kind.pending_event(),
			MarketEvent::Order(OrderEvent::Completed { kind, .. }) => kind.complete_event(),
			MarketEvent::Order(OrderEvent::Failed { kind, .. }) => kind.fail_event(),
			MarketEvent::Wallet(WalletEvent::ExecuteTransaction { .. }) => EXECUTE_CRYPTO_TRANSACTION,
			MarketEvent::Wallet(WalletEvent::TransactionComplete { .. }) => {
				CRYPTO_TRANSACTION_COMPLETE
			},
			MarketEvent::Wallet(WalletEvent::TransactionError { .. }) => CRYPTO_TRANSACTION_ERROR,
			MarketEvent::Notification(_) => NOTIFICATION,
		}
	}

	/// Order the event refers to, if any.
	pub fn order_id(&self) -> Option<&str> {
		match self {
			MarketEvent::Order(OrderEvent::Pending { order_id, .. })
			| MarketEvent::Order(OrderEvent::Completed { order_id, .. })
			| MarketEvent::Order(OrderEvent::Failed { order_id, .. })
			| MarketEvent::Wallet(WalletEvent::ExecuteTransaction { order_id, .. })
			| MarketEvent::Wallet(WalletEvent::TransactionComplete { order_id, .. })
			| MarketEvent::Wallet(WalletEvent::TransactionError { order_id, .. }) => Some(order_id),
			MarketEvent::Notification(_) => None,
		}
	}
}
