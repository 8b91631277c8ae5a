//! Correlation bridge between payment instructions and wallet transactions.
//!
//! The bridge asks the wallet integration to execute a transaction by publishing
//! an `executeCryptoTransaction` event, then waits for the matching
//! `cryptoTransactionComplete` or `cryptoTransactionError` reply. Replies are
//! matched on the (order id, network) pair; anything else is ignored.

use crate::engine::event_bus::{EventBus, ListenerId};
use orderflow_types::{
	truncate_id, MarketEvent, NetworkType, TransactionResult, WalletEvent,
	CRYPTO_TRANSACTION_COMPLETE, CRYPTO_TRANSACTION_ERROR,
};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::instrument;

/// Errors reported by the wallet side of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
	/// The wallet reported a failure, already normalized for display.
	#[error("{0}")]
	Transaction(String),
	/// No reply arrived within the configured timeout.
	#[error("Timed out waiting for the wallet transaction")]
	Timeout,
	/// The reply channel closed without a result.
	#[error("Wallet transaction channel closed")]
	Closed,
}

const INSUFFICIENT_BALANCE_CODE: &str = "Error Number: 3012";

/// Maps raw wallet error messages to the text shown to the user.
pub fn normalize_transaction_error(message: &str) -> String {
	if message.contains(INSUFFICIENT_BALANCE_CODE) {
		"Insufficient balance or token not found".to_string()
	} else if message.trim().is_empty() {
		"Transaction failed".to_string()
	} else {
		message.to_string()
	}
}

type Reply = Result<TransactionResult, BridgeError>;

/// One-shot reply slot registered on the bus for a single transaction.
///
/// The first matching reply wins. Dropping the rendezvous removes both listeners.
struct Rendezvous {
	bus: EventBus,
	complete: ListenerId,
	error: ListenerId,
}

impl Rendezvous {
	fn register(bus: &EventBus, order_id: &str, network: NetworkType) -> (Self, oneshot::Receiver<Reply>) {
		let (tx, rx) = oneshot::channel();
		let slot = Arc::new(Mutex::new(Some(tx)));

		let resolve = move |reply: Reply| {
			let sender = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
			if let Some(sender) = sender {
				let _ = sender.send(reply);
			}
		};
		let on_error = resolve.clone();

		let expected = order_id.to_string();
		let complete = bus.on(CRYPTO_TRANSACTION_COMPLETE, move |event| {
			if let MarketEvent::Wallet(WalletEvent::TransactionComplete {
				order_id,
				network: reported,
				result,
			}) = event
			{
				if *order_id == expected && *reported == network {
					resolve(TransactionResult::from_wallet_payload(result.clone()).ok_or_else(
						|| BridgeError::Transaction("Wallet did not report a transaction id".into()),
					));
				}
			}
		});

		let expected = order_id.to_string();
		let error = bus.on(CRYPTO_TRANSACTION_ERROR, move |event| {
			if let MarketEvent::Wallet(WalletEvent::TransactionError {
				order_id,
				network: reported,
				error,
			}) = event
			{
				if *order_id == expected && *reported == network {
					on_error(Err(BridgeError::Transaction(normalize_transaction_error(error))));
				}
			}
		});

		(
			Self {
				bus: bus.clone(),
				complete,
				error,
			},
			rx,
		)
	}
}

impl Drop for Rendezvous {
	fn drop(&mut self) {
		self.bus.off(CRYPTO_TRANSACTION_COMPLETE, self.complete);
		self.bus.off(CRYPTO_TRANSACTION_ERROR, self.error);
	}
}

/// Runs payment transactions through the wallet integration listening on the bus.
#[derive(Clone)]
pub struct CryptoBridge {
	bus: EventBus,
	timeout: Option<Duration>,
}

impl CryptoBridge {
	/// Creates a bridge on `bus`. `None` waits for the wallet indefinitely.
	pub fn new(bus: EventBus, timeout: Option<Duration>) -> Self {
		Self { bus, timeout }
	}

	pub fn timeout(&self) -> Option<Duration> {
		self.timeout
	}

	/// Publishes a transaction request and waits for its correlated reply.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), network = %network))]
	pub async fn execute_and_await(
		&self,
		order_id: &str,
		network: NetworkType,
		instructions: Value,
		metadata: Value,
	) -> Result<TransactionResult, BridgeError> {
		let (rendezvous, reply) = Rendezvous::register(&self.bus, order_id, network);

		tracing::debug!("Requesting wallet transaction");
		self.bus.publish(MarketEvent::Wallet(WalletEvent::ExecuteTransaction {
			order_id: order_id.to_string(),
			network,
			instructions,
			metadata,
		}));

		let outcome = match self.timeout {
			Some(limit) => match tokio::time::timeout(limit, reply).await {
				Ok(received) => received.map_err(|_| BridgeError::Closed)?,
				Err(_) => Err(BridgeError::Timeout),
			},
			None => reply.await.map_err(|_| BridgeError::Closed)?,
		};
		drop(rendezvous);

		match &outcome {
			Ok(result) => {
				tracing::info!(transaction_id = %truncate_id(&result.transaction_id), "Wallet transaction settled")
			},
			Err(e) => tracing::warn!(error = %e, "Wallet transaction failed"),
		}
		outcome
	}
}
