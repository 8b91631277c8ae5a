//! Relays wallet transaction requests from the bus to an executor.
//!
//! Headless clients have no browser wallet listening for
//! `executeCryptoTransaction`. The relay fills that role: it runs each request
//! through a [`TransactionExecutor`] and publishes the outcome back on the bus.

use crate::engine::event_bus::EventBus;
use async_trait::async_trait;
use orderflow_types::{truncate_id, MarketEvent, NetworkType, WalletEvent};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// A transaction the wallet is asked to execute.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRequest {
	pub order_id: String,
	pub network: NetworkType,
	pub instructions: Value,
	pub metadata: Value,
}

/// Signs and submits payment transactions.
#[async_trait]
pub trait TransactionExecutor: Send + Sync {
	/// Returns the wallet payload on success (a hash/signature string or an
	/// object carrying one) or the wallet's error message.
	async fn execute(&self, request: TransactionRequest) -> Result<Value, String>;
}

/// Background task bridging bus requests to an executor.
pub struct TransactionRelay;

impl TransactionRelay {
	/// Subscribes to the bus and serves requests until the returned handle is aborted.
	///
	/// The task holds its own bus clone, so dropping the caller's bus does not stop it.
	///
	/// Requests are handled one at a time, in publish order.
	pub fn spawn(bus: EventBus, executor: Arc<dyn TransactionExecutor>) -> JoinHandle<()> {
		let mut events = bus.subscribe();

		tokio::spawn(async move {
			loop {
				let event = match events.recv().await {
					Ok(event) => event,
					Err(RecvError::Lagged(skipped)) => {
						tracing::warn!(skipped, "Transaction relay lagged behind the bus");
						continue;
					},
					Err(RecvError::Closed) => break,
				};

				let MarketEvent::Wallet(WalletEvent::ExecuteTransaction {
					order_id,
					network,
					instructions,
					metadata,
				}) = event
				else {
					continue;
				};

				tracing::info!(order_id = %truncate_id(&order_id), %network, "Executing wallet transaction");
				let request = TransactionRequest {
					order_id: order_id.clone(),
					network,
					instructions,
					metadata,
				};
				let reply = match executor.execute(request).await {
					Ok(result) => WalletEvent::TransactionComplete {
						order_id,
						network,
						result,
					},
					Err(error) => WalletEvent::TransactionError {
						order_id,
						network,
						error,
					},
				};
				bus.publish(MarketEvent::Wallet(reply));
			}
		})
	}
}
