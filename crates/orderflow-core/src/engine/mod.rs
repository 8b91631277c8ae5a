//! Order operation coordinator.
//!
//! Every order operation follows the same flow: validate, claim the ledger slot,
//! optionally settle a payment (wallet check, instructions pre-flight, wallet
//! transaction through the bridge), commit the action endpoint, then release the
//! slot and report the outcome on the bus.

pub mod event_bus;
pub mod operations;

use crate::bridge::{BridgeError, CryptoBridge};
use crate::notify::Notifier;
use crate::state::{Begin, OperationOutcome, RequestHandle, RequestLedger};
use crate::wallet::WalletInterface;
use event_bus::EventBus;
use orderflow_api::{post_as, ApiError, OrderApiInterface};
use orderflow_types::{
	is_fiat_coin, truncate_id, InstructionsDecision, MarketEvent, NetworkType, Notification,
	OperationKind, OperationSpec, OrderEvent, OrderOperation, PaymentInstructions, TokenRegistry,
	ValidationError,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// Errors an order operation can end with.
///
/// The display text is the user-facing failure message carried by `…Fail`
/// events and error notifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
	#[error("{0}")]
	Validation(#[from] ValidationError),
	#[error("{0}")]
	WalletNotConnected(String),
	#[error("Please switch to {required} network, current network is {current}")]
	NetworkMismatch {
		required: NetworkType,
		current: String,
	},
	/// The backend refused the request or could not be reached.
	#[error("{reason}")]
	Server { status: Option<u16>, reason: String },
	#[error("{0}")]
	Transaction(String),
	#[error("Timed out waiting for the wallet transaction")]
	Timeout,
	/// Accept and reject cannot both be in flight for one order.
	#[error("Order {order_id} already has a {in_flight} request in flight")]
	Conflict {
		order_id: String,
		in_flight: OperationKind,
	},
	#[error("Operation aborted")]
	Aborted,
	#[error("Internal error: {0}")]
	Internal(String),
}

impl From<ApiError> for OperationError {
	fn from(err: ApiError) -> Self {
		match err {
			ApiError::Server { status, reason } => OperationError::Server {
				status: Some(status),
				reason,
			},
			ApiError::Network(_) => OperationError::Server {
				status: None,
				reason: err.to_string(),
			},
			ApiError::Decode(_) | ApiError::Configuration(_) => {
				OperationError::Internal(err.to_string())
			},
		}
	}
}

impl From<BridgeError> for OperationError {
	fn from(err: BridgeError) -> Self {
		match err {
			BridgeError::Transaction(message) => OperationError::Transaction(message),
			BridgeError::Timeout => OperationError::Timeout,
			BridgeError::Closed => OperationError::Internal(err.to_string()),
		}
	}
}

const CONNECT_WALLET: &str = "Please connect your wallet first";
const WALLET_ADDRESS_MISSING: &str = "Wallet address not found";

/// Owns a request's ledger slot and its lifecycle events.
///
/// The guard is created with the request and moved into its task, so it is
/// dropped even when the task is aborted before its first poll. Dropping an
/// unfinished guard settles the slot; if the pending event already went out it
/// also reports the operation as aborted.
struct SettleGuard {
	ledger: Arc<RequestLedger>,
	bus: EventBus,
	notifier: Arc<dyn Notifier>,
	order_id: String,
	kind: OperationKind,
	request_id: Uuid,
	announced: bool,
	finished: bool,
}

impl SettleGuard {
	fn announce(&mut self) {
		self.announced = true;
		self.bus.publish(MarketEvent::Order(OrderEvent::Pending {
			kind: self.kind,
			order_id: self.order_id.clone(),
		}));
	}

	/// Settles the slot, then emits the terminal event and, on failure, an
	/// error notification.
	fn finish(&mut self, outcome: &OperationOutcome) {
		self.finished = true;
		self.ledger
			.settle_request(&self.order_id, self.kind, self.request_id);

		let event = match outcome {
			Ok(result) => OrderEvent::Completed {
				kind: self.kind,
				order_id: self.order_id.clone(),
				result: result.clone(),
			},
			Err(e) => OrderEvent::Failed {
				kind: self.kind,
				order_id: self.order_id.clone(),
				reason: e.to_string(),
			},
		};
		self.bus.publish(MarketEvent::Order(event));

		if let Err(e) = outcome {
			self.notifier
				.notify(Notification::error(self.kind.failure_heading(), e.to_string()));
		}
	}
}

impl Drop for SettleGuard {
	fn drop(&mut self) {
		if self.finished {
			return;
		}
		tracing::warn!(order_id = %truncate_id(&self.order_id), kind = %self.kind, "Order operation aborted");
		if self.announced {
			self.finish(&Err(OperationError::Aborted));
		} else {
			self.finished = true;
			self.ledger
				.settle_request(&self.order_id, self.kind, self.request_id);
		}
	}
}

/// Drives order operations against the backend, the wallet and the event bus.
///
/// Cloning is cheap; clones share the ledger, bus and collaborators.
#[derive(Clone)]
pub struct OrderCoordinator {
	api: Arc<dyn OrderApiInterface>,
	wallet: Arc<dyn WalletInterface>,
	notifier: Arc<dyn Notifier>,
	bus: EventBus,
	bridge: CryptoBridge,
	ledger: Arc<RequestLedger>,
	tokens: Arc<TokenRegistry>,
}

impl OrderCoordinator {
	/// Creates a coordinator. `transaction_timeout` bounds wallet waits; `None`
	/// waits indefinitely.
	pub fn new(
		api: Arc<dyn OrderApiInterface>,
		wallet: Arc<dyn WalletInterface>,
		notifier: Arc<dyn Notifier>,
		bus: EventBus,
		tokens: TokenRegistry,
		transaction_timeout: Option<Duration>,
	) -> Self {
		Self {
			api,
			wallet,
			notifier,
			bridge: CryptoBridge::new(bus.clone(), transaction_timeout),
			bus,
			ledger: Arc::new(RequestLedger::new()),
			tokens: Arc::new(tokens),
		}
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.bus
	}

	pub fn ledger(&self) -> &RequestLedger {
		&self.ledger
	}

	/// True while a request of exactly `kind` is in flight for the order.
	pub fn is_pending(&self, order_id: &str, kind: OperationKind) -> bool {
		self.ledger.is_pending(order_id, kind)
	}

	/// Validates `operation` and runs it for `order_id`.
	pub fn submit(
		&self,
		order_id: &str,
		payment_coin: Option<&str>,
		operation: OrderOperation,
	) -> Result<RequestHandle, OperationError> {
		let spec = operation.into_spec(order_id, payment_coin)?;
		self.run(spec)
	}

	/// Starts an operation, or joins the one already in flight for its slot.
	///
	/// Must be called from within a tokio runtime. Validation errors and
	/// conflicts are returned immediately without touching the ledger; every
	/// other failure is reported through the returned handle.
	pub fn run(&self, spec: OperationSpec) -> Result<RequestHandle, OperationError> {
		if spec.order_id.trim().is_empty() {
			return Err(ValidationError::MissingOrderId.into());
		}

		let order_id = spec.order_id.clone();
		let kind = spec.kind;
		// The task settles through the same shard lock, so it cannot observe the
		// slot before the entry is inserted.
		let begin = self.ledger.begin(&order_id, kind, |request_id| {
			let guard = SettleGuard {
				ledger: self.ledger.clone(),
				bus: self.bus.clone(),
				notifier: self.notifier.clone(),
				order_id: order_id.clone(),
				kind,
				request_id,
				announced: false,
				finished: false,
			};
			let coordinator = self.clone();
			RequestHandle::spawn(request_id, &order_id, kind, async move {
				coordinator.drive(guard, spec).await
			})
		});

		match begin {
			Begin::Started(handle) => Ok(handle),
			Begin::Joined(existing) if existing.kind() == kind => {
				tracing::debug!(order_id = %truncate_id(&order_id), %kind, "Joining in-flight request");
				Ok(existing)
			},
			Begin::Joined(existing) => Err(OperationError::Conflict {
				order_id,
				in_flight: existing.kind(),
			}),
		}
	}

	#[instrument(skip_all, fields(order_id = %truncate_id(&spec.order_id), kind = %spec.kind))]
	async fn drive(self, mut guard: SettleGuard, spec: OperationSpec) -> OperationOutcome {
		tracing::info!("Starting order operation");
		guard.announce();

		let outcome = self.execute(&spec).await;
		match &outcome {
			Ok(_) => tracing::info!("Order operation completed"),
			Err(e) => tracing::warn!(error = %e, "Order operation failed"),
		}
		guard.finish(&outcome);
		outcome
	}

	async fn execute(&self, spec: &OperationSpec) -> OperationOutcome {
		let mut action_data = spec.action_data.clone();

		if let Some(instructions_path) = spec.instructions_path.as_deref() {
			if is_fiat_coin(spec.payment_coin.as_deref()) {
				tracing::debug!("Fiat payment, skipping payment instructions");
			} else if let Some(transaction_id) = self.settle_payment(spec, instructions_path).await? {
				action_data.insert("transactionID".into(), json!(transaction_id));
			}
		}

		let result = self
			.api
			.post(&spec.action_path, Value::Object(action_data))
			.await?;
		Ok(result)
	}

	/// Runs the payment pre-flight and, if required, the wallet transaction.
	///
	/// Returns the transaction id to commit with the action, if any.
	#[instrument(skip_all)]
	async fn settle_payment(
		&self,
		spec: &OperationSpec,
		instructions_path: &str,
	) -> Result<Option<String>, OperationError> {
		let required = spec
			.payment_coin
			.as_deref()
			.and_then(|coin| self.tokens.network_for(coin));
		let (address, wallet_network) = self.check_wallet(required).await?;

		let mut body = Map::new();
		body.insert("orderID".into(), json!(spec.order_id));
		body.insert("initiatorAddress".into(), json!(address));
		body.extend(spec.instruction_data.clone());

		let response: PaymentInstructions =
			post_as(self.api.as_ref(), instructions_path, Value::Object(body)).await?;

		match response.decision() {
			InstructionsDecision::NotRequired => {
				tracing::debug!("No payment required");
				Ok(None)
			},
			InstructionsDecision::Execute {
				instructions,
				payment_chain,
			} => {
				let network = payment_chain
					.as_deref()
					.and_then(|chain| self.tokens.network_for(chain))
					.or(wallet_network)
					.ok_or_else(|| {
						OperationError::Internal("Unable to determine the payment network".into())
					})?;
				let metadata = serde_json::to_value(&response)
					.map_err(|e| OperationError::Internal(e.to_string()))?;

				let transaction = self
					.bridge
					.execute_and_await(&spec.order_id, network, instructions, metadata)
					.await?;
				Ok(Some(transaction.transaction_id))
			},
			InstructionsDecision::Missing => Err(OperationError::Server {
				status: None,
				reason: "Payment instructions missing from response".into(),
			}),
		}
	}

	/// Confirms the wallet is usable for a payment on `required`.
	async fn check_wallet(
		&self,
		required: Option<NetworkType>,
	) -> Result<(String, Option<NetworkType>), OperationError> {
		let connection = self.wallet.connection(required).await;

		if !connection.connected {
			self.notifier.notify(Notification::warning(CONNECT_WALLET));
			return Err(OperationError::WalletNotConnected(CONNECT_WALLET.into()));
		}

		let Some(address) = connection.address.filter(|address| !address.is_empty()) else {
			return Err(OperationError::WalletNotConnected(
				WALLET_ADDRESS_MISSING.into(),
			));
		};

		if let Some(required) = required {
			if connection.network != Some(required) {
				let err = OperationError::NetworkMismatch {
					required,
					current: connection
						.network
						.map(|network| network.to_string())
						.unwrap_or_else(|| "unknown".into()),
				};
				self.notifier.notify(Notification::warning(err.to_string()));
				return Err(err);
			}
		}

		Ok((address, connection.network))
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::wallet::{MockWalletInterface, WalletConnection};
	use async_trait::async_trait;
	use orderflow_types::{
		NotificationLevel, WalletEvent, CRYPTO_TRANSACTION_COMPLETE, CRYPTO_TRANSACTION_ERROR,
		EXECUTE_CRYPTO_TRANSACTION,
	};
	use std::collections::HashMap;
	use std::sync::Mutex;
	use tokio::sync::{broadcast, Semaphore};

	/// Backend fake answering per path and recording every call.
	///
	/// Action endpoints (anything outside `instructions/`) wait on the gate when
	/// one is set, which keeps a request in flight until the test releases it.
	#[derive(Default)]
	pub(crate) struct ScriptedApi {
		calls: Mutex<Vec<(String, Value)>>,
		responses: Mutex<HashMap<String, Result<Value, ApiError>>>,
		gate: Option<Arc<Semaphore>>,
	}

	impl ScriptedApi {
		pub(crate) fn gated(gate: Arc<Semaphore>) -> Self {
			Self {
				gate: Some(gate),
				..Default::default()
			}
		}

		pub(crate) fn respond(self, path: &str, response: Result<Value, ApiError>) -> Self {
			self.responses.lock().unwrap().insert(path.into(), response);
			self
		}

		pub(crate) fn calls(&self) -> Vec<(String, Value)> {
			self.calls.lock().unwrap().clone()
		}

		pub(crate) fn paths(&self) -> Vec<String> {
			self.calls().into_iter().map(|(path, _)| path).collect()
		}
	}

	#[async_trait]
	impl OrderApiInterface for ScriptedApi {
		async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
			self.calls.lock().unwrap().push((path.to_string(), body));

			let is_action = !path.starts_with("instructions/");
			if let (true, Some(gate)) = (is_action, &self.gate) {
				let _permit = gate.acquire().await.unwrap();
			}

			let scripted = self.responses.lock().unwrap().get(path).cloned();
			scripted.unwrap_or_else(|| {
				if is_action {
					Ok(json!({ "status": "ok" }))
				} else {
					Ok(json!({ "hasInstructions": false }))
				}
			})
		}
	}

	#[derive(Default)]
	pub(crate) struct RecordingNotifier {
		seen: Mutex<Vec<Notification>>,
	}

	impl RecordingNotifier {
		pub(crate) fn seen(&self) -> Vec<Notification> {
			self.seen.lock().unwrap().clone()
		}
	}

	impl Notifier for RecordingNotifier {
		fn notify(&self, notification: Notification) {
			self.seen.lock().unwrap().push(notification);
		}
	}

	pub(crate) fn wallet_on(network: NetworkType) -> MockWalletInterface {
		let mut wallet = MockWalletInterface::new();
		wallet
			.expect_connection()
			.returning(move |_| WalletConnection::connected("0xbuyer", network));
		wallet
	}

	pub(crate) fn untouched_wallet() -> MockWalletInterface {
		let mut wallet = MockWalletInterface::new();
		wallet.expect_connection().never();
		wallet
	}

	pub(crate) struct Harness {
		pub(crate) coordinator: OrderCoordinator,
		pub(crate) api: Arc<ScriptedApi>,
		pub(crate) notifier: Arc<RecordingNotifier>,
		pub(crate) events: broadcast::Receiver<MarketEvent>,
	}

	impl Harness {
		pub(crate) fn new(api: ScriptedApi, wallet: MockWalletInterface) -> Self {
			let api = Arc::new(api);
			let notifier = Arc::new(RecordingNotifier::default());
			let bus = EventBus::default();
			let events = bus.subscribe();
			let coordinator = OrderCoordinator::new(
				api.clone(),
				Arc::new(wallet),
				notifier.clone(),
				bus,
				TokenRegistry::default(),
				Some(Duration::from_secs(5)),
			);
			Self {
				coordinator,
				api,
				notifier,
				events,
			}
		}

		/// Names of the events published so far.
		pub(crate) fn event_names(&mut self) -> Vec<&'static str> {
			let mut names = Vec::new();
			while let Ok(event) = self.events.try_recv() {
				names.push(event.name());
			}
			names
		}

		/// Answers every wallet transaction request with `reply`.
		pub(crate) fn wallet_replies(&self, reply: fn(&str, NetworkType) -> WalletEvent) {
			let bus = self.coordinator.event_bus().clone();
			self.coordinator
				.event_bus()
				.on(EXECUTE_CRYPTO_TRANSACTION, move |event| {
					if let MarketEvent::Wallet(WalletEvent::ExecuteTransaction { order_id, network, .. }) =
						event
					{
						bus.publish(MarketEvent::Wallet(reply(order_id, *network)));
					}
				});
		}
	}

	fn escrow_instructions() -> Value {
		json!({
			"hasInstructions": true,
			"instructions": { "to": "0xescrow", "amount": "25000000" },
			"paymentChain": "ETHUSDT",
			"paymentAddress": "0xescrow"
		})
	}

	fn accept() -> OrderOperation {
		OrderOperation::Accept {
			payout_address: Some("0xpayout".into()),
		}
	}

	#[tokio::test]
	async fn test_accept_with_crypto_payment() {
		let api = ScriptedApi::default()
			.respond("instructions/order/confirm", Ok(escrow_instructions()))
			.respond("order/confirm", Ok(json!({ "status": "CONFIRMED" })));
		let mut harness = Harness::new(api, wallet_on(NetworkType::Ethereum));
		harness.wallet_replies(|order_id, network| WalletEvent::TransactionComplete {
			order_id: order_id.into(),
			network,
			result: json!("0xTXHASH"),
		});

		let handle = harness
			.coordinator
			.submit("orderA1", Some("ETHUSDT"), accept())
			.unwrap();
		let result = handle.await.unwrap();
		assert_eq!(result, json!({ "status": "CONFIRMED" }));

		let calls = harness.api.calls();
		assert_eq!(calls.len(), 2);
		assert_eq!(
			calls[0],
			(
				"instructions/order/confirm".to_string(),
				json!({
					"orderID": "orderA1",
					"initiatorAddress": "0xbuyer",
					"reject": false,
					"payoutAddress": "0xpayout"
				})
			)
		);
		assert_eq!(
			calls[1],
			(
				"order/confirm".to_string(),
				json!({
					"orderID": "orderA1",
					"reject": false,
					"payoutAddress": "0xpayout",
					"transactionID": "0xTXHASH"
				})
			)
		);

		assert_eq!(
			harness.event_names(),
			vec![
				"acceptingOrder",
				EXECUTE_CRYPTO_TRANSACTION,
				CRYPTO_TRANSACTION_COMPLETE,
				"acceptOrderComplete"
			]
		);
		assert!(!harness.coordinator.is_pending("orderA1", OperationKind::Accept));
		assert!(harness.coordinator.ledger().is_empty());
	}

	#[tokio::test]
	async fn test_cancel_without_instructions() {
		let mut harness = Harness::new(ScriptedApi::default(), wallet_on(NetworkType::Ethereum));

		let result = harness
			.coordinator
			.cancel_order("orderB2", Some("ETH"))
			.unwrap()
			.await
			.unwrap();
		assert_eq!(result, json!({ "status": "ok" }));

		assert_eq!(
			harness.api.calls(),
			vec![
				(
					"instructions/order/cancel".to_string(),
					json!({ "orderID": "orderB2", "initiatorAddress": "0xbuyer" })
				),
				("order/cancel".to_string(), json!({ "orderID": "orderB2" })),
			]
		);
		assert_eq!(
			harness.event_names(),
			vec!["cancelingOrder", "cancelOrderComplete"]
		);
	}

	#[tokio::test]
	async fn test_fiat_payment_skips_wallet_and_instructions() {
		let mut harness = Harness::new(ScriptedApi::default(), untouched_wallet());

		harness
			.coordinator
			.reject_order("orderF", Some("STRIPE"))
			.unwrap()
			.await
			.unwrap();

		assert_eq!(
			harness.api.calls(),
			vec![(
				"order/confirm".to_string(),
				json!({
					"orderID": "orderF",
					"reject": true,
					"payoutAddress": null,
					"transactionID": ""
				})
			)]
		);
		assert_eq!(harness.event_names(), vec!["rejectingOrder", "rejectOrderComplete"]);
	}

	#[tokio::test]
	async fn test_duplicate_accept_joins_in_flight_request() {
		let gate = Arc::new(Semaphore::new(0));
		let mut harness = Harness::new(ScriptedApi::gated(gate.clone()), untouched_wallet());

		let first = harness
			.coordinator
			.accept_order("orderC3", Some("STRIPE"), None)
			.unwrap();
		let second = harness
			.coordinator
			.accept_order("orderC3", Some("STRIPE"), None)
			.unwrap();

		assert!(first.same_request(&second));
		assert!(harness.coordinator.is_pending("orderC3", OperationKind::Accept));
		assert!(!harness.coordinator.is_pending("orderC3", OperationKind::Reject));

		gate.add_permits(1);
		assert_eq!(first.await, second.await);

		assert_eq!(harness.api.paths(), vec!["order/confirm"]);
		assert_eq!(
			harness.event_names(),
			vec!["acceptingOrder", "acceptOrderComplete"]
		);
		assert!(!harness.coordinator.is_pending("orderC3", OperationKind::Accept));
	}

	#[tokio::test]
	async fn test_reject_conflicts_with_pending_accept() {
		let gate = Arc::new(Semaphore::new(0));
		let harness = Harness::new(ScriptedApi::gated(gate.clone()), untouched_wallet());

		let accepting = harness
			.coordinator
			.accept_order("orderC3", Some("STRIPE"), None)
			.unwrap();
		let err = harness
			.coordinator
			.reject_order("orderC3", Some("STRIPE"))
			.unwrap_err();
		assert_eq!(
			err,
			OperationError::Conflict {
				order_id: "orderC3".into(),
				in_flight: OperationKind::Accept,
			}
		);

		gate.add_permits(1);
		accepting.await.unwrap();

		// once settled, a reject may start
		gate.add_permits(1);
		harness
			.coordinator
			.reject_order("orderC3", Some("STRIPE"))
			.unwrap()
			.await
			.unwrap();
	}

	#[tokio::test]
	async fn test_different_kinds_run_concurrently() {
		let gate = Arc::new(Semaphore::new(0));
		let harness = Harness::new(ScriptedApi::gated(gate.clone()), untouched_wallet());

		let fulfilling = harness
			.coordinator
			.submit(
				"orderD",
				None,
				OrderOperation::Fulfill(orderflow_types::FulfillmentRequest {
					local_pickup: true,
					note: Some("ready for pickup".into()),
					..Default::default()
				}),
			)
			.unwrap();
		let releasing = harness.coordinator.release_escrow("orderD").unwrap();

		assert!(harness.coordinator.is_pending("orderD", OperationKind::Fulfill));
		assert!(harness.coordinator.is_pending("orderD", OperationKind::ReleaseEscrow));

		gate.add_permits(2);
		fulfilling.await.unwrap();
		releasing.await.unwrap();

		let mut paths = harness.api.paths();
		paths.sort();
		assert_eq!(paths, vec!["dispute/releaseAfterTimeout", "order/fulfill"]);
	}

	#[tokio::test]
	async fn test_network_mismatch_fails_before_any_request() {
		let mut harness = Harness::new(ScriptedApi::default(), wallet_on(NetworkType::Ethereum));

		let err = harness
			.coordinator
			.accept_order("orderE", Some("SOLUSDC"), None)
			.unwrap()
			.await
			.unwrap_err();

		assert_eq!(
			err.to_string(),
			"Please switch to solana network, current network is ethereum"
		);
		assert!(harness.api.calls().is_empty());
		assert_eq!(harness.event_names(), vec!["acceptingOrder", "acceptOrderFail"]);

		let seen = harness.notifier.seen();
		assert_eq!(seen.len(), 2);
		assert_eq!(seen[0].level, NotificationLevel::Warning);
		assert_eq!(seen[1].level, NotificationLevel::Error);
		assert_eq!(seen[1].header.as_deref(), Some("Failed to accept the order"));
		assert!(harness.coordinator.ledger().is_empty());
	}

	#[tokio::test]
	async fn test_disconnected_wallet() {
		let mut wallet = MockWalletInterface::new();
		wallet
			.expect_connection()
			.times(1)
			.returning(|_| WalletConnection::disconnected());
		let harness = Harness::new(ScriptedApi::default(), wallet);

		let err = harness
			.coordinator
			.refund_order("orderG", Some("ETH"))
			.unwrap()
			.await
			.unwrap_err();

		assert_eq!(
			err,
			OperationError::WalletNotConnected("Please connect your wallet first".into())
		);
		assert!(harness.api.calls().is_empty());
		assert_eq!(
			harness.notifier.seen()[0],
			Notification::warning("Please connect your wallet first")
		);
	}

	#[tokio::test]
	async fn test_connected_wallet_without_address() {
		let mut wallet = MockWalletInterface::new();
		wallet.expect_connection().returning(|_| WalletConnection {
			connected: true,
			address: None,
			network: Some(NetworkType::Ethereum),
		});
		let harness = Harness::new(ScriptedApi::default(), wallet);

		let err = harness
			.coordinator
			.accept_payout("orderH", Some("ETH"))
			.unwrap()
			.await
			.unwrap_err();
		assert_eq!(err.to_string(), "Wallet address not found");
	}

	#[tokio::test]
	async fn test_server_rejection_reports_reason() {
		let api = ScriptedApi::default().respond(
			"order/confirm",
			Err(ApiError::Server {
				status: 400,
				reason: "order already confirmed".into(),
			}),
		);
		let mut harness = Harness::new(api, untouched_wallet());
		let mut failures = harness.coordinator.event_bus().subscribe();

		let err = harness
			.coordinator
			.accept_order("orderI", Some("STRIPE"), None)
			.unwrap()
			.await
			.unwrap_err();

		assert_eq!(
			err,
			OperationError::Server {
				status: Some(400),
				reason: "order already confirmed".into(),
			}
		);
		assert_eq!(harness.event_names(), vec!["acceptingOrder", "acceptOrderFail"]);

		let mut reason = None;
		while let Ok(event) = failures.try_recv() {
			if let MarketEvent::Order(OrderEvent::Failed { reason: r, .. }) = event {
				reason = Some(r);
			}
		}
		assert_eq!(reason.as_deref(), Some("order already confirmed"));
		assert_eq!(
			harness.notifier.seen(),
			vec![Notification::error(
				"Failed to accept the order",
				"order already confirmed"
			)]
		);
		assert!(!harness.coordinator.is_pending("orderI", OperationKind::Accept));
	}

	#[tokio::test]
	async fn test_transaction_error_skips_action() {
		let api = ScriptedApi::default().respond("instructions/order/complete", Ok(escrow_instructions()));
		let mut harness = Harness::new(api, wallet_on(NetworkType::Ethereum));
		harness.wallet_replies(|order_id, network| WalletEvent::TransactionError {
			order_id: order_id.into(),
			network,
			error: "custom program error: Error Number: 3012".into(),
		});

		let err = harness
			.coordinator
			.complete_order("orderJ", Some("ETHUSDT"), Default::default())
			.unwrap()
			.await
			.unwrap_err();

		assert_eq!(
			err,
			OperationError::Transaction("Insufficient balance or token not found".into())
		);
		assert_eq!(harness.api.paths(), vec!["instructions/order/complete"]);
		assert_eq!(
			harness.event_names(),
			vec![
				"completingOrder",
				EXECUTE_CRYPTO_TRANSACTION,
				CRYPTO_TRANSACTION_ERROR,
				"completeOrderFail"
			]
		);
	}

	#[tokio::test]
	async fn test_missing_instructions_is_a_server_error() {
		let api = ScriptedApi::default()
			.respond("instructions/order/refund", Ok(json!({ "hasInstructions": true })));
		let harness = Harness::new(api, wallet_on(NetworkType::Ethereum));

		let err = harness
			.coordinator
			.refund_order("orderK", Some("ETHUSDC"))
			.unwrap()
			.await
			.unwrap_err();
		assert!(matches!(err, OperationError::Server { status: None, .. }));
		assert_eq!(harness.api.paths(), vec!["instructions/order/refund"]);
	}

	#[tokio::test]
	async fn test_validation_errors_leave_no_trace() {
		let mut harness = Harness::new(ScriptedApi::default(), untouched_wallet());

		let err = harness
			.coordinator
			.cancel_order("", Some("ETH"))
			.unwrap_err();
		assert_eq!(err.to_string(), "Please provide an orderID");

		let err = harness
			.coordinator
			.resolve_dispute(
				"orderL",
				orderflow_types::ResolutionRequest {
					resolution: "split".into(),
					buyer_percentage: 70.0,
					vendor_percentage: 40.0,
				},
			)
			.unwrap_err();
		assert!(matches!(err, OperationError::Validation(_)));

		assert!(harness.coordinator.ledger().is_empty());
		assert!(harness.event_names().is_empty());
		assert!(harness.api.calls().is_empty());
	}

	#[tokio::test]
	async fn test_abort_settles_and_reports() {
		let gate = Arc::new(Semaphore::new(0));
		let mut harness = Harness::new(ScriptedApi::gated(gate), untouched_wallet());

		let handle = harness
			.coordinator
			.open_dispute(
				"orderM",
				orderflow_types::DisputeRequest {
					claim: "item never arrived".into(),
				},
			)
			.unwrap();
		while harness.api.calls().is_empty() {
			tokio::task::yield_now().await;
		}

		handle.abort();
		assert_eq!(handle.await, Err(OperationError::Aborted));
		assert!(!harness.coordinator.is_pending("orderM", OperationKind::OpenDispute));
		assert_eq!(
			harness.event_names(),
			vec!["openingDisputeOrder", "openDisputeFail"]
		);
		assert_eq!(
			harness.notifier.seen(),
			vec![Notification::error("Failed to open the dispute", "Operation aborted")]
		);
	}

	#[tokio::test]
	async fn test_abort_before_start_frees_slot() {
		let mut harness = Harness::new(ScriptedApi::default(), untouched_wallet());

		let handle = harness.coordinator.release_escrow("orderP").unwrap();
		handle.abort();
		assert_eq!(handle.clone().await, Err(OperationError::Aborted));

		assert!(!harness.coordinator.is_pending("orderP", OperationKind::ReleaseEscrow));
		assert!(harness.coordinator.ledger().is_empty());
		assert!(harness.api.calls().is_empty());
		// nothing was announced, so nothing is reported
		assert!(harness.event_names().is_empty());
		assert!(harness.notifier.seen().is_empty());

		let retry = harness.coordinator.release_escrow("orderP").unwrap();
		assert!(!retry.same_request(&handle));
		assert_eq!(retry.await, Ok(json!({ "status": "ok" })));
		assert_eq!(harness.api.paths(), vec!["dispute/releaseAfterTimeout"]);
		assert_eq!(
			harness.event_names(),
			vec!["releasingEscrow", "releaseEscrowComplete"]
		);
	}

	#[tokio::test]
	async fn test_settled_slot_allows_new_attempt() {
		let harness = Harness::new(ScriptedApi::default(), untouched_wallet());

		let first = harness.coordinator.release_escrow("orderN").unwrap();
		let first_id = first.id();
		first.await.unwrap();

		let second = harness.coordinator.release_escrow("orderN").unwrap();
		assert_ne!(second.id(), first_id);
		second.await.unwrap();
		assert_eq!(harness.api.paths().len(), 2);
	}

	#[test]
	fn test_api_error_conversion() {
		let err: OperationError = ApiError::Network("connection refused".into()).into();
		assert_eq!(
			err,
			OperationError::Server {
				status: None,
				reason: "Network error: connection refused".into(),
			}
		);
		let err: OperationError = BridgeError::Timeout.into();
		assert_eq!(err, OperationError::Timeout);
	}
}
