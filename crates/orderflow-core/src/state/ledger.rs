//! Ledger of in-flight order operations.
//!
//! Entries are keyed by order id and [`LedgerSlot`]. Accept and reject share the
//! confirm slot, every other kind has its own, so different kinds on one order
//! may run concurrently while a second request for an occupied slot is collapsed
//! into the first.

use super::handle::RequestHandle;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use orderflow_types::{LedgerSlot, OperationKind};
use uuid::Uuid;

/// A request currently occupying a ledger slot.
#[derive(Debug, Clone)]
pub struct InFlightRequest {
	pub order_id: String,
	pub kind: OperationKind,
	pub handle: RequestHandle,
	pub created_at: DateTime<Utc>,
}

/// Outcome of [`RequestLedger::begin`].
#[derive(Debug, Clone)]
pub enum Begin {
	/// The slot was free and a new request was started.
	Started(RequestHandle),
	/// The slot was occupied; this is the request already in flight.
	Joined(RequestHandle),
}

impl Begin {
	pub fn handle(&self) -> &RequestHandle {
		match self {
			Begin::Started(handle) | Begin::Joined(handle) => handle,
		}
	}

	pub fn is_started(&self) -> bool {
		matches!(self, Begin::Started(_))
	}
}

type LedgerKey = (String, LedgerSlot);

fn key(order_id: &str, kind: OperationKind) -> LedgerKey {
	(order_id.to_string(), kind.slot())
}

/// Keyed store of in-flight requests.
#[derive(Debug, Default)]
pub struct RequestLedger {
	entries: DashMap<LedgerKey, InFlightRequest>,
}

impl RequestLedger {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a request unless the slot is occupied.
	///
	/// `start` is only called when the slot is free and receives the id of the
	/// new request. Check and insert happen under the same entry lock.
	pub fn begin<F>(&self, order_id: &str, kind: OperationKind, start: F) -> Begin
	where
		F: FnOnce(Uuid) -> RequestHandle,
	{
		match self.entries.entry(key(order_id, kind)) {
			Entry::Occupied(entry) => Begin::Joined(entry.get().handle.clone()),
			Entry::Vacant(entry) => {
				let handle = start(Uuid::new_v4());
				entry.insert(InFlightRequest {
					order_id: order_id.to_string(),
					kind,
					created_at: handle.created_at(),
					handle: handle.clone(),
				});
				Begin::Started(handle)
			},
		}
	}

	/// True if a request of exactly `kind` is in flight for the order.
	pub fn is_pending(&self, order_id: &str, kind: OperationKind) -> bool {
		self.entries
			.get(&key(order_id, kind))
			.is_some_and(|entry| entry.kind == kind)
	}

	pub fn in_flight(&self, order_id: &str, kind: OperationKind) -> Option<InFlightRequest> {
		self.entries
			.get(&key(order_id, kind))
			.filter(|entry| entry.kind == kind)
			.map(|entry| entry.value().clone())
	}

	/// Frees the slot held by a request of `kind`. No-op if there is none.
	pub fn settle(&self, order_id: &str, kind: OperationKind) -> bool {
		self.entries
			.remove_if(&key(order_id, kind), |_, entry| entry.kind == kind)
			.is_some()
	}

	/// Frees the slot only if it is still held by request `id`.
	pub(crate) fn settle_request(&self, order_id: &str, kind: OperationKind, id: Uuid) -> bool {
		self.entries
			.remove_if(&key(order_id, kind), |_, entry| entry.handle.id() == id)
			.is_some()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::state::OperationOutcome;

	fn idle(id: Uuid, order_id: &str, kind: OperationKind) -> RequestHandle {
		RequestHandle::spawn(id, order_id, kind, futures::future::pending::<OperationOutcome>())
	}

	#[tokio::test]
	async fn test_second_begin_joins_first() {
		let ledger = RequestLedger::new();

		let first = ledger.begin("orderC3", OperationKind::Accept, |id| {
			idle(id, "orderC3", OperationKind::Accept)
		});
		let second = ledger.begin("orderC3", OperationKind::Accept, |_| {
			panic!("must not start a second request")
		});

		assert!(first.is_started());
		assert!(!second.is_started());
		assert!(first.handle().same_request(second.handle()));
		assert!(ledger.is_pending("orderC3", OperationKind::Accept));
		assert_eq!(ledger.len(), 1);
	}

	#[tokio::test]
	async fn test_kinds_and_orders_are_independent() {
		let ledger = RequestLedger::new();

		ledger.begin("order1", OperationKind::Fulfill, |id| {
			idle(id, "order1", OperationKind::Fulfill)
		});
		let dispute = ledger.begin("order1", OperationKind::OpenDispute, |id| {
			idle(id, "order1", OperationKind::OpenDispute)
		});
		let other_order = ledger.begin("order2", OperationKind::Fulfill, |id| {
			idle(id, "order2", OperationKind::Fulfill)
		});

		assert!(dispute.is_started());
		assert!(other_order.is_started());
		assert_eq!(ledger.len(), 3);
	}

	#[tokio::test]
	async fn test_accept_and_reject_share_slot() {
		let ledger = RequestLedger::new();

		ledger.begin("order", OperationKind::Accept, |id| {
			idle(id, "order", OperationKind::Accept)
		});
		let reject = ledger.begin("order", OperationKind::Reject, |id| {
			idle(id, "order", OperationKind::Reject)
		});

		assert!(!reject.is_started());
		assert_eq!(reject.handle().kind(), OperationKind::Accept);
		assert!(ledger.is_pending("order", OperationKind::Accept));
		assert!(!ledger.is_pending("order", OperationKind::Reject));
		assert!(ledger.in_flight("order", OperationKind::Reject).is_none());

		// settling the other kind leaves the slot alone
		assert!(!ledger.settle("order", OperationKind::Reject));
		assert!(ledger.is_pending("order", OperationKind::Accept));
	}

	#[tokio::test]
	async fn test_settle_is_idempotent() {
		let ledger = RequestLedger::new();
		assert!(!ledger.settle("missing", OperationKind::Refund));

		ledger.begin("order", OperationKind::Refund, |id| {
			idle(id, "order", OperationKind::Refund)
		});
		assert!(ledger.settle("order", OperationKind::Refund));
		assert!(!ledger.settle("order", OperationKind::Refund));
		assert!(!ledger.is_pending("order", OperationKind::Refund));
		assert!(ledger.is_empty());
	}

	#[tokio::test]
	async fn test_stale_settle_keeps_newer_request() {
		let ledger = RequestLedger::new();

		let first = ledger.begin("order", OperationKind::Cancel, |id| {
			idle(id, "order", OperationKind::Cancel)
		});
		let stale_id = first.handle().id();
		ledger.settle("order", OperationKind::Cancel);

		let second = ledger.begin("order", OperationKind::Cancel, |id| {
			idle(id, "order", OperationKind::Cancel)
		});
		assert!(second.is_started());

		assert!(!ledger.settle_request("order", OperationKind::Cancel, stale_id));
		assert!(ledger.is_pending("order", OperationKind::Cancel));
		assert!(ledger.settle_request("order", OperationKind::Cancel, second.handle().id()));
	}
}
