//! Convenience entry points, one per order operation.

use super::{OperationError, OrderCoordinator};
use crate::state::RequestHandle;
use orderflow_types::{
	CompletionRequest, DisputeRequest, FulfillmentRequest, OrderOperation, ResolutionRequest,
};

impl OrderCoordinator {
	/// Vendor accepts the order, optionally naming where the payout should go.
	pub fn accept_order(
		&self,
		order_id: &str,
		payment_coin: Option<&str>,
		payout_address: Option<&str>,
	) -> Result<RequestHandle, OperationError> {
		self.submit(
			order_id,
			payment_coin,
			OrderOperation::Accept {
				payout_address: payout_address.map(str::to_string),
			},
		)
	}

	/// Vendor declines the order.
	pub fn reject_order(
		&self,
		order_id: &str,
		payment_coin: Option<&str>,
	) -> Result<RequestHandle, OperationError> {
		self.submit(order_id, payment_coin, OrderOperation::Reject)
	}

	pub fn cancel_order(
		&self,
		order_id: &str,
		payment_coin: Option<&str>,
	) -> Result<RequestHandle, OperationError> {
		self.submit(order_id, payment_coin, OrderOperation::Cancel)
	}

	/// Fulfillment never requires a payment.
	pub fn fulfill_order(
		&self,
		order_id: &str,
		request: FulfillmentRequest,
	) -> Result<RequestHandle, OperationError> {
		self.submit(order_id, None, OrderOperation::Fulfill(request))
	}

	pub fn refund_order(
		&self,
		order_id: &str,
		payment_coin: Option<&str>,
	) -> Result<RequestHandle, OperationError> {
		self.submit(order_id, payment_coin, OrderOperation::Refund)
	}

	/// Buyer completes the order, leaving ratings and an optional review.
	pub fn complete_order(
		&self,
		order_id: &str,
		payment_coin: Option<&str>,
		request: CompletionRequest,
	) -> Result<RequestHandle, OperationError> {
		self.submit(order_id, payment_coin, OrderOperation::Complete(request))
	}

	pub fn open_dispute(
		&self,
		order_id: &str,
		request: DisputeRequest,
	) -> Result<RequestHandle, OperationError> {
		self.submit(order_id, None, OrderOperation::OpenDispute(request))
	}

	/// Moderator splits the disputed funds.
	pub fn resolve_dispute(
		&self,
		order_id: &str,
		request: ResolutionRequest,
	) -> Result<RequestHandle, OperationError> {
		self.submit(order_id, None, OrderOperation::ResolveDispute(request))
	}

	/// Accepts a moderator's payout after a dispute was resolved.
	pub fn accept_payout(
		&self,
		order_id: &str,
		payment_coin: Option<&str>,
	) -> Result<RequestHandle, OperationError> {
		self.submit(order_id, payment_coin, OrderOperation::AcceptPayout)
	}

	pub fn release_escrow(&self, order_id: &str) -> Result<RequestHandle, OperationError> {
		self.submit(order_id, None, OrderOperation::ReleaseEscrow)
	}
}
