//! Order operation types.
//!
//! Defines the operation kinds a storefront client can drive on an order, the
//! typed payload of each operation, and the generic [`OperationSpec`] consumed
//! by the coordinator. Each kind owns its endpoints and lifecycle event names.

use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::borrow::Cow;
use std::fmt;
use validator::Validate;

/// Operations that can be performed on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
	Accept,
	Reject,
	Cancel,
	Fulfill,
	Refund,
	Complete,
	OpenDispute,
	ResolveDispute,
	AcceptPayout,
	ReleaseEscrow,
}

/// Ledger slot an operation occupies while in flight.
///
/// Accepting and rejecting are the same backend action (`order/confirm`) and
/// therefore share the `Confirm` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LedgerSlot {
	Confirm,
	Cancel,
	Fulfill,
	Refund,
	Complete,
	OpenDispute,
	ResolveDispute,
	AcceptPayout,
	ReleaseEscrow,
}

impl OperationKind {
	pub const ALL: [OperationKind; 10] = [
		OperationKind::Accept,
		OperationKind::Reject,
		OperationKind::Cancel,
		OperationKind::Fulfill,
		OperationKind::Refund,
		OperationKind::Complete,
		OperationKind::OpenDispute,
		OperationKind::ResolveDispute,
		OperationKind::AcceptPayout,
		OperationKind::ReleaseEscrow,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			OperationKind::Accept => "accept",
			OperationKind::Reject => "reject",
			OperationKind::Cancel => "cancel",
			OperationKind::Fulfill => "fulfill",
			OperationKind::Refund => "refund",
			OperationKind::Complete => "complete",
			OperationKind::OpenDispute => "openDispute",
			OperationKind::ResolveDispute => "resolveDispute",
			OperationKind::AcceptPayout => "acceptPayout",
			OperationKind::ReleaseEscrow => "releaseEscrow",
		}
	}

	pub fn slot(&self) -> LedgerSlot {
		match self {
			OperationKind::Accept | OperationKind::Reject => LedgerSlot::Confirm,
			OperationKind::Cancel => LedgerSlot::Cancel,
			OperationKind::Fulfill => LedgerSlot::Fulfill,
			OperationKind::Refund => LedgerSlot::Refund,
			OperationKind::Complete => LedgerSlot::Complete,
			OperationKind::OpenDispute => LedgerSlot::OpenDispute,
			OperationKind::ResolveDispute => LedgerSlot::ResolveDispute,
			OperationKind::AcceptPayout => LedgerSlot::AcceptPayout,
			OperationKind::ReleaseEscrow => LedgerSlot::ReleaseEscrow,
		}
	}

	/// Name of the event published when the operation starts.
	pub fn pending_event(&self) -> &'static str {
		match self {
			OperationKind::Accept => "acceptingOrder",
			OperationKind::Reject => "rejectingOrder",
			OperationKind::Cancel => "cancelingOrder",
			OperationKind::Fulfill => "fulfillingOrder",
			OperationKind::Refund => "refundingOrder",
			OperationKind::Complete => "completingOrder",
			OperationKind::OpenDispute => "openingDisputeOrder",
			OperationKind::ResolveDispute => "resolvingDispute",
			OperationKind::AcceptPayout => "acceptingPayout",
			OperationKind::ReleaseEscrow => "releasingEscrow",
		}
	}

	/// Name of the event published when the operation succeeds.
	pub fn complete_event(&self) -> &'static str {
		match self {
			OperationKind::Accept => "acceptOrderComplete",
			OperationKind::Reject => "rejectOrderComplete",
			OperationKind::Cancel => "cancelOrderComplete",
			OperationKind::Fulfill => "fulfillOrderComplete",
			OperationKind::Refund => "refundOrderComplete",
			OperationKind::Complete => "completeOrderComplete",
			OperationKind::OpenDispute => "openDisputeComplete",
			OperationKind::ResolveDispute => "resolveDisputeComplete",
			OperationKind::AcceptPayout => "acceptPayoutComplete",
			OperationKind::ReleaseEscrow => "releaseEscrowComplete",
		}
	}

	/// Name of the event published when the operation fails.
	pub fn fail_event(&self) -> &'static str {
		match self {
			OperationKind::Accept => "acceptOrderFail",
			OperationKind::Reject => "rejectOrderFail",
			OperationKind::Cancel => "cancelOrderFail",
			OperationKind::Fulfill => "fulfillOrderFail",
			OperationKind::Refund => "refundOrderFail",
			OperationKind::Complete => "completeOrderFail",
			OperationKind::OpenDispute => "openDisputeFail",
			OperationKind::ResolveDispute => "resolveDisputeFail",
			OperationKind::AcceptPayout => "acceptPayoutFail",
			OperationKind::ReleaseEscrow => "releaseEscrowFail",
		}
	}

	/// Heading shown to the user when the operation fails.
	pub fn failure_heading(&self) -> &'static str {
		match self {
			OperationKind::Accept => "Failed to accept the order",
			OperationKind::Reject => "Failed to decline the order",
			OperationKind::Cancel => "Failed to cancel the order",
			OperationKind::Fulfill => "Failed to fulfill the order",
			OperationKind::Refund => "Failed to refund the order",
			OperationKind::Complete => "Failed to complete the order",
			OperationKind::OpenDispute => "Failed to open the dispute",
			OperationKind::ResolveDispute => "Failed to resolve the dispute",
			OperationKind::AcceptPayout => "Failed to accept the payout",
			OperationKind::ReleaseEscrow => "Failed to release the escrow",
		}
	}

	/// Pre-flight endpoint deciding whether a payment transaction is needed.
	///
	/// Kinds without one always go straight to the action endpoint.
	pub fn instructions_path(&self) -> Option<&'static str> {
		match self {
			OperationKind::Accept | OperationKind::Reject => Some("instructions/order/confirm"),
			OperationKind::Cancel => Some("instructions/order/cancel"),
			OperationKind::Refund => Some("instructions/order/refund"),
			OperationKind::Complete => Some("instructions/order/complete"),
			OperationKind::AcceptPayout => Some("instructions/dispute/release"),
			OperationKind::Fulfill
			| OperationKind::OpenDispute
			| OperationKind::ResolveDispute
			| OperationKind::ReleaseEscrow => None,
		}
	}

	/// Endpoint that commits the order-state transition.
	pub fn action_path(&self) -> &'static str {
		match self {
			OperationKind::Accept | OperationKind::Reject => "order/confirm",
			OperationKind::Cancel => "order/cancel",
			OperationKind::Fulfill => "order/fulfill",
			OperationKind::Refund => "order/refund",
			OperationKind::Complete => "order/complete",
			OperationKind::OpenDispute => "dispute/open",
			OperationKind::ResolveDispute => "dispute/close",
			OperationKind::AcceptPayout => "dispute/release",
			OperationKind::ReleaseEscrow => "dispute/releaseAfterTimeout",
		}
	}
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Star ratings left by the buyer when completing an order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Ratings {
	#[validate(range(min = 1.0, max = 5.0))]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub overall: Option<f64>,
	#[validate(range(min = 1.0, max = 5.0))]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub quality: Option<f64>,
	#[validate(range(min = 1.0, max = 5.0))]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<f64>,
	#[validate(range(min = 1.0, max = 5.0))]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub customer_service: Option<f64>,
	#[validate(range(min = 1.0, max = 5.0))]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub delivery: Option<f64>,
}

/// Payload of the complete operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
	#[validate(nested)]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ratings: Option<Ratings>,
	#[validate(length(max = 3000))]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub review: Option<String>,
	#[serde(default)]
	pub anonymous: bool,
}

/// Listing contract types relevant to fulfillment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractType {
	#[default]
	PhysicalGood,
	DigitalGood,
	Service,
	Cryptocurrency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalDelivery {
	pub shipper: String,
	pub tracking_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitalDelivery {
	pub url: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub password: Option<String>,
}

/// Payload of the fulfill operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_fulfillment"))]
pub struct FulfillmentRequest {
	#[serde(skip_serializing, default)]
	pub contract_type: ContractType,
	#[serde(skip_serializing, default)]
	pub local_pickup: bool,
	#[validate(length(max = 500))]
	#[serde(skip_serializing_if = "Option::is_none")]
	pub note: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub physical_delivery: Option<PhysicalDelivery>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub digital_delivery: Option<DigitalDelivery>,
}

fn validate_fulfillment(request: &FulfillmentRequest) -> Result<(), validator::ValidationError> {
	match request.contract_type {
		ContractType::PhysicalGood if !request.local_pickup => {
			let complete = request.physical_delivery.as_ref().is_some_and(|delivery| {
				!delivery.shipper.trim().is_empty() && !delivery.tracking_number.trim().is_empty()
			});
			if !complete {
				return Err(schema_error(
					"physicalDelivery",
					"a shipper and tracking number are required",
				));
			}
		},
		ContractType::DigitalGood => {
			let has_url = request
				.digital_delivery
				.as_ref()
				.is_some_and(|delivery| !delivery.url.trim().is_empty());
			if !has_url {
				return Err(schema_error("digitalDelivery", "a delivery url is required"));
			}
		},
		_ => {},
	}
	Ok(())
}

/// Payload of the open dispute operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DisputeRequest {
	#[validate(length(min = 1, max = 4000))]
	pub claim: String,
}

/// Payload of the resolve dispute operation, sent by the moderator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_resolution"))]
pub struct ResolutionRequest {
	#[validate(length(min = 1))]
	pub resolution: String,
	#[validate(range(min = 0.0, max = 100.0))]
	pub buyer_percentage: f64,
	#[validate(range(min = 0.0, max = 100.0))]
	pub vendor_percentage: f64,
}

fn validate_resolution(request: &ResolutionRequest) -> Result<(), validator::ValidationError> {
	// range checks let NaN through
	if !request.buyer_percentage.is_finite() || !request.vendor_percentage.is_finite() {
		return Err(schema_error("percentages", "percentages must be finite numbers"));
	}
	if (request.buyer_percentage + request.vendor_percentage - 100.0).abs() > f64::EPSILON {
		return Err(schema_error(
			"percentages",
			"buyer and vendor percentages must add up to 100",
		));
	}
	Ok(())
}

fn schema_error(code: &'static str, message: &'static str) -> validator::ValidationError {
	let mut error = validator::ValidationError::new(code);
	error.message = Some(Cow::Borrowed(message));
	error
}

/// An order operation together with its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderOperation {
	Accept { payout_address: Option<String> },
	Reject,
	Cancel,
	Fulfill(FulfillmentRequest),
	Refund,
	Complete(CompletionRequest),
	OpenDispute(DisputeRequest),
	ResolveDispute(ResolutionRequest),
	AcceptPayout,
	ReleaseEscrow,
}

impl OrderOperation {
	pub fn kind(&self) -> OperationKind {
		match self {
			OrderOperation::Accept { .. } => OperationKind::Accept,
			OrderOperation::Reject => OperationKind::Reject,
			OrderOperation::Cancel => OperationKind::Cancel,
			OrderOperation::Fulfill(_) => OperationKind::Fulfill,
			OrderOperation::Refund => OperationKind::Refund,
			OrderOperation::Complete(_) => OperationKind::Complete,
			OrderOperation::OpenDispute(_) => OperationKind::OpenDispute,
			OrderOperation::ResolveDispute(_) => OperationKind::ResolveDispute,
			OrderOperation::AcceptPayout => OperationKind::AcceptPayout,
			OrderOperation::ReleaseEscrow => OperationKind::ReleaseEscrow,
		}
	}

	/// Validates the payload and builds the request description for `order_id`.
	pub fn into_spec(
		self,
		order_id: &str,
		payment_coin: Option<&str>,
	) -> Result<OperationSpec, ValidationError> {
		if order_id.trim().is_empty() {
			return Err(ValidationError::MissingOrderId);
		}

		let kind = self.kind();
		let (instruction_data, action_data) = match self {
			OrderOperation::Accept { payout_address } => confirm_payloads(order_id, false, payout_address),
			OrderOperation::Reject => confirm_payloads(order_id, true, None),
			OrderOperation::Complete(request) => {
				request
					.validate()
					.map_err(|_| ValidationError::Invalid("Invalid ratings data".into()))?;
				let data = to_object(&request)?;
				let mut action = with_order_id(order_id, data.clone());
				action.insert("transactionID".into(), json!(""));
				(data, action)
			},
			OrderOperation::Fulfill(request) => {
				request.validate()?;
				(Map::new(), with_order_id(order_id, to_object(&request)?))
			},
			OrderOperation::OpenDispute(request) => {
				request.validate()?;
				(Map::new(), with_order_id(order_id, to_object(&request)?))
			},
			OrderOperation::ResolveDispute(request) => {
				request.validate()?;
				(Map::new(), with_order_id(order_id, to_object(&request)?))
			},
			OrderOperation::Cancel
			| OrderOperation::Refund
			| OrderOperation::AcceptPayout
			| OrderOperation::ReleaseEscrow => (Map::new(), with_order_id(order_id, Map::new())),
		};

		Ok(OperationSpec {
			order_id: order_id.to_string(),
			kind,
			payment_coin: payment_coin.map(str::to_string),
			instructions_path: kind.instructions_path().map(str::to_string),
			action_path: kind.action_path().to_string(),
			instruction_data,
			action_data,
		})
	}
}

fn confirm_payloads(
	order_id: &str,
	reject: bool,
	payout_address: Option<String>,
) -> (Map<String, Value>, Map<String, Value>) {
	let mut instruction = Map::new();
	instruction.insert("reject".into(), json!(reject));
	instruction.insert("payoutAddress".into(), json!(payout_address));

	let mut action = with_order_id(order_id, instruction.clone());
	action.insert("transactionID".into(), json!(""));
	(instruction, action)
}

fn with_order_id(order_id: &str, data: Map<String, Value>) -> Map<String, Value> {
	let mut object = Map::with_capacity(data.len() + 1);
	object.insert("orderID".into(), json!(order_id));
	object.extend(data);
	object
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, ValidationError> {
	match serde_json::to_value(value) {
		Ok(Value::Object(map)) => Ok(map),
		Ok(other) => Err(ValidationError::Invalid(format!(
			"payload must serialize to an object, got {}",
			other
		))),
		Err(e) => Err(ValidationError::Invalid(e.to_string())),
	}
}

/// Everything the coordinator needs to run one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSpec {
	#[serde(rename = "orderID")]
	pub order_id: String,
	pub kind: OperationKind,
	pub payment_coin: Option<String>,
	pub instructions_path: Option<String>,
	pub action_path: String,
	#[serde(default)]
	pub instruction_data: Map<String, Value>,
	#[serde(default)]
	pub action_data: Map<String, Value>,
}
