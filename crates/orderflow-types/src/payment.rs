//! Payment instruction and transaction result types.
//!
//! The instructions endpoint tells the client whether an on-chain payment must
//! be executed before an action can be committed. When it must, the wallet
//! executes the transaction and reports back a [`TransactionResult`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response of an instructions pre-flight call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructions {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub has_instructions: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub instructions: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub payment_chain: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub payment_address: Option<String>,
	/// Any further fields the backend attached; forwarded to the wallet as metadata.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

/// What the client has to do after reading the instructions response.
#[derive(Debug, Clone, PartialEq)]
pub enum InstructionsDecision {
	/// No payment needed, commit the action directly.
	NotRequired,
	/// A transaction must be executed first.
	Execute {
		instructions: Value,
		payment_chain: Option<String>,
	},
	/// The response neither declined nor carried instructions.
	Missing,
}

impl PaymentInstructions {
	pub fn decision(&self) -> InstructionsDecision {
		if self.has_instructions == Some(false) {
			return InstructionsDecision::NotRequired;
		}
		match &self.instructions {
			Some(instructions) if !instructions.is_null() => InstructionsDecision::Execute {
				instructions: instructions.clone(),
				payment_chain: self.payment_chain.clone(),
			},
			_ => InstructionsDecision::Missing,
		}
	}
}

/// Outcome of an externally executed payment transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
	#[serde(rename = "transactionID")]
	pub transaction_id: String,
	pub raw: Value,
}

impl TransactionResult {
	/// Extracts the transaction id from a wallet payload.
	///
	/// Wallets report either the bare hash/signature string or an object carrying
	/// `transactionID`, `hash` or `signature`.
	pub fn from_wallet_payload(raw: Value) -> Option<Self> {
		let transaction_id = match &raw {
			Value::String(id) => Some(id.clone()),
			Value::Object(object) => ["transactionID", "hash", "signature"]
				.iter()
				.find_map(|key| object.get(*key).and_then(Value::as_str))
				.map(str::to_string),
			_ => None,
		}?;

		if transaction_id.is_empty() {
			return None;
		}
		Some(Self {
			transaction_id,
			raw,
		})
	}
}
