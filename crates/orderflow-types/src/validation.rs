//! Payload validation errors.
//!
//! Operation payloads are checked with `validator` derives before any request is
//! started. Failures are flattened into [`ValidationError`] so they can be
//! returned synchronously to the caller.

use thiserror::Error;

/// Errors raised while validating an operation before it starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	/// The operation was requested without an order id.
	#[error("Please provide an orderID")]
	MissingOrderId,
	/// A payload field failed validation.
	#[error("{0}")]
	Invalid(String),
}

impl From<validator::ValidationErrors> for ValidationError {
	fn from(errors: validator::ValidationErrors) -> Self {
		ValidationError::Invalid(errors.to_string())
	}
}
