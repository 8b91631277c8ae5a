//! Backend API module for the orderflow system.
//!
//! This module abstracts the HTTP backend that commits order-state transitions.
//! Every order operation talks to the backend through [`OrderApiInterface`], which
//! posts a JSON body to an endpoint path and returns the decoded JSON response.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
}

/// Errors that can occur while talking to the backend.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
	/// The request never produced a response (connection, timeout).
	#[error("Network error: {0}")]
	Network(String),
	/// The backend answered with a non-success status.
	#[error("{reason}")]
	Server { status: u16, reason: String },
	/// The response body could not be decoded.
	#[error("Decode error: {0}")]
	Decode(String),
	/// The client was configured incorrectly.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface to the order backend.
///
/// Implementations post a JSON body to `path` (relative to the server URL) and
/// return the JSON response. An empty success body is returned as `Value::Null`.
#[async_trait]
pub trait OrderApiInterface: Send + Sync {
	async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError>;
}

/// Posts `body` and decodes the response into `T`.
pub async fn post_as<T: DeserializeOwned>(
	api: &dyn OrderApiInterface,
	path: &str,
	body: Value,
) -> Result<T, ApiError> {
	let response = api.post(path, body).await?;
	serde_json::from_value(response).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Extracts a human-readable failure reason from an error response body.
///
/// Prefers the body's `reason` field, then any `error`/`message` field, then the
/// raw body text, and finally the status text.
pub fn error_reason(status: u16, status_text: &str, body: &str) -> String {
	if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) {
		for key in ["reason", "error", "message"] {
			if let Some(reason) = object.get(key).and_then(Value::as_str) {
				if !reason.is_empty() {
					return reason.to_string();
				}
			}
		}
	}

	let body = body.trim();
	if !body.is_empty() {
		return body.to_string();
	}
	if status_text.is_empty() {
		format!("Request failed with status {}", status)
	} else {
		status_text.to_string()
	}
}
