//! HTTP implementation of the order backend interface.
//!
//! Uses a pooled `reqwest` client to post JSON bodies to endpoint paths joined
//! onto the configured server URL.

use crate::{error_reason, ApiError, OrderApiInterface};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Order backend reached over HTTP.
pub struct HttpOrderApi {
	client: reqwest::Client,
	server_url: String,
}

impl HttpOrderApi {
	/// Creates a client for `server_url` with the given request timeout.
	pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ApiError> {
		let server_url = server_url.trim().trim_end_matches('/');
		if server_url.is_empty() {
			return Err(ApiError::Configuration("server URL cannot be empty".into()));
		}

		let client = reqwest::Client::builder()
			.pool_idle_timeout(Duration::from_secs(90))
			.pool_max_idle_per_host(10)
			.timeout(timeout)
			.build()
			.map_err(|e| ApiError::Configuration(e.to_string()))?;

		Ok(Self {
			client,
			server_url: server_url.to_string(),
		})
	}

	/// Full URL of an endpoint path.
	pub fn endpoint(&self, path: &str) -> String {
		format!("{}/{}", self.server_url, path.trim_start_matches('/'))
	}
}

#[async_trait]
impl OrderApiInterface for HttpOrderApi {
	async fn post(&self, path: &str, body: Value) -> Result<Value, ApiError> {
		let url = self.endpoint(path);
		tracing::debug!(%url, "POST");

		let response = self
			.client
			.post(&url)
			.json(&body)
			.send()
			.await
			.map_err(|e| ApiError::Network(e.to_string()))?;

		let status = response.status();
		let text = response
			.text()
			.await
			.map_err(|e| ApiError::Network(e.to_string()))?;

		if !status.is_success() {
			let reason = error_reason(
				status.as_u16(),
				status.canonical_reason().unwrap_or_default(),
				&text,
			);
			tracing::warn!(%url, status = status.as_u16(), %reason, "Backend rejected request");
			return Err(ApiError::Server {
				status: status.as_u16(),
				reason,
			});
		}

		if text.trim().is_empty() {
			return Ok(Value::Null);
		}
		serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
	}
}

/// Factory function to create the HTTP backend from a server URL and timeout.
pub fn create_api(
	server_url: &str,
	timeout: Duration,
) -> Result<Box<dyn OrderApiInterface>, ApiError> {
	Ok(Box::new(HttpOrderApi::new(server_url, timeout)?))
}
