//! Configuration module for the orderflow system.
//!
//! This module provides structures and utilities for managing client configuration.
//! It supports loading configuration from TOML files, resolves `${VAR}` and
//! `${VAR:-default}` environment references, and validates the result so every
//! consumer can rely on sane values.

use orderflow_types::{default_tokens, NetworkType, TokenConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for an orderflow client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this client instance.
	pub client: ClientConfig,
	/// Backend API the order operations are sent to.
	pub api: ApiConfig,
	/// Wallet transaction bridge settings.
	#[serde(default)]
	pub bridge: BridgeConfig,
	/// Event bus settings.
	#[serde(default)]
	pub events: EventsConfig,
	/// Statically configured wallet, used by headless clients.
	pub wallet: Option<WalletConfig>,
	/// Payment coins known to the client. Defaults to the built-in table.
	#[serde(default = "default_tokens")]
	pub tokens: Vec<TokenConfig>,
}

/// Configuration specific to the client instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
	/// Identifier used in logs.
	pub id: String,
}

/// Configuration for the backend HTTP API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Base URL every endpoint path is joined onto.
	pub server_url: String,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
}

fn default_api_timeout() -> u64 {
	30
}

/// Configuration for the wallet transaction bridge.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
	/// How long to wait for the wallet to report a transaction.
	/// Defaults to 600 seconds; 0 waits indefinitely.
	#[serde(default = "default_transaction_timeout")]
	pub transaction_timeout_seconds: u64,
}

fn default_transaction_timeout() -> u64 {
	600
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			transaction_timeout_seconds: default_transaction_timeout(),
		}
	}
}

/// Configuration for the event bus.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventsConfig {
	/// Buffer size of the broadcast channel backing async subscribers.
	#[serde(default = "default_event_capacity")]
	pub capacity: usize,
}

fn default_event_capacity() -> usize {
	1024
}

impl Default for EventsConfig {
	fn default() -> Self {
		Self {
			capacity: default_event_capacity(),
		}
	}
}

/// A wallet with a fixed address on a fixed network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
	pub address: String,
	pub network: NetworkType,
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path).await?;
		content.parse()
	}

	/// Timeout applied to wallet transaction waits, if any.
	pub fn transaction_timeout(&self) -> Option<Duration> {
		match self.bridge.transaction_timeout_seconds {
			0 => None,
			secs => Some(Duration::from_secs(secs)),
		}
	}

	/// Timeout applied to backend HTTP requests.
	pub fn api_timeout(&self) -> Duration {
		Duration::from_secs(self.api.timeout_seconds)
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.client.id.trim().is_empty() {
			return Err(ConfigError::Validation("Client ID cannot be empty".into()));
		}

		let server_url = self.api.server_url.trim();
		if server_url.is_empty() {
			return Err(ConfigError::Validation("API server_url cannot be empty".into()));
		}
		if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
			return Err(ConfigError::Validation(format!(
				"API server_url must be an http(s) URL, got '{}'",
				server_url
			)));
		}
		if self.api.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"API timeout_seconds must be greater than 0".into(),
			));
		}

		if self.events.capacity == 0 {
			return Err(ConfigError::Validation(
				"Event capacity must be greater than 0".into(),
			));
		}

		if let Some(wallet) = &self.wallet {
			if wallet.address.trim().is_empty() {
				return Err(ConfigError::Validation(
					"Wallet address cannot be empty".into(),
				));
			}
		}

		let mut seen = HashSet::new();
		for token in &self.tokens {
			if token.id.is_empty() {
				return Err(ConfigError::Validation("Token id cannot be empty".into()));
			}
			if !seen.insert(token.id.as_str()) {
				return Err(ConfigError::Validation(format!(
					"Duplicate token id '{}'",
					token.id
				)));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
