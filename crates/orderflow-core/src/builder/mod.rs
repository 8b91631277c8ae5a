//! Builder for constructing order coordinators.
//!
//! Every collaborator defaults to the implementation the configuration
//! describes: the HTTP backend at `api.server_url`, a static wallet from the
//! `[wallet]` section (or none), log notifications and a fresh event bus.
//! Any of them can be replaced, which is how UIs and tests plug in their own.

use crate::engine::{event_bus::EventBus, OrderCoordinator};
use crate::notify::{LogNotifier, Notifier};
use crate::wallet::{StaticWallet, WalletInterface};
use orderflow_api::implementations::http::create_api;
use orderflow_api::OrderApiInterface;
use orderflow_config::Config;
use orderflow_types::TokenRegistry;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during coordinator construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Builder for an [`OrderCoordinator`] with pluggable collaborators.
pub struct CoordinatorBuilder {
	config: Config,
	api: Option<Arc<dyn OrderApiInterface>>,
	wallet: Option<Arc<dyn WalletInterface>>,
	notifier: Option<Arc<dyn Notifier>>,
	event_bus: Option<EventBus>,
}

impl CoordinatorBuilder {
	pub fn new(config: Config) -> Self {
		Self {
			config,
			api: None,
			wallet: None,
			notifier: None,
			event_bus: None,
		}
	}

	pub fn with_api(mut self, api: Arc<dyn OrderApiInterface>) -> Self {
		self.api = Some(api);
		self
	}

	pub fn with_wallet(mut self, wallet: Arc<dyn WalletInterface>) -> Self {
		self.wallet = Some(wallet);
		self
	}

	pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
		self.notifier = Some(notifier);
		self
	}

	/// Shares an existing bus, e.g. one a wallet integration already listens on.
	pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
		self.event_bus = Some(event_bus);
		self
	}

	pub fn build(self) -> Result<OrderCoordinator, BuilderError> {
		let config = self.config;

		let api = match self.api {
			Some(api) => api,
			None => Arc::from(
				create_api(&config.api.server_url, config.api_timeout())
					.map_err(|e| BuilderError::Config(e.to_string()))?,
			),
		};

		let wallet = self.wallet.unwrap_or_else(|| match &config.wallet {
			Some(wallet) => Arc::new(StaticWallet::from(wallet)),
			None => Arc::new(StaticWallet::disconnected()),
		});

		let notifier = self
			.notifier
			.unwrap_or_else(|| Arc::new(LogNotifier));
		let event_bus = self
			.event_bus
			.unwrap_or_else(|| EventBus::new(config.events.capacity));

		tracing::debug!(
			client = %config.client.id,
			server_url = %config.api.server_url,
			tokens = config.tokens.len(),
			"Building order coordinator"
		);

		Ok(OrderCoordinator::new(
			api,
			wallet,
			notifier,
			event_bus,
			TokenRegistry::new(config.tokens.iter().cloned()),
			config.transaction_timeout(),
		))
	}
}
