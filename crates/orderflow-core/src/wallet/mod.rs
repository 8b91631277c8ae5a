//! Wallet connection seam.
//!
//! The coordinator only needs to know whether a wallet is connected, its address
//! and the network it is on. Signing happens elsewhere, behind the bus (see
//! [`relay`]).

use async_trait::async_trait;
use orderflow_config::WalletConfig;
use orderflow_types::NetworkType;

pub mod relay;

/// Snapshot of the wallet state at the time of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletConnection {
	pub connected: bool,
	pub address: Option<String>,
	pub network: Option<NetworkType>,
}

impl WalletConnection {
	pub fn connected(address: &str, network: NetworkType) -> Self {
		Self {
			connected: true,
			address: Some(address.to_string()),
			network: Some(network),
		}
	}

	pub fn disconnected() -> Self {
		Self::default()
	}
}

/// Trait defining the interface to the user's wallet.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletInterface: Send + Sync {
	/// Current connection state. `required` is the network the pending payment
	/// needs, which a wallet may use to prompt a network switch.
	async fn connection(&self, required: Option<NetworkType>) -> WalletConnection;
}

/// Wallet with a fixed address on a fixed network.
#[derive(Debug, Clone)]
pub struct StaticWallet {
	connection: WalletConnection,
}

impl StaticWallet {
	pub fn new(address: &str, network: NetworkType) -> Self {
		Self {
			connection: WalletConnection::connected(address, network),
		}
	}

	/// A wallet that is never connected; crypto payments always fail fast.
	pub fn disconnected() -> Self {
		Self {
			connection: WalletConnection::disconnected(),
		}
	}
}

impl From<&WalletConfig> for StaticWallet {
	fn from(config: &WalletConfig) -> Self {
		Self::new(&config.address, config.network)
	}
}

#[async_trait]
impl WalletInterface for StaticWallet {
	async fn connection(&self, _required: Option<NetworkType>) -> WalletConnection {
		self.connection.clone()
	}
}
