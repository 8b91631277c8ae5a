//! Payment networks and the token registry.
//!
//! Maps payment coin identifiers (e.g. "ETHUSDT", "SOL") to the chain they live on
//! and to the wallet network family able to sign for them. Stripe-style fiat rails
//! are recognised by their "STRIPE" prefix and never touch a wallet.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Wallet network family able to execute a payment transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
	Ethereum,
	Solana,
}

impl NetworkType {
	pub fn as_str(&self) -> &'static str {
		match self {
			NetworkType::Ethereum => "ethereum",
			NetworkType::Solana => "solana",
		}
	}
}

impl fmt::Display for NetworkType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for NetworkType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"ethereum" => Ok(NetworkType::Ethereum),
			"solana" => Ok(NetworkType::Solana),
			other => Err(format!("unknown network type '{}'", other)),
		}
	}
}

/// Chains a payment coin can be issued on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chain {
	Eth,
	Bsc,
	Base,
	Matic,
	Sol,
}

impl Chain {
	/// EVM chains are signed by an ethereum wallet, SOL by a solana wallet.
	pub fn network_type(&self) -> NetworkType {
		match self {
			Chain::Eth | Chain::Bsc | Chain::Base | Chain::Matic => NetworkType::Ethereum,
			Chain::Sol => NetworkType::Solana,
		}
	}
}

/// Configuration for a payment coin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct TokenConfig {
	pub id: String,
	pub symbol: String,
	pub chain: Chain,
	#[serde(default)]
	pub native: bool,
	pub decimals: u8,
}

impl TokenConfig {
	fn new(id: &str, symbol: &str, chain: Chain, native: bool, decimals: u8) -> Self {
		Self {
			id: id.to_string(),
			symbol: symbol.to_string(),
			chain,
			native,
			decimals,
		}
	}
}

/// Payment coins supported by the storefront out of the box.
pub fn default_tokens() -> Vec<TokenConfig> {
	vec![
		TokenConfig::new("ETH", "ETH", Chain::Eth, true, 18),
		TokenConfig::new("ETHUSDT", "USDT", Chain::Eth, false, 6),
		TokenConfig::new("ETHUSDC", "USDC", Chain::Eth, false, 6),
		TokenConfig::new("DAI", "DAI", Chain::Eth, false, 18),
		TokenConfig::new("SOL", "SOL", Chain::Sol, true, 9),
		TokenConfig::new("SOLUSDT", "USDT", Chain::Sol, false, 6),
		TokenConfig::new("SOLUSDC", "USDC", Chain::Sol, false, 6),
		TokenConfig::new("BNB", "BNB", Chain::Bsc, true, 18),
		TokenConfig::new("BSCUSDT", "USDT", Chain::Bsc, false, 18),
		TokenConfig::new("BSCUSDC", "USDC", Chain::Bsc, false, 18),
		TokenConfig::new("BASEETH", "ETH", Chain::Base, false, 18),
		TokenConfig::new("BASEUSDT", "USDT", Chain::Base, false, 6),
		TokenConfig::new("BASEUSDC", "USDC", Chain::Base, false, 6),
		TokenConfig::new("MATIC", "MATIC", Chain::Matic, true, 18),
		TokenConfig::new("MATICUSDT", "USDT", Chain::Matic, false, 6),
		TokenConfig::new("MATICUSDC", "USDC", Chain::Matic, false, 6),
	]
}

/// Returns true for Stripe-style fiat payment rails.
pub fn is_fiat_coin(payment_coin: Option<&str>) -> bool {
	payment_coin.is_some_and(|coin| coin.to_ascii_uppercase().starts_with("STRIPE"))
}

/// Lookup table from payment coin id to token configuration.
#[derive(Debug, Clone)]
pub struct TokenRegistry {
	tokens: HashMap<String, TokenConfig>,
}

impl TokenRegistry {
	pub fn new(tokens: impl IntoIterator<Item = TokenConfig>) -> Self {
		Self {
			tokens: tokens
				.into_iter()
				.map(|token| (token.id.clone(), token))
				.collect(),
		}
	}

	pub fn get(&self, coin: &str) -> Option<&TokenConfig> {
		self.tokens.get(coin)
	}

	/// Network required to pay with `coin`, if the coin is known.
	pub fn network_for(&self, coin: &str) -> Option<NetworkType> {
		self.get(coin).map(|token| token.chain.network_type())
	}

	pub fn len(&self) -> usize {
		self.tokens.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tokens.is_empty()
	}
}

impl Default for TokenRegistry {
	fn default() -> Self {
		Self::new(default_tokens())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_network_for_known_coins() {
		let registry = TokenRegistry::default();
		assert_eq!(registry.network_for("ETHUSDT"), Some(NetworkType::Ethereum));
		assert_eq!(registry.network_for("BSCUSDC"), Some(NetworkType::Ethereum));
		assert_eq!(registry.network_for("BASEETH"), Some(NetworkType::Ethereum));
		assert_eq!(registry.network_for("SOLUSDC"), Some(NetworkType::Solana));
		assert_eq!(registry.network_for("XMR"), None);
	}

	#[test]
	fn test_fiat_detection() {
		assert!(is_fiat_coin(Some("STRIPE")));
		assert!(is_fiat_coin(Some("stripe_usd")));
		assert!(!is_fiat_coin(Some("ETH")));
		assert!(!is_fiat_coin(None));
	}

	#[test]
	fn test_network_type_parsing() {
		assert_eq!("Ethereum".parse::<NetworkType>(), Ok(NetworkType::Ethereum));
		assert_eq!("solana".parse::<NetworkType>(), Ok(NetworkType::Solana));
		assert!("bitcoin".parse::<NetworkType>().is_err());
	}

	#[test]
	fn test_token_config_from_toml() {
		let token: TokenConfig = toml::from_str(
			r#"
id = "ARBUSDC"
symbol = "USDC"
chain = "ETH"
decimals = 6
"#,
		)
		.unwrap();
		assert!(!token.native);
		assert_eq!(token.chain.network_type(), NetworkType::Ethereum);
	}
}
