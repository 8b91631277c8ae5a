//! Main entry point for the orderflow command-line client.
//!
//! Runs a single order operation against the configured backend and prints the
//! backend's response. Payment transactions are handed to the operator on the
//! console, who submits them with an external wallet.

use clap::{Parser, Subcommand};
use orderflow_config::Config;
use orderflow_core::{CoordinatorBuilder, EventBus, TransactionRelay};
use orderflow_types::{
	truncate_id, CompletionRequest, ContractType, DigitalDelivery, DisputeRequest,
	FulfillmentRequest, MarketEvent, OrderOperation, PhysicalDelivery, Ratings,
	ResolutionRequest,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

mod executor;

use executor::ConsoleExecutor;

/// Command-line arguments for the orderflow client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/orderflow.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

/// Order an operation applies to, and the coin it was paid with.
#[derive(clap::Args, Debug)]
struct Target {
	#[arg(long)]
	order_id: String,

	/// Payment coin, e.g. ETHUSDT, SOL or STRIPE
	#[arg(long)]
	payment_coin: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Accept an order as the vendor
	Accept {
		#[command(flatten)]
		target: Target,
		#[arg(long)]
		payout_address: Option<String>,
	},
	/// Decline an order as the vendor
	Reject {
		#[command(flatten)]
		target: Target,
	},
	/// Cancel an unconfirmed order as the buyer
	Cancel {
		#[command(flatten)]
		target: Target,
	},
	/// Refund a confirmed order as the vendor
	Refund {
		#[command(flatten)]
		target: Target,
	},
	/// Complete an order and leave a review
	Complete {
		#[command(flatten)]
		target: Target,
		#[arg(long)]
		overall: Option<f64>,
		#[arg(long)]
		quality: Option<f64>,
		#[arg(long)]
		description: Option<f64>,
		#[arg(long)]
		customer_service: Option<f64>,
		#[arg(long)]
		delivery: Option<f64>,
		#[arg(long)]
		review: Option<String>,
		#[arg(long)]
		anonymous: bool,
	},
	/// Mark an order as fulfilled
	Fulfill {
		#[arg(long)]
		order_id: String,
		#[arg(long)]
		note: Option<String>,
		/// The buyer collects the goods in person
		#[arg(long)]
		local_pickup: bool,
		#[arg(long, requires = "tracking_number")]
		shipper: Option<String>,
		#[arg(long, requires = "shipper")]
		tracking_number: Option<String>,
		/// Download location of a digital good
		#[arg(long, conflicts_with_all = ["shipper", "tracking_number", "local_pickup"])]
		url: Option<String>,
		#[arg(long, requires = "url")]
		password: Option<String>,
	},
	/// Open a dispute on an order
	OpenDispute {
		#[arg(long)]
		order_id: String,
		#[arg(long)]
		claim: String,
	},
	/// Resolve a dispute as the moderator
	ResolveDispute {
		#[arg(long)]
		order_id: String,
		#[arg(long)]
		resolution: String,
		#[arg(long)]
		buyer_percentage: f64,
		#[arg(long)]
		vendor_percentage: f64,
	},
	/// Accept the payout of a resolved dispute
	AcceptPayout {
		#[command(flatten)]
		target: Target,
	},
	/// Release escrowed funds after the dispute window expired
	ReleaseEscrow {
		#[arg(long)]
		order_id: String,
	},
}

impl Command {
	/// Splits the command into order id, payment coin and operation.
	fn into_operation(self) -> (String, Option<String>, OrderOperation) {
		match self {
			Command::Accept {
				target,
				payout_address,
			} => (
				target.order_id,
				target.payment_coin,
				OrderOperation::Accept { payout_address },
			),
			Command::Reject { target } => {
				(target.order_id, target.payment_coin, OrderOperation::Reject)
			},
			Command::Cancel { target } => {
				(target.order_id, target.payment_coin, OrderOperation::Cancel)
			},
			Command::Refund { target } => {
				(target.order_id, target.payment_coin, OrderOperation::Refund)
			},
			Command::Complete {
				target,
				overall,
				quality,
				description,
				customer_service,
				delivery,
				review,
				anonymous,
			} => {
				let ratings = Ratings {
					overall,
					quality,
					description,
					customer_service,
					delivery,
				};
				let ratings = (ratings != Ratings::default()).then_some(ratings);
				(
					target.order_id,
					target.payment_coin,
					OrderOperation::Complete(CompletionRequest {
						ratings,
						review,
						anonymous,
					}),
				)
			},
			Command::Fulfill {
				order_id,
				note,
				local_pickup,
				shipper,
				tracking_number,
				url,
				password,
			} => {
				let contract_type = if url.is_some() {
					ContractType::DigitalGood
				} else {
					ContractType::PhysicalGood
				};
				let physical_delivery = shipper
					.zip(tracking_number)
					.map(|(shipper, tracking_number)| PhysicalDelivery {
						shipper,
						tracking_number,
					});
				let digital_delivery = url.map(|url| DigitalDelivery { url, password });
				(
					order_id,
					None,
					OrderOperation::Fulfill(FulfillmentRequest {
						contract_type,
						local_pickup,
						note,
						physical_delivery,
						digital_delivery,
					}),
				)
			},
			Command::OpenDispute { order_id, claim } => {
				(order_id, None, OrderOperation::OpenDispute(DisputeRequest { claim }))
			},
			Command::ResolveDispute {
				order_id,
				resolution,
				buyer_percentage,
				vendor_percentage,
			} => (
				order_id,
				None,
				OrderOperation::ResolveDispute(ResolutionRequest {
					resolution,
					buyer_percentage,
					vendor_percentage,
				}),
			),
			Command::AcceptPayout { target } => (
				target.order_id,
				target.payment_coin,
				OrderOperation::AcceptPayout,
			),
			Command::ReleaseEscrow { order_id } => (order_id, None, OrderOperation::ReleaseEscrow),
		}
	}
}

/// Logs every bus event until the bus goes away.
fn spawn_event_logger(bus: &EventBus) -> tokio::task::JoinHandle<()> {
	let mut events = bus.subscribe();
	tokio::spawn(async move {
		loop {
			match events.recv().await {
				Ok(MarketEvent::Notification(notification)) => {
					tracing::info!(level = ?notification.level, "{}", notification.message)
				},
				Ok(event) => tracing::info!(
					event = event.name(),
					order_id = %event.order_id().map(truncate_id).unwrap_or_default(),
					"Order event"
				),
				Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "Event logger lagged"),
				Err(RecvError::Closed) => break,
			}
		}
	})
}

/// Main entry point for the orderflow client.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the coordinator and the console transaction relay
/// 5. Runs the requested operation and prints the result
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or("configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.client.id);

	let coordinator = CoordinatorBuilder::new(config).build()?;
	let bus = coordinator.event_bus().clone();
	spawn_event_logger(&bus);
	TransactionRelay::spawn(bus, Arc::new(ConsoleExecutor::new()));

	let (order_id, payment_coin, operation) = args.command.into_operation();
	let kind = operation.kind();
	let handle = coordinator.submit(&order_id, payment_coin.as_deref(), operation)?;
	tracing::info!(order_id = %truncate_id(&order_id), %kind, request = %handle.id(), "Submitted");

	let result = handle.await?;
	println!("{}", serde_json::to_string_pretty(&result)?);
	Ok(())
}
