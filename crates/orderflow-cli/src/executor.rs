//! Console-driven transaction executor.
//!
//! Prints the payment instructions and waits for the operator to submit the
//! transaction with an external wallet and paste back its hash or signature.

use async_trait::async_trait;
use orderflow_core::{TransactionExecutor, TransactionRequest};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

pub struct ConsoleExecutor {
	stdin: Mutex<BufReader<tokio::io::Stdin>>,
}

impl ConsoleExecutor {
	pub fn new() -> Self {
		Self {
			stdin: Mutex::new(BufReader::new(tokio::io::stdin())),
		}
	}
}

impl Default for ConsoleExecutor {
	fn default() -> Self {
		Self::new()
	}
}

/// Text shown to the operator for a transaction request.
pub fn render_request(request: &TransactionRequest) -> String {
	let instructions = serde_json::to_string_pretty(&request.instructions)
		.unwrap_or_else(|_| request.instructions.to_string());
	format!(
		"Payment required for order {} on {}:\n{}\nTransaction id (empty to cancel): ",
		request.order_id, request.network, instructions
	)
}

/// Interprets the operator's answer. An empty answer rejects the transaction.
pub fn parse_answer(line: &str) -> Result<Value, String> {
	match line.trim() {
		"" => Err("Transaction rejected by user".into()),
		id => Ok(json!(id)),
	}
}

#[async_trait]
impl TransactionExecutor for ConsoleExecutor {
	async fn execute(&self, request: TransactionRequest) -> Result<Value, String> {
		let mut stdout = tokio::io::stdout();
		stdout
			.write_all(render_request(&request).as_bytes())
			.await
			.map_err(|e| e.to_string())?;
		stdout.flush().await.map_err(|e| e.to_string())?;

		let mut line = String::new();
		self.stdin
			.lock()
			.await
			.read_line(&mut line)
			.await
			.map_err(|e| e.to_string())?;
		parse_answer(&line)
	}
}
