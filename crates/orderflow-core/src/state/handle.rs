//! Shared handle over the outcome of one in-flight request.

use crate::engine::OperationError;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use orderflow_types::{ActionResult, OperationKind};
use std::fmt;
use std::future::{Future, IntoFuture};
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Result every caller of an operation eventually observes.
pub type OperationOutcome = Result<ActionResult, OperationError>;

type SharedOutcome = Shared<BoxFuture<'static, OperationOutcome>>;

/// Cloneable handle to a running order operation.
///
/// Awaiting any clone yields the same outcome. The operation itself runs as a
/// spawned task, so it completes even if every handle is dropped.
#[derive(Clone)]
pub struct RequestHandle {
	id: Uuid,
	order_id: String,
	kind: OperationKind,
	created_at: DateTime<Utc>,
	outcome: SharedOutcome,
	abort: AbortHandle,
}

impl RequestHandle {
	/// Spawns `task` on the current tokio runtime and wraps it in a handle.
	pub fn spawn<F>(id: Uuid, order_id: &str, kind: OperationKind, task: F) -> Self
	where
		F: Future<Output = OperationOutcome> + Send + 'static,
	{
		let join = tokio::spawn(task);
		let abort = join.abort_handle();
		let outcome = join
			.map(|joined| match joined {
				Ok(outcome) => outcome,
				Err(e) if e.is_cancelled() => Err(OperationError::Aborted),
				Err(e) => Err(OperationError::Internal(e.to_string())),
			})
			.boxed()
			.shared();

		Self {
			id,
			order_id: order_id.to_string(),
			kind,
			created_at: Utc::now(),
			outcome,
			abort,
		}
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	pub fn order_id(&self) -> &str {
		&self.order_id
	}

	pub fn kind(&self) -> OperationKind {
		self.kind
	}

	pub fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}

	/// True if both handles refer to the same request.
	pub fn same_request(&self, other: &RequestHandle) -> bool {
		self.id == other.id
	}

	/// Cancels the operation. Awaiting handles resolve to `OperationError::Aborted`.
	pub fn abort(&self) {
		self.abort.abort();
	}

	pub fn is_finished(&self) -> bool {
		self.abort.is_finished()
	}
}

impl IntoFuture for RequestHandle {
	type Output = OperationOutcome;
	type IntoFuture = SharedOutcome;

	fn into_future(self) -> Self::IntoFuture {
		self.outcome
	}
}

impl fmt::Debug for RequestHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RequestHandle")
			.field("id", &self.id)
			.field("order_id", &self.order_id)
			.field("kind", &self.kind)
			.field("created_at", &self.created_at)
			.finish_non_exhaustive()
	}
}
