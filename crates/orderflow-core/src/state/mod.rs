//! In-flight request tracking.
//!
//! The ledger guarantees that at most one request per order and slot is in
//! flight; the handle gives callers shared access to its eventual outcome.

pub mod handle;
pub mod ledger;

pub use handle::{OperationOutcome, RequestHandle};
pub use ledger::{Begin, InFlightRequest, RequestLedger};
