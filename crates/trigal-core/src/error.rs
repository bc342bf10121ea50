//! Errors returned by every public fulfillment operation.

use thiserror::Error;
use trigal_storage::StorageError;
use trigal_types::OrderStatus;

/// Failure of a core order operation.
///
/// Each variant has a stable machine-readable [`kind`](OrderError::kind) so
/// callers can branch without parsing messages.
#[derive(Debug, Error)]
pub enum OrderError {
	#[error("Unauthorized: {0}")]
	Unauthorized(String),
	#[error("Invalid transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	#[error("Order {order_id} is {status} and can no longer change state")]
	TerminalStateViolation {
		order_id: String,
		status: OrderStatus,
	},
	#[error("Invalid order: {0}")]
	InvalidOrder(String),
	#[error("Invalid origin: {0}")]
	InvalidOrigin(String),
	#[error("Missing destination: {0}")]
	MissingDestination(String),
	#[error("Not found: {0}")]
	NotFound(String),
	#[error("Store unavailable: {0}")]
	StoreUnavailable(String),
}

impl OrderError {
	pub fn kind(&self) -> &'static str {
		match self {
			OrderError::Unauthorized(_) => "UNAUTHORIZED",
			OrderError::InvalidTransition { .. } => "INVALID_TRANSITION",
			OrderError::TerminalStateViolation { .. } => "TERMINAL_STATE_VIOLATION",
			OrderError::InvalidOrder(_) => "INVALID_ORDER",
			OrderError::InvalidOrigin(_) => "INVALID_ORIGIN",
			OrderError::MissingDestination(_) => "MISSING_DESTINATION",
			OrderError::NotFound(_) => "NOT_FOUND",
			OrderError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
		}
	}

	/// Only store outages are worth retrying unchanged.
	pub fn is_retryable(&self) -> bool {
		matches!(self, OrderError::StoreUnavailable(_))
	}

	/// Maps a storage failure on the document `what`.
	pub(crate) fn from_storage(err: StorageError, what: &str) -> Self {
		match err {
			StorageError::NotFound => OrderError::NotFound(what.to_string()),
			other => OrderError::StoreUnavailable(other.to_string()),
		}
	}
}
