//! Status transitions for service orders.
//!
//! Checks run in a fixed order and stop at the first failure: the order must
//! exist, the target must be a known status, and the policy must permit the
//! edge. Only then is the store written.

use crate::policy;
use admin_storage::{StorageError, StorageService};
use admin_types::{OrderRecord, OrderStatus, StoredStatus};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while changing an order's status.
#[derive(Debug, Error)]
pub enum TransitionError {
	#[error("Order not found")]
	NotFound(String),
	#[error("Invalid status")]
	InvalidStatus(String),
	#[error("Transition from '{from}' to '{to}' not allowed")]
	DisallowedTransition { from: String, to: OrderStatus },
	/// The stored status changed between the read and the guarded write.
	#[error("Order status changed concurrently (expected '{expected}')")]
	Conflict { expected: String },
	/// The store refused the request as malformed.
	#[error("{0}")]
	Rejected(String),
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<StorageError> for TransitionError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::NotFound(id) => TransitionError::NotFound(id),
			StorageError::Conflict { expected, .. } => TransitionError::Conflict { expected },
			StorageError::Rejected(message) => TransitionError::Rejected(message),
			other => TransitionError::Storage(other.to_string()),
		}
	}
}

/// A committed status change.
#[derive(Debug, Clone)]
pub struct Transition {
	/// Status read before the write, verbatim.
	pub previous: StoredStatus,
	/// Record returned by the store after the write.
	pub order: OrderRecord,
}

/// Validates and applies order status changes.
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
	guard_concurrent_updates: bool,
}

impl OrderStateMachine {
	/// With `guard_concurrent_updates` unset, the write is keyed by order id
	/// only and a concurrent change between read and write goes unnoticed.
	pub fn new(storage: Arc<StorageService>, guard_concurrent_updates: bool) -> Self {
		Self {
			storage,
			guard_concurrent_updates,
		}
	}

	/// Moves `order_id` to the status named by `target`.
	pub async fn transition_order_status(
		&self,
		order_id: &str,
		target: &str,
	) -> Result<Transition, TransitionError> {
		let current = self.storage.fetch_status(order_id).await?;

		let target: OrderStatus = target
			.parse()
			.map_err(|_| TransitionError::InvalidStatus(target.to_string()))?;

		if !policy::is_allowed(&current, target) {
			if let StoredStatus::Known(from) = &current {
				tracing::debug!(
					order_id = %order_id,
					from = %from,
					allowed = ?policy::allowed_targets(*from),
					"Target outside transition table"
				);
			}
			return Err(TransitionError::DisallowedTransition {
				from: current.to_string(),
				to: target,
			});
		}

		let expected = self.guard_concurrent_updates.then_some(&current);
		let order = self
			.storage
			.update_status(order_id, target, expected)
			.await?;

		Ok(Transition {
			previous: current,
			order,
		})
	}
}
