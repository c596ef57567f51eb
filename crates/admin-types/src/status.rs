//! Order status types.
//!
//! A service order moves through a closed set of six lifecycle states.
//! `OrderStatus` is that set; `StoredStatus` is what a store hands back on
//! read, which may be a value outside the set when persisted data is corrupt.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string does not name one of the six statuses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid status: '{0}'")]
pub struct UnknownStatus(pub String);

/// Lifecycle state of a service order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Order created, nothing decided yet.
	Pending,
	/// Waiting for the customer to approve the quote.
	AwaitingApproval,
	/// Approved, waiting for payment.
	AwaitingPayment,
	/// Work is being carried out.
	InProgress,
	/// Work delivered.
	Completed,
	/// Order cancelled. Terminal.
	Cancelled,
}

impl OrderStatus {
	/// Every status, in workflow order.
	pub const ALL: [OrderStatus; 6] = [
		OrderStatus::Pending,
		OrderStatus::AwaitingApproval,
		OrderStatus::AwaitingPayment,
		OrderStatus::InProgress,
		OrderStatus::Completed,
		OrderStatus::Cancelled,
	];

	/// Returns the wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::AwaitingApproval => "awaiting_approval",
			OrderStatus::AwaitingPayment => "awaiting_payment",
			OrderStatus::InProgress => "in_progress",
			OrderStatus::Completed => "completed",
			OrderStatus::Cancelled => "cancelled",
		}
	}

	/// Returns an iterator over all statuses.
	pub fn all() -> impl Iterator<Item = Self> {
		Self::ALL.into_iter()
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = UnknownStatus;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::all()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| UnknownStatus(s.to_string()))
	}
}

/// Status as read back from an order store.
///
/// Stores are owned externally and may hold values that were never written
/// by this service. Those are kept verbatim instead of failing the read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredStatus {
	/// One of the six known statuses.
	Known(OrderStatus),
	/// A persisted value outside the status set.
	Unrecognized(String),
}

impl StoredStatus {
	/// Interprets a raw stored value. A missing value reads as `pending`.
	pub fn from_raw(raw: Option<&str>) -> Self {
		match raw {
			None => StoredStatus::Known(OrderStatus::Pending),
			Some(value) => match value.parse::<OrderStatus>() {
				Ok(status) => StoredStatus::Known(status),
				Err(_) => StoredStatus::Unrecognized(value.to_string()),
			},
		}
	}

	/// Returns the stored value as text.
	pub fn as_str(&self) -> &str {
		match self {
			StoredStatus::Known(status) => status.as_str(),
			StoredStatus::Unrecognized(raw) => raw,
		}
	}
}

impl From<OrderStatus> for StoredStatus {
	fn from(status: OrderStatus) -> Self {
		StoredStatus::Known(status)
	}
}

impl fmt::Display for StoredStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_every_status() {
		for status in OrderStatus::all() {
			assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
		}
	}

	#[test]
	fn test_parse_rejects_unknown_values() {
		let err = "shipped".parse::<OrderStatus>().unwrap_err();
		assert_eq!(err, UnknownStatus("shipped".to_string()));
		assert!("IN_PROGRESS".parse::<OrderStatus>().is_err());
		assert!("".parse::<OrderStatus>().is_err());
	}

	#[test]
	fn test_serde_uses_snake_case() {
		let json = serde_json::to_string(&OrderStatus::AwaitingApproval).unwrap();
		assert_eq!(json, "\"awaiting_approval\"");

		let status: OrderStatus = serde_json::from_str("\"in_progress\"").unwrap();
		assert_eq!(status, OrderStatus::InProgress);
	}

	#[test]
	fn test_stored_status_defaults_missing_to_pending() {
		assert_eq!(
			StoredStatus::from_raw(None),
			StoredStatus::Known(OrderStatus::Pending)
		);
	}

	#[test]
	fn test_stored_status_keeps_corrupt_values() {
		let stored = StoredStatus::from_raw(Some("archived"));
		assert_eq!(stored, StoredStatus::Unrecognized("archived".to_string()));
		assert_eq!(stored.as_str(), "archived");
	}
}
