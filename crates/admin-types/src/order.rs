//! Order record types.

use crate::OrderStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post-update view of a service order, as returned by a store write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
	/// Unique order identifier.
	pub id: String,
	/// Status after the write.
	pub status: OrderStatus,
	/// Timestamp assigned by the store on write.
	pub updated_at: DateTime<Utc>,
}
