//! Audit trail types.
//!
//! Each committed status change produces one `AuditRecord`. Records are
//! append-only; the service never reads them back.

use crate::OrderStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Component that produced an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSource {
	/// The privileged admin endpoint.
	AdminFunction,
}

impl AuditSource {
	pub fn as_str(&self) -> &'static str {
		match self {
			AuditSource::AdminFunction => "admin_function",
		}
	}
}

impl fmt::Display for AuditSource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A single status change event.
///
/// Field names match the `order_status_audit` table columns. The creation
/// timestamp is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
	/// Order whose status changed.
	pub order_id: String,
	/// Principal that requested the change.
	pub user_id: String,
	/// Status read before the write, verbatim.
	pub old_status: String,
	/// Status written.
	pub new_status: OrderStatus,
	/// Component that performed the change.
	pub source: AuditSource,
}
