//! Storage-related types for the admin system.

/// Tables the order store reads and writes.
///
/// Backends use these names for REST paths, directory names and log fields
/// instead of repeating string literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageTable {
	/// Service order rows.
	ServiceOrders,
	/// Append-only status change log.
	OrderStatusAudit,
}

impl StorageTable {
	/// Returns the table name.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageTable::ServiceOrders => "service_orders",
			StorageTable::OrderStatusAudit => "order_status_audit",
		}
	}
}
