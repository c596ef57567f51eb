//! Best-effort audit trail for status changes.

use admin_storage::StorageService;
use admin_types::{AuditRecord, AuditSource, OrderStatus, StoredStatus};
use std::sync::Arc;

/// Appends one audit record per committed status change.
///
/// A failed append is logged and dropped; it never affects the outcome of
/// the change it describes.
pub struct AuditRecorder {
	storage: Arc<StorageService>,
	source: AuditSource,
}

impl AuditRecorder {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			source: AuditSource::AdminFunction,
		}
	}

	/// Records a change from `old_status` (verbatim as stored) to `new_status`.
	pub async fn record(
		&self,
		order_id: &str,
		actor_id: &str,
		old_status: &StoredStatus,
		new_status: OrderStatus,
	) {
		let record = AuditRecord {
			order_id: order_id.to_string(),
			user_id: actor_id.to_string(),
			old_status: old_status.as_str().to_string(),
			new_status,
			source: self.source,
		};

		match self.storage.append_audit(&record).await {
			Ok(()) => {
				tracing::debug!(order_id = %order_id, source = %self.source, "Audit record appended");
			},
			Err(e) => {
				tracing::warn!(
					order_id = %order_id,
					from = %old_status,
					to = %new_status,
					error = %e,
					"Failed to append audit record"
				);
			},
		}
	}
}
