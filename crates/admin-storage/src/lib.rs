//! Order store gateway for the admin service.
//!
//! The order store is owned externally; the service only needs a narrow
//! contract over it: read an order's current status, write a new status,
//! and append an audit record. Backends implement that contract through
//! `OrderStoreInterface` and are selected by name from configuration.

use admin_types::{
	AuditRecord, ConfigSchema, ImplementationRegistry, OrderRecord, OrderStatus, StoredStatus,
};
use async_trait::async_trait;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
	pub mod postgrest;
}

/// Errors that can occur during order store operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// No order exists with the given id.
	#[error("Order not found: {0}")]
	NotFound(String),
	/// A guarded write found a different status than the one it expected.
	#[error("Order {order_id} is no longer in status '{expected}'")]
	Conflict { order_id: String, expected: String },
	/// The store refused the request itself, e.g. an id it cannot parse.
	#[error("Request rejected by store: {0}")]
	Rejected(String),
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The backend failed or returned an unusable response.
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Read/update/append contract every order store backend provides.
#[async_trait]
pub trait OrderStoreInterface: Send + Sync {
	/// Returns the configuration schema for this backend.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Reads the current status of an order.
	async fn fetch_status(&self, order_id: &str) -> Result<StoredStatus, StorageError>;

	/// Writes a new status and returns the updated record.
	///
	/// With `expected` set, the write only applies while the stored status
	/// still equals it; otherwise `StorageError::Conflict` is returned and the
	/// order is left untouched. Without it, the write is keyed by id only.
	async fn update_status(
		&self,
		order_id: &str,
		status: OrderStatus,
		expected: Option<&StoredStatus>,
	) -> Result<OrderRecord, StorageError>;

	/// Appends a status change to the audit log.
	async fn append_audit(&self, record: &AuditRecord) -> Result<(), StorageError>;
}

/// Lets callers keep a handle on a backend they hand to `StorageService`.
#[async_trait]
impl<T: OrderStoreInterface + ?Sized> OrderStoreInterface for std::sync::Arc<T> {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		(**self).config_schema()
	}

	async fn fetch_status(&self, order_id: &str) -> Result<StoredStatus, StorageError> {
		(**self).fetch_status(order_id).await
	}

	async fn update_status(
		&self,
		order_id: &str,
		status: OrderStatus,
		expected: Option<&StoredStatus>,
	) -> Result<OrderRecord, StorageError> {
		(**self).update_status(order_id, status, expected).await
	}

	async fn append_audit(&self, record: &AuditRecord) -> Result<(), StorageError> {
		(**self).append_audit(record).await
	}
}

/// Factory signature shared by all order store backends.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn OrderStoreInterface>, StorageError>;

/// Registry trait for order store backends.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Returns `(name, factory)` for every built-in backend.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory, postgrest};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
		(postgrest::Registry::NAME, postgrest::Registry::factory()),
	]
}

/// Order store service wrapping the configured backend.
pub struct StorageService {
	backend: Box<dyn OrderStoreInterface>,
}

impl StorageService {
	pub fn new(backend: Box<dyn OrderStoreInterface>) -> Self {
		Self { backend }
	}

	/// Reads the current status of an order.
	pub async fn fetch_status(&self, order_id: &str) -> Result<StoredStatus, StorageError> {
		let status = self.backend.fetch_status(order_id).await?;
		tracing::debug!(order_id = %order_id, status = %status, "Fetched order status");
		Ok(status)
	}

	/// Writes a new status, optionally guarded by the expected current status.
	pub async fn update_status(
		&self,
		order_id: &str,
		status: OrderStatus,
		expected: Option<&StoredStatus>,
	) -> Result<OrderRecord, StorageError> {
		self.backend.update_status(order_id, status, expected).await
	}

	/// Appends an audit record.
	pub async fn append_audit(&self, record: &AuditRecord) -> Result<(), StorageError> {
		self.backend.append_audit(record).await
	}
}

/// Returns true when `raw` satisfies the `expected` precondition.
///
/// A missing stored value reads as `pending`, matching `StoredStatus::from_raw`.
pub(crate) fn matches_expected(raw: Option<&str>, expected: Option<&StoredStatus>) -> bool {
	match expected {
		None => true,
		Some(expected) => StoredStatus::from_raw(raw) == *expected,
	}
}
