//! File-backed order store.
//!
//! Layout under `storage_path`:
//! - `service_orders/<encoded id>.json`: one JSON document per order,
//!   replaced atomically (write to `.tmp`, then rename).
//! - `order_status_audit.jsonl`: audit entries, one JSON object per line.
//!
//! Writes from this process are serialized by a lock so a guarded update
//! reads and replaces the document without interleaving. Other processes
//! sharing the directory are not coordinated.

use crate::implementations::memory::{AuditEntry, StoredOrder};
use crate::{
	matches_expected, OrderStoreInterface, StorageError, StorageFactory, StorageRegistry,
};
use admin_types::{
	AuditRecord, ConfigSchema, Field, FieldType, ImplementationRegistry, OrderRecord, OrderStatus,
	Schema, StorageTable, StoredStatus, ValidationError,
};
use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// File-backed order store.
pub struct FileStorage {
	base_path: PathBuf,
	write_lock: Mutex<()>,
}

impl FileStorage {
	pub fn new(base_path: PathBuf) -> Self {
		Self {
			base_path,
			write_lock: Mutex::new(()),
		}
	}

	/// Maps an order id to its document path.
	///
	/// Ids are opaque, so anything outside `[A-Za-z0-9_-]` is hex-escaped to
	/// keep the name inside the orders directory.
	fn order_path(&self, order_id: &str) -> PathBuf {
		let mut encoded = String::with_capacity(order_id.len());
		for byte in order_id.bytes() {
			if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
				encoded.push(byte as char);
			} else {
				encoded.push_str(&format!("%{:02X}", byte));
			}
		}
		self.base_path
			.join(StorageTable::ServiceOrders.as_str())
			.join(format!("{}.json", encoded))
	}

	fn audit_path(&self) -> PathBuf {
		self.base_path
			.join(format!("{}.jsonl", StorageTable::OrderStatusAudit.as_str()))
	}

	async fn read_order(&self, order_id: &str) -> Result<StoredOrder, StorageError> {
		let data = match fs::read(self.order_path(order_id)).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound(order_id.to_string()))
			},
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};
		serde_json::from_slice(&data).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	async fn write_order(&self, order: &StoredOrder) -> Result<(), StorageError> {
		let path = self.order_path(&order.id);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		let bytes =
			serde_json::to_vec_pretty(order).map_err(|e| StorageError::Serialization(e.to_string()))?;

		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, bytes)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		Ok(())
	}

	/// Creates or replaces an order document.
	pub async fn insert_order(&self, order: &StoredOrder) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		self.write_order(order).await
	}

	/// Reads every audit entry written so far.
	pub async fn audit_entries(&self) -> Result<Vec<AuditEntry>, StorageError> {
		let content = match fs::read_to_string(self.audit_path()).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};
		content
			.lines()
			.filter(|line| !line.trim().is_empty())
			.map(|line| {
				serde_json::from_str(line).map_err(|e| StorageError::Serialization(e.to_string()))
			})
			.collect()
	}
}

#[async_trait]
impl OrderStoreInterface for FileStorage {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}

	async fn fetch_status(&self, order_id: &str) -> Result<StoredStatus, StorageError> {
		let order = self.read_order(order_id).await?;
		Ok(StoredStatus::from_raw(order.status.as_deref()))
	}

	async fn update_status(
		&self,
		order_id: &str,
		status: OrderStatus,
		expected: Option<&StoredStatus>,
	) -> Result<OrderRecord, StorageError> {
		let _guard = self.write_lock.lock().await;

		let mut order = self.read_order(order_id).await?;
		if !matches_expected(order.status.as_deref(), expected) {
			return Err(StorageError::Conflict {
				order_id: order_id.to_string(),
				expected: expected.map(|s| s.to_string()).unwrap_or_default(),
			});
		}

		order.status = Some(status.as_str().to_string());
		order.updated_at = Utc::now();
		self.write_order(&order).await?;

		Ok(OrderRecord {
			id: order.id,
			status,
			updated_at: order.updated_at,
		})
	}

	async fn append_audit(&self, record: &AuditRecord) -> Result<(), StorageError> {
		let mut line = serde_json::to_vec(&AuditEntry::new(record))
			.map_err(|e| StorageError::Serialization(e.to_string()))?;
		line.push(b'\n');

		let _guard = self.write_lock.lock().await;
		fs::create_dir_all(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		let mut file = fs::OpenOptions::new()
			.create(true)
			.append(true)
			.open(self.audit_path())
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		file.write_all(&line)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		file.flush()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		Ok(())
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(vec![], vec![Field::new("storage_path", FieldType::String)]);
		schema.validate(config)
	}
}

/// Factory function to create a file order store from configuration.
///
/// Configuration parameters:
/// - `storage_path`: base directory (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn OrderStoreInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/storage");

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}

/// Registry for the file backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}
