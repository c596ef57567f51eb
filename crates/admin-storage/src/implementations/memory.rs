//! In-memory order store.
//!
//! Keeps orders and audit entries in process memory. Useful for tests and
//! local development; nothing survives a restart. Orders can be seeded from
//! configuration and audit writes can be forced to fail, which exercises the
//! best-effort audit path.

use crate::{
	matches_expected, OrderStoreInterface, StorageError, StorageFactory, StorageRegistry,
};
use admin_types::{
	AuditRecord, ConfigSchema, Field, FieldType, ImplementationRegistry, OrderRecord, OrderStatus,
	Schema, StoredStatus, ValidationError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// An order row as held by the local backends.
///
/// `status` stays a raw string so corrupt values can be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOrder {
	pub id: String,
	pub status: Option<String>,
	pub updated_at: DateTime<Utc>,
}

impl StoredOrder {
	pub fn new(id: impl Into<String>, status: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			status: Some(status.into()),
			updated_at: Utc::now(),
		}
	}
}

/// An appended audit record with its store-assigned fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
	pub id: Uuid,
	#[serde(flatten)]
	pub record: AuditRecord,
	pub created_at: DateTime<Utc>,
}

impl AuditEntry {
	pub(crate) fn new(record: &AuditRecord) -> Self {
		Self {
			id: Uuid::new_v4(),
			record: record.clone(),
			created_at: Utc::now(),
		}
	}
}

/// In-memory order store.
#[derive(Default)]
pub struct MemoryStorage {
	orders: Arc<RwLock<HashMap<String, StoredOrder>>>,
	audit: Arc<RwLock<Vec<AuditEntry>>>,
	fail_audit: AtomicBool,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts or replaces an order.
	pub async fn insert_order(&self, order: StoredOrder) {
		self.orders.write().await.insert(order.id.clone(), order);
	}

	/// Returns a copy of an order, if present.
	pub async fn order(&self, order_id: &str) -> Option<StoredOrder> {
		self.orders.read().await.get(order_id).cloned()
	}

	/// Returns every audit entry appended so far.
	pub async fn audit_entries(&self) -> Vec<AuditEntry> {
		self.audit.read().await.clone()
	}

	/// Makes subsequent audit appends fail (or succeed again).
	pub fn set_fail_audit(&self, fail: bool) {
		self.fail_audit.store(fail, Ordering::SeqCst);
	}
}

#[async_trait]
impl OrderStoreInterface for MemoryStorage {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}

	async fn fetch_status(&self, order_id: &str) -> Result<StoredStatus, StorageError> {
		let orders = self.orders.read().await;
		let order = orders
			.get(order_id)
			.ok_or_else(|| StorageError::NotFound(order_id.to_string()))?;
		Ok(StoredStatus::from_raw(order.status.as_deref()))
	}

	async fn update_status(
		&self,
		order_id: &str,
		status: OrderStatus,
		expected: Option<&StoredStatus>,
	) -> Result<OrderRecord, StorageError> {
		let mut orders = self.orders.write().await;
		let order = orders
			.get_mut(order_id)
			.ok_or_else(|| StorageError::NotFound(order_id.to_string()))?;

		if !matches_expected(order.status.as_deref(), expected) {
			return Err(StorageError::Conflict {
				order_id: order_id.to_string(),
				expected: expected.map(|s| s.to_string()).unwrap_or_default(),
			});
		}

		order.status = Some(status.as_str().to_string());
		order.updated_at = Utc::now();

		Ok(OrderRecord {
			id: order.id.clone(),
			status,
			updated_at: order.updated_at,
		})
	}

	async fn append_audit(&self, record: &AuditRecord) -> Result<(), StorageError> {
		if self.fail_audit.load(Ordering::SeqCst) {
			return Err(StorageError::Backend(
				"audit writes are disabled for this store".into(),
			));
		}
		self.audit.write().await.push(AuditEntry::new(record));
		Ok(())
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let order_schema = Schema::new(
			vec![Field::new("id", FieldType::String)],
			vec![Field::new("status", FieldType::String)],
		);
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("fail_audit", FieldType::Boolean),
				Field::new(
					"orders",
					FieldType::Array(Box::new(FieldType::Table(order_schema))),
				),
			],
		);
		schema.validate(config)
	}
}

#[derive(Deserialize)]
struct MemoryStorageConfig {
	#[serde(default)]
	fail_audit: bool,
	#[serde(default)]
	orders: Vec<SeedOrder>,
}

#[derive(Deserialize)]
struct SeedOrder {
	id: String,
	status: Option<String>,
}

/// Factory function to create a memory order store from configuration.
///
/// Configuration parameters:
/// - `fail_audit`: make every audit append fail (default: false)
/// - `orders`: orders to seed, as `[{ id, status }]`
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn OrderStoreInterface>, StorageError> {
	MemoryStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let parsed: MemoryStorageConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| StorageError::Configuration(e.message().to_string()))?;

	let orders = parsed
		.orders
		.into_iter()
		.map(|seed| {
			let order = StoredOrder {
				id: seed.id,
				status: seed.status,
				updated_at: Utc::now(),
			};
			(order.id.clone(), order)
		})
		.collect();

	Ok(Box::new(MemoryStorage {
		orders: Arc::new(RwLock::new(orders)),
		audit: Arc::new(RwLock::new(Vec::new())),
		fail_audit: AtomicBool::new(parsed.fail_audit),
	}))
}

/// Registry for the memory backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use admin_types::AuditSource;

	fn audit(order_id: &str) -> AuditRecord {
		AuditRecord {
			order_id: order_id.to_string(),
			user_id: "admin-1".to_string(),
			old_status: "pending".to_string(),
			new_status: OrderStatus::InProgress,
			source: AuditSource::AdminFunction,
		}
	}

	#[tokio::test]
	async fn test_fetch_and_update() {
		let storage = MemoryStorage::new();
		storage.insert_order(StoredOrder::new("o1", "pending")).await;

		let status = storage.fetch_status("o1").await.unwrap();
		assert_eq!(status, StoredStatus::Known(OrderStatus::Pending));

		let before = storage.order("o1").await.unwrap().updated_at;
		let record = storage
			.update_status("o1", OrderStatus::InProgress, None)
			.await
			.unwrap();
		assert_eq!(record.id, "o1");
		assert_eq!(record.status, OrderStatus::InProgress);
		assert!(record.updated_at >= before);

		let stored = storage.order("o1").await.unwrap();
		assert_eq!(stored.status.as_deref(), Some("in_progress"));
	}

	#[tokio::test]
	async fn test_missing_order() {
		let storage = MemoryStorage::new();
		assert!(matches!(
			storage.fetch_status("nope").await,
			Err(StorageError::NotFound(_))
		));
		assert!(matches!(
			storage
				.update_status("nope", OrderStatus::Cancelled, None)
				.await,
			Err(StorageError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_guarded_update_conflict_leaves_order_untouched() {
		let storage = MemoryStorage::new();
		storage.insert_order(StoredOrder::new("o1", "cancelled")).await;

		let expected = StoredStatus::Known(OrderStatus::Pending);
		let result = storage
			.update_status("o1", OrderStatus::InProgress, Some(&expected))
			.await;
		assert!(matches!(result, Err(StorageError::Conflict { .. })));
		assert_eq!(
			storage.order("o1").await.unwrap().status.as_deref(),
			Some("cancelled")
		);
	}

	#[tokio::test]
	async fn test_audit_append_and_failure_injection() {
		let storage = MemoryStorage::new();
		storage.append_audit(&audit("o1")).await.unwrap();

		storage.set_fail_audit(true);
		assert!(storage.append_audit(&audit("o2")).await.is_err());

		let entries = storage.audit_entries().await;
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].record.order_id, "o1");
	}

	#[tokio::test]
	async fn test_factory_seeds_orders() {
		let config: toml::Value = toml::from_str(
			r#"
fail_audit = true

[[orders]]
id = "o1"
status = "pending"

[[orders]]
id = "o2"
"#,
		)
		.unwrap();

		let storage = create_storage(&config).unwrap();
		assert_eq!(
			storage.fetch_status("o1").await.unwrap(),
			StoredStatus::Known(OrderStatus::Pending)
		);
		// Seeded without a status: reads as pending.
		assert_eq!(
			storage.fetch_status("o2").await.unwrap(),
			StoredStatus::Known(OrderStatus::Pending)
		);
		assert!(storage.append_audit(&audit("o1")).await.is_err());
	}

	#[test]
	fn test_factory_rejects_bad_config() {
		let config: toml::Value = toml::from_str("fail_audit = \"yes\"").unwrap();
		assert!(matches!(
			create_storage(&config),
			Err(StorageError::Configuration(_))
		));
	}
}
