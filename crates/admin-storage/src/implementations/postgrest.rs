//! PostgREST order store.
//!
//! Talks to the hosted database's REST interface with the service-role key,
//! which bypasses row-level security. Orders live in `service_orders` and
//! audit records are inserted into `order_status_audit`.

use crate::{OrderStoreInterface, StorageError, StorageFactory, StorageRegistry};
use admin_types::{
	AuditRecord, ConfigSchema, Field, FieldType, ImplementationRegistry, OrderRecord, OrderStatus,
	Schema, SecretString, StorageTable, StoredStatus, ValidationError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Row shape returned when reading an order's status.
#[derive(Debug, Deserialize)]
struct StatusRow {
	#[allow(dead_code)]
	id: String,
	status: Option<String>,
}

/// Row shape returned by the status update.
#[derive(Debug, Deserialize)]
struct UpdatedRow {
	id: String,
	status: String,
	updated_at: DateTime<Utc>,
}

/// Order store backed by a PostgREST endpoint.
pub struct PostgrestStorage {
	client: Client,
	base_url: String,
	service_role_key: SecretString,
}

impl PostgrestStorage {
	pub fn new(
		base_url: impl Into<String>,
		service_role_key: SecretString,
		timeout: Duration,
	) -> Result<Self, StorageError> {
		let client = Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| StorageError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
			service_role_key,
		})
	}

	fn table_url(&self, table: StorageTable) -> String {
		format!("{}/rest/v1/{}", self.base_url, table.as_str())
	}

	/// Attaches the service-role credentials to a request.
	fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
		request
			.header("apikey", self.service_role_key.expose_secret())
			.header("Authorization", self.service_role_key.bearer_header())
	}

	async fn send(&self, request: RequestBuilder) -> Result<Response, StorageError> {
		let response = self
			.authorized(request)
			.send()
			.await
			.map_err(|e| StorageError::Backend(format!("Request failed: {}", e)))?;

		let status = response.status();
		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		let message = format!("Store returned {}: {}", status, body);
		// 401/403 mean our own key is wrong, not that the caller asked badly.
		if status.is_client_error()
			&& status != StatusCode::UNAUTHORIZED
			&& status != StatusCode::FORBIDDEN
		{
			Err(StorageError::Rejected(message))
		} else {
			Err(StorageError::Backend(message))
		}
	}
}

/// Builds the PostgREST filter for the expected current status.
///
/// A null column reads as `pending`, so expecting `pending` must also match
/// rows with no status.
fn expected_filter(expected: &StoredStatus) -> (&'static str, String) {
	match expected {
		StoredStatus::Known(OrderStatus::Pending) => {
			("or", "(status.eq.pending,status.is.null)".to_string())
		},
		other => ("status", format!("eq.{}", other.as_str())),
	}
}

#[async_trait]
impl OrderStoreInterface for PostgrestStorage {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(PostgrestStorageSchema)
	}

	async fn fetch_status(&self, order_id: &str) -> Result<StoredStatus, StorageError> {
		let request = self
			.client
			.get(self.table_url(StorageTable::ServiceOrders))
			.query(&[
				("select", "id,status".to_string()),
				("id", format!("eq.{}", order_id)),
			]);

		let rows: Vec<StatusRow> = self
			.send(request)
			.await?
			.json()
			.await
			.map_err(|e| StorageError::Serialization(e.to_string()))?;

		let row = rows
			.into_iter()
			.next()
			.ok_or_else(|| StorageError::NotFound(order_id.to_string()))?;
		Ok(StoredStatus::from_raw(row.status.as_deref()))
	}

	async fn update_status(
		&self,
		order_id: &str,
		status: OrderStatus,
		expected: Option<&StoredStatus>,
	) -> Result<OrderRecord, StorageError> {
		let mut query = vec![
			("select", "id,status,updated_at".to_string()),
			("id", format!("eq.{}", order_id)),
		];
		if let Some(expected) = expected {
			query.push(expected_filter(expected));
		}

		let request = self
			.client
			.patch(self.table_url(StorageTable::ServiceOrders))
			.query(&query)
			.header("Prefer", "return=representation")
			.json(&serde_json::json!({ "status": status.as_str() }));

		let rows: Vec<UpdatedRow> = self
			.send(request)
			.await?
			.json()
			.await
			.map_err(|e| StorageError::Serialization(e.to_string()))?;

		let Some(row) = rows.into_iter().next() else {
			// No row matched the filters.
			return Err(match expected {
				Some(expected) => StorageError::Conflict {
					order_id: order_id.to_string(),
					expected: expected.to_string(),
				},
				None => StorageError::NotFound(order_id.to_string()),
			});
		};

		let written = row.status.parse::<OrderStatus>().map_err(|e| {
			StorageError::Serialization(format!("Store echoed an unexpected status: {}", e))
		})?;

		Ok(OrderRecord {
			id: row.id,
			status: written,
			updated_at: row.updated_at,
		})
	}

	async fn append_audit(&self, record: &AuditRecord) -> Result<(), StorageError> {
		let request = self
			.client
			.post(self.table_url(StorageTable::OrderStatusAudit))
			.header("Prefer", "return=minimal")
			.json(record);

		self.send(request).await?;
		Ok(())
	}
}

/// Configuration schema for PostgrestStorage.
pub struct PostgrestStorageSchema;

impl ConfigSchema for PostgrestStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("url", FieldType::Url),
				Field::new("service_role_key", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(key) if !key.trim().is_empty() => Ok(()),
						_ => Err("service_role_key cannot be empty".to_string()),
					}
				}),
			],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create a PostgREST order store from configuration.
///
/// Configuration parameters:
/// - `url`: project base URL; tables are under `{url}/rest/v1/`
/// - `service_role_key`: privileged key sent as `apikey` and bearer token
/// - `timeout_seconds`: per-request timeout (default: 10)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn OrderStoreInterface>, StorageError> {
	PostgrestStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;

	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| StorageError::Configuration("url is required".into()))?;
	let key = config
		.get("service_role_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| StorageError::Configuration("service_role_key is required".into()))?;
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(PostgrestStorage::new(
		url,
		SecretString::from(key),
		Duration::from_secs(timeout),
	)?))
}

/// Registry for the PostgREST backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "postgrest";
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
	use mockito::{Matcher, Server};

	const KEY: &str = "service-role-key";

	fn storage(url: &str) -> PostgrestStorage {
		PostgrestStorage::new(url, SecretString::from(KEY), Duration::from_secs(5)).unwrap()
	}

	#[tokio::test]
	async fn test_fetch_status_sends_credentials_and_filter() {
		let mut server = Server::new_async().await;
		let mock = server
			.mock("GET", "/rest/v1/service_orders")
			.match_header("apikey", KEY)
			.match_header("authorization", "Bearer service-role-key")
			.match_query(Matcher::AllOf(vec![
				Matcher::UrlEncoded("select".into(), "id,status".into()),
				Matcher::UrlEncoded("id".into(), "eq.o1".into()),
			]))
			.with_status(200)
			.with_body(r#"[{"id":"o1","status":"awaiting_payment"}]"#)
			.create_async()
			.await;

		let status = storage(&server.url()).fetch_status("o1").await.unwrap();
		assert_eq!(status, StoredStatus::Known(OrderStatus::AwaitingPayment));
		mock.assert_async().await;
	}

	#[tokio::test]
	async fn test_fetch_status_null_and_missing_rows() {
		let mut server = Server::new_async().await;
		server
			.mock("GET", "/rest/v1/service_orders")
			.match_query(Matcher::UrlEncoded("id".into(), "eq.o1".into()))
			.with_status(200)
			.with_body(r#"[{"id":"o1","status":null}]"#)
			.create_async()
			.await;
		server
			.mock("GET", "/rest/v1/service_orders")
			.match_query(Matcher::UrlEncoded("id".into(), "eq.o2".into()))
			.with_status(200)
			.with_body("[]")
			.create_async()
			.await;

		let store = storage(&server.url());
		assert_eq!(
			store.fetch_status("o1").await.unwrap(),
			StoredStatus::Known(OrderStatus::Pending)
		);
		assert!(matches!(
			store.fetch_status("o2").await,
			Err(StorageError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_backend_error_status() {
		let mut server = Server::new_async().await;
		server
			.mock("GET", "/rest/v1/service_orders")
			.match_query(Matcher::Any)
			.with_status(503)
			.with_body("unavailable")
			.create_async()
			.await;

		let result = storage(&server.url()).fetch_status("o1").await;
		assert!(matches!(result, Err(StorageError::Backend(msg)) if msg.contains("503")));
	}

	#[tokio::test]
	async fn test_client_error_is_rejected() {
		let mut server = Server::new_async().await;
		server
			.mock("GET", "/rest/v1/service_orders")
			.match_query(Matcher::Any)
			.with_status(400)
			.with_body(r#"{"code":"22P02","message":"invalid input syntax for type uuid: \"o1\""}"#)
			.create_async()
			.await;

		let result = storage(&server.url()).fetch_status("o1").await;
		assert!(matches!(result, Err(StorageError::Rejected(msg)) if msg.contains("22P02")));
	}

	#[tokio::test]
	async fn test_unauthorized_key_is_backend_error() {
		let mut server = Server::new_async().await;
		server
			.mock("PATCH", "/rest/v1/service_orders")
			.match_query(Matcher::Any)
			.with_status(401)
			.with_body(r#"{"message":"Invalid API key"}"#)
			.create_async()
			.await;

		let result = storage(&server.url())
			.update_status("o1", OrderStatus::Completed, None)
			.await;
		assert!(matches!(result, Err(StorageError::Backend(msg)) if msg.contains("401")));
	}

	#[tokio::test]
	async fn test_update_status_returns_representation() {
		let mut server = Server::new_async().await;
		let mock = server
			.mock("PATCH", "/rest/v1/service_orders")
			.match_header("prefer", "return=representation")
			.match_query(Matcher::AllOf(vec![
				Matcher::UrlEncoded("select".into(), "id,status,updated_at".into()),
				Matcher::UrlEncoded("id".into(), "eq.o1".into()),
			]))
			.match_body(Matcher::Json(serde_json::json!({ "status": "in_progress" })))
			.with_status(200)
			.with_body(
				r#"[{"id":"o1","status":"in_progress","updated_at":"2024-05-01T10:00:00.123456+00:00"}]"#,
			)
			.create_async()
			.await;

		let record = storage(&server.url())
			.update_status("o1", OrderStatus::InProgress, None)
			.await
			.unwrap();
		assert_eq!(record.id, "o1");
		assert_eq!(record.status, OrderStatus::InProgress);
		mock.assert_async().await;
	}

	#[tokio::test]
	async fn test_guarded_update_without_match_is_conflict() {
		let mut server = Server::new_async().await;
		let mock = server
			.mock("PATCH", "/rest/v1/service_orders")
			.match_query(Matcher::AllOf(vec![
				Matcher::UrlEncoded("id".into(), "eq.o1".into()),
				Matcher::UrlEncoded("or".into(), "(status.eq.pending,status.is.null)".into()),
			]))
			.with_status(200)
			.with_body("[]")
			.create_async()
			.await;

		let expected = StoredStatus::Known(OrderStatus::Pending);
		let result = storage(&server.url())
			.update_status("o1", OrderStatus::Cancelled, Some(&expected))
			.await;
		assert!(matches!(result, Err(StorageError::Conflict { .. })));
		mock.assert_async().await;
	}

	#[test]
	fn test_expected_filter() {
		assert_eq!(
			expected_filter(&StoredStatus::Known(OrderStatus::InProgress)),
			("status", "eq.in_progress".to_string())
		);
		assert_eq!(
			expected_filter(&StoredStatus::Unrecognized("archived".into())),
			("status", "eq.archived".to_string())
		);
	}

	#[tokio::test]
	async fn test_append_audit_posts_record() {
		let mut server = Server::new_async().await;
		let mock = server
			.mock("POST", "/rest/v1/order_status_audit")
			.match_header("prefer", "return=minimal")
			.match_body(Matcher::Json(serde_json::json!({
				"order_id": "o1",
				"user_id": "admin-1",
				"old_status": "pending",
				"new_status": "in_progress",
				"source": "admin_function",
			})))
			.with_status(201)
			.create_async()
			.await;

		storage(&server.url())
			.append_audit(&AuditRecord {
				order_id: "o1".to_string(),
				user_id: "admin-1".to_string(),
				old_status: "pending".to_string(),
				new_status: OrderStatus::InProgress,
				source: AuditSource::AdminFunction,
			})
			.await
			.unwrap();
		mock.assert_async().await;
	}

	#[test]
	fn test_factory_requires_key() {
		let config: toml::Value = toml::from_str(r#"url = "https://project.example.co""#).unwrap();
		assert!(matches!(
			create_storage(&config),
			Err(StorageError::Configuration(_))
		));
	}
}
