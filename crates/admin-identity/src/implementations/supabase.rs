//! Supabase Auth identity backend.
//!
//! Verifies a caller by asking the auth server who the token belongs to
//! (`GET {url}/auth/v1/user`). The project's public key goes in the `apikey`
//! header; the caller's token is forwarded as the bearer credential. The
//! admin role is read from `user_metadata.is_admin`.

use crate::{IdentityError, IdentityFactory, IdentityInterface, IdentityRegistry};
use admin_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Principal, Schema, SecretString,
	ValidationError,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Subset of the auth server's user object.
#[derive(Debug, Deserialize)]
struct AuthUser {
	#[serde(default)]
	id: String,
	#[serde(default)]
	user_metadata: Option<serde_json::Value>,
}

impl AuthUser {
	/// Only the JSON boolean `true` grants admin; `"true"` or `1` do not.
	fn is_admin(&self) -> bool {
		self.user_metadata
			.as_ref()
			.and_then(|metadata| metadata.get("is_admin"))
			.is_some_and(|flag| *flag == serde_json::Value::Bool(true))
	}
}

/// Identity backend verifying tokens against Supabase Auth.
pub struct SupabaseIdentity {
	client: Client,
	base_url: String,
	anon_key: SecretString,
}

impl SupabaseIdentity {
	pub fn new(
		base_url: impl Into<String>,
		anon_key: SecretString,
		timeout: Duration,
	) -> Result<Self, IdentityError> {
		let client = Client::builder().timeout(timeout).build().map_err(|e| {
			IdentityError::Configuration(format!("Failed to build HTTP client: {}", e))
		})?;

		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
			anon_key,
		})
	}
}

#[async_trait]
impl IdentityInterface for SupabaseIdentity {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SupabaseIdentitySchema)
	}

	async fn verify(&self, token: &SecretString) -> Result<Principal, IdentityError> {
		let response = self
			.client
			.get(format!("{}/auth/v1/user", self.base_url))
			.header("apikey", self.anon_key.expose_secret())
			.header("Authorization", token.bearer_header())
			.send()
			.await
			.map_err(|e| IdentityError::Provider(format!("Auth request failed: {}", e)))?;

		let status = response.status();
		if !status.is_success() {
			return Err(IdentityError::Unauthenticated(format!(
				"Auth server rejected credential ({})",
				status
			)));
		}

		let user: AuthUser = response.json().await.map_err(|e| {
			IdentityError::Unauthenticated(format!("Unreadable auth response: {}", e))
		})?;
		if user.id.is_empty() {
			return Err(IdentityError::Unauthenticated(
				"Auth response carried no user id".to_string(),
			));
		}

		Ok(Principal {
			is_admin: user.is_admin(),
			id: user.id,
		})
	}
}

/// Configuration schema for SupabaseIdentity.
pub struct SupabaseIdentitySchema;

impl ConfigSchema for SupabaseIdentitySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("url", FieldType::Url),
				Field::new("anon_key", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(key) if !key.trim().is_empty() => Ok(()),
						_ => Err("anon_key cannot be empty".to_string()),
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

/// Factory function to create a Supabase identity backend from configuration.
///
/// Configuration parameters:
/// - `url`: project base URL
/// - `anon_key`: public key sent as `apikey`
/// - `timeout_seconds`: per-request timeout (default: 10)
pub fn create_identity(config: &toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError> {
	SupabaseIdentitySchema
		.validate(config)
		.map_err(|e| IdentityError::Configuration(e.to_string()))?;

	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| IdentityError::Configuration("url is required".into()))?;
	let anon_key = config
		.get("anon_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| IdentityError::Configuration("anon_key is required".into()))?;
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|v| v as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(SupabaseIdentity::new(
		url,
		SecretString::from(anon_key),
		Duration::from_secs(timeout),
	)?))
}

/// Registry for the Supabase Auth backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "supabase";
	type Factory = IdentityFactory;

	fn factory() -> Self::Factory {
		create_identity
	}
}

impl IdentityRegistry for Registry {}
