//! Fixed token table.
//!
//! Maps configured bearer tokens straight to principals without calling a
//! provider. Meant for local development and tests: tokens are compared with
//! plain string equality, which is not constant-time, so this backend must not
//! front a deployment reachable by untrusted callers.

use crate::{IdentityError, IdentityFactory, IdentityInterface, IdentityRegistry};
use admin_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, Principal, Schema, SecretString,
	ValidationError,
};
use async_trait::async_trait;
use serde::Deserialize;

/// Identity backend answering from a configured token table.
pub struct StaticIdentity {
	tokens: Vec<(SecretString, Principal)>,
}

impl StaticIdentity {
	pub fn new(tokens: Vec<(SecretString, Principal)>) -> Self {
		Self { tokens }
	}
}

#[async_trait]
impl IdentityInterface for StaticIdentity {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(StaticIdentitySchema)
	}

	async fn verify(&self, token: &SecretString) -> Result<Principal, IdentityError> {
		self.tokens
			.iter()
			.find(|(known, _)| known == token)
			.map(|(_, principal)| principal.clone())
			.ok_or_else(|| IdentityError::Unauthenticated("Unknown token".to_string()))
	}
}

/// Configuration schema for StaticIdentity.
pub struct StaticIdentitySchema;

impl ConfigSchema for StaticIdentitySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let token_schema = Schema::new(
			vec![
				Field::new("token", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(token) if !token.is_empty() => Ok(()),
						_ => Err("token cannot be empty".to_string()),
					}
				}),
				Field::new("user_id", FieldType::String),
			],
			vec![Field::new("is_admin", FieldType::Boolean)],
		);
		let schema = Schema::new(
			vec![],
			vec![Field::new(
				"tokens",
				FieldType::Array(Box::new(FieldType::Table(token_schema))),
			)],
		);
		schema.validate(config)
	}
}

#[derive(Deserialize)]
struct StaticIdentityConfig {
	#[serde(default)]
	tokens: Vec<TokenEntry>,
}

#[derive(Deserialize)]
struct TokenEntry {
	token: String,
	user_id: String,
	#[serde(default)]
	is_admin: bool,
}

/// Factory function to create a static identity backend from configuration.
///
/// Configuration parameters:
/// - `tokens`: entries of `{ token, user_id, is_admin }` (`is_admin` defaults to false)
pub fn create_identity(config: &toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError> {
	StaticIdentitySchema
		.validate(config)
		.map_err(|e| IdentityError::Configuration(e.to_string()))?;

	let parsed: StaticIdentityConfig = config
		.clone()
		.try_into()
		.map_err(|e: toml::de::Error| IdentityError::Configuration(e.message().to_string()))?;

	let tokens = parsed
		.tokens
		.into_iter()
		.map(|entry| {
			(
				SecretString::from(entry.token),
				Principal {
					id: entry.user_id,
					is_admin: entry.is_admin,
				},
			)
		})
		.collect();

	Ok(Box::new(StaticIdentity::new(tokens)))
}

/// Registry for the static token table.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "static";
	type Factory = IdentityFactory;

	fn factory() -> Self::Factory {
		create_identity
	}
}

impl IdentityRegistry for Registry {}
