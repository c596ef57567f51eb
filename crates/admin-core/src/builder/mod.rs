//! Builder for constructing an `AdminEngine`.
//!
//! Every configured implementation is constructed through its factory, so
//! a broken table fails startup even when it is not the primary. The
//! primary of each family is then wrapped in its service.

use crate::engine::AdminEngine;
use admin_config::Config;
use admin_identity::{IdentityError, IdentityInterface, IdentityService};
use admin_storage::{OrderStoreInterface, StorageError, StorageService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by name.
pub struct AdminFactories<SF, IF> {
	pub storage_factories: HashMap<String, SF>,
	pub identity_factories: HashMap<String, IF>,
}

/// Builder for constructing an AdminEngine with pluggable implementations.
pub struct AdminBuilder {
	config: Config,
}

impl AdminBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine using the given factories.
	pub fn build<SF, IF>(self, factories: AdminFactories<SF, IF>) -> Result<AdminEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn OrderStoreInterface>, StorageError>,
		IF: Fn(&toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError>,
	{
		let storage_backend = build_primary(
			"storage",
			&self.config.storage.primary,
			&self.config.storage.implementations,
			&factories.storage_factories,
		)?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let identity_backend = build_primary(
			"identity",
			&self.config.identity.primary,
			&self.config.identity.implementations,
			&factories.identity_factories,
		)?;
		let identity = Arc::new(IdentityService::new(identity_backend));

		Ok(AdminEngine::new(self.config, identity, storage))
	}
}

/// Constructs every configured implementation of one family and returns the
/// primary.
fn build_primary<T, E, F>(
	component: &str,
	primary: &str,
	configs: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
) -> Result<T, BuilderError>
where
	E: Display,
	F: Fn(&toml::Value) -> Result<T, E>,
{
	let mut implementations = HashMap::new();
	for (name, config) in configs {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component = %component, implementation = %name, "Unknown implementation, skipping");
			continue;
		};
		match factory(config) {
			Ok(implementation) => {
				let is_primary = primary == name;
				tracing::info!(component = %component, implementation = %name, enabled = %is_primary, "Loaded");
				implementations.insert(name.clone(), implementation);
			},
			Err(e) => {
				tracing::error!(
					component = %component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	implementations.remove(primary).ok_or_else(|| {
		BuilderError::MissingComponent(format!(
			"Primary {} '{}' is not a known implementation",
			component, primary
		))
	})
}
