//! Registry of implementation factories.
//!
//! Collects every built-in identity and storage backend by name so the
//! engine can be assembled from whatever the configuration selects.

use admin_config::Config;
use admin_core::{AdminBuilder, AdminEngine, AdminFactories};
use admin_identity::IdentityFactory;
use admin_storage::StorageFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Factories for every known implementation, by family.
pub struct FactoryRegistry {
	pub storage: HashMap<String, StorageFactory>,
	pub identity: HashMap<String, IdentityFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			storage: HashMap::new(),
			identity: HashMap::new(),
		}
	}

	pub fn register_storage(&mut self, name: impl Into<String>, factory: StorageFactory) {
		self.storage.insert(name.into(), factory);
	}

	pub fn register_identity(&mut self, name: impl Into<String>, factory: IdentityFactory) {
		self.identity.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the global registry, filling it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in admin_storage::get_all_implementations() {
			tracing::debug!("Registering storage implementation: {}", name);
			registry.register_storage(name, factory);
		}

		for (name, factory) in admin_identity::get_all_implementations() {
			tracing::debug!("Registering identity implementation: {}", name);
			registry.register_identity(name, factory);
		}

		registry
	})
}

/// Picks the factories named in `configured`, rejecting unknown names.
fn select_factories<F: Copy>(
	available: &HashMap<String, F>,
	configured: &HashMap<String, toml::Value>,
	family: &str,
) -> Result<HashMap<String, F>, String> {
	let mut factories = HashMap::new();
	for name in configured.keys() {
		let Some(factory) = available.get(name) else {
			let mut known: Vec<_> = available.keys().cloned().collect();
			known.sort();
			return Err(format!(
				"Unknown {} implementation '{}'. Available: [{}]",
				family,
				name,
				known.join(", ")
			));
		};
		factories.insert(name.clone(), *factory);
	}
	Ok(factories)
}

/// Builds the engine from configuration using the global registry.
pub fn build_engine_from_config(config: Config) -> Result<AdminEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let factories = AdminFactories {
		storage_factories: select_factories(
			&registry.storage,
			&config.storage.implementations,
			"storage",
		)?,
		identity_factories: select_factories(
			&registry.identity,
			&config.identity.implementations,
			"identity",
		)?,
	};

	Ok(AdminBuilder::new(config).build(factories)?)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::str::FromStr;

	#[test]
	fn test_registry_contains_builtin_backends() {
		let registry = get_registry();
		for name in ["memory", "file", "postgrest"] {
			assert!(registry.storage.contains_key(name));
		}
		for name in ["static", "supabase"] {
			assert!(registry.identity.contains_key(name));
		}
	}

	#[test]
	fn test_unknown_implementation_lists_available() {
		let config = Config::from_str(
			r#"
[service]
id = "admin"

[identity]
primary = "static"
[identity.implementations.static]

[storage]
primary = "memory"
[storage.implementations.memory]
[storage.implementations.redis]
"#,
		)
		.unwrap();

		let err = build_engine_from_config(config).err().unwrap();
		assert_eq!(
			err.to_string(),
			"Unknown storage implementation 'redis'. Available: [file, memory, postgrest]"
		);
	}
}
