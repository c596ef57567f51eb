//! Multi-file configuration loading.
//!
//! The main file may name other files under `include`, either a single path
//! or an array of paths, resolved against the main file's directory. Their
//! top-level sections are merged into one table and each section may come
//! from one file only. Included files cannot include further files.

use crate::{resolve_env_vars, Config, ConfigError};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Loads a configuration file together with its includes.
pub struct ConfigLoader {
	base_dir: PathBuf,
	/// Canonical paths read so far.
	seen: HashSet<PathBuf>,
	/// Section name to the file that defined it.
	origins: HashMap<String, PathBuf>,
}

impl ConfigLoader {
	pub fn new(base_dir: impl AsRef<Path>) -> Self {
		Self {
			base_dir: base_dir.as_ref().to_path_buf(),
			seen: HashSet::new(),
			origins: HashMap::new(),
		}
	}

	/// Loads `config_path` and every file it includes, then validates.
	pub async fn load_config(
		&mut self,
		config_path: impl AsRef<Path>,
	) -> Result<Config, ConfigError> {
		let main_path = self.locate(config_path.as_ref())?;
		let mut merged = self.read_table(&main_path).await?;
		let includes = take_includes(&mut merged)?;
		self.claim_sections(&merged, &main_path)?;

		for include in includes {
			let path = self.locate(&include)?;
			let table = self.read_table(&path).await?;
			if table.contains_key("include") {
				return Err(ConfigError::Validation(format!(
					"Nested includes are not supported ({})",
					path.display()
				)));
			}
			self.claim_sections(&table, &path)?;
			for (section, value) in table {
				merged.insert(section, value);
			}
		}

		let config: Config = toml::Value::Table(merged).try_into()?;
		config.validate()?;
		Ok(config)
	}

	/// Records `origin` as the source of each section in `table`.
	fn claim_sections(&mut self, table: &toml::Table, origin: &Path) -> Result<(), ConfigError> {
		for section in table.keys() {
			match self.origins.entry(section.clone()) {
				Entry::Occupied(existing) => {
					return Err(ConfigError::Validation(format!(
						"Duplicate section '{}' defined in {} and {}",
						section,
						existing.get().display(),
						origin.display()
					)));
				},
				Entry::Vacant(slot) => {
					slot.insert(origin.to_path_buf());
				},
			}
		}
		Ok(())
	}

	/// Reads one file, substitutes environment variables and parses it.
	async fn read_table(&mut self, path: &Path) -> Result<toml::Table, ConfigError> {
		let canonical = tokio::fs::canonicalize(path).await?;
		if !self.seen.insert(canonical.clone()) {
			return Err(ConfigError::Validation(format!(
				"Include cycle: {} was already loaded",
				canonical.display()
			)));
		}

		let raw = tokio::fs::read_to_string(&canonical).await?;
		let resolved = resolve_env_vars(&raw)?;
		Ok(toml::from_str(&resolved)?)
	}

	fn locate(&self, path: &Path) -> Result<PathBuf, ConfigError> {
		let candidate = if path.is_absolute() {
			path.to_path_buf()
		} else {
			self.base_dir.join(path)
		};

		if !candidate.is_file() {
			return Err(ConfigError::Io(std::io::Error::new(
				std::io::ErrorKind::NotFound,
				format!("Configuration file not found: {}", candidate.display()),
			)));
		}
		Ok(candidate)
	}
}

/// Removes and returns the `include` entry of a table.
fn take_includes(table: &mut toml::Table) -> Result<Vec<PathBuf>, ConfigError> {
	let invalid = || ConfigError::Validation("include must be a path or an array of paths".into());

	match table.remove("include") {
		None => Ok(Vec::new()),
		Some(toml::Value::String(path)) => Ok(vec![PathBuf::from(path)]),
		Some(toml::Value::Array(items)) => items
			.into_iter()
			.map(|item| match item {
				toml::Value::String(path) => Ok(PathBuf::from(path)),
				_ => Err(invalid()),
			})
			.collect(),
		Some(_) => Err(invalid()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	const SERVICE: &str = r#"
[service]
id = "admin-test"
"#;

	const BACKENDS: &str = r#"
[identity]
primary = "static"
[identity.implementations.static]

[storage]
primary = "memory"
[storage.implementations.memory]
"#;

	#[tokio::test]
	async fn test_single_file_config() {
		let temp_dir = TempDir::new().unwrap();
		let config_path = temp_dir.path().join("config.toml");
		fs::write(&config_path, format!("{}{}", SERVICE, BACKENDS)).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config(&config_path).await.unwrap();

		assert_eq!(config.service.id, "admin-test");
		assert_eq!(config.storage.primary, "memory");
	}

	#[tokio::test]
	async fn test_config_with_includes() {
		let temp_dir = TempDir::new().unwrap();
		let main_config = format!("include = [\"backends.toml\"]\n{}", SERVICE);

		fs::write(temp_dir.path().join("main.toml"), main_config).unwrap();
		fs::write(temp_dir.path().join("backends.toml"), BACKENDS).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let config = loader.load_config("main.toml").await.unwrap();

		assert_eq!(config.service.id, "admin-test");
		assert_eq!(config.identity.primary, "static");
	}

	#[tokio::test]
	async fn test_single_string_include() {
		let temp_dir = TempDir::new().unwrap();
		let main_config = format!("include = \"backends.toml\"\n{}", SERVICE);

		fs::write(temp_dir.path().join("main.toml"), main_config).unwrap();
		fs::write(temp_dir.path().join("backends.toml"), BACKENDS).unwrap();

		let config = Config::from_file(temp_dir.path().join("main.toml").to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(config.storage.primary, "memory");
	}

	#[tokio::test]
	async fn test_duplicate_section_error() {
		let temp_dir = TempDir::new().unwrap();
		let main_config = format!("include = [\"duplicate.toml\"]\n{}{}", SERVICE, BACKENDS);

		fs::write(temp_dir.path().join("main.toml"), main_config).unwrap();
		fs::write(temp_dir.path().join("duplicate.toml"), SERVICE).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(err.to_string().contains("Duplicate section 'service'"));
	}

	#[tokio::test]
	async fn test_self_include_detection() {
		let temp_dir = TempDir::new().unwrap();
		let config = format!("include = [\"self.toml\"]\n{}", SERVICE);
		fs::write(temp_dir.path().join("self.toml"), config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("self.toml").await.unwrap_err();
		assert!(err.to_string().contains("already loaded"));
	}

	#[tokio::test]
	async fn test_missing_include_file() {
		let temp_dir = TempDir::new().unwrap();
		let config = format!("include = [\"absent.toml\"]\n{}", SERVICE);
		fs::write(temp_dir.path().join("main.toml"), config).unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(err.to_string().contains("Configuration file not found"));
	}

	#[tokio::test]
	async fn test_nested_include_rejected() {
		let temp_dir = TempDir::new().unwrap();
		fs::write(
			temp_dir.path().join("main.toml"),
			format!("include = \"backends.toml\"\n{}", SERVICE),
		)
		.unwrap();
		fs::write(
			temp_dir.path().join("backends.toml"),
			format!("include = \"more.toml\"\n{}", BACKENDS),
		)
		.unwrap();
		fs::write(temp_dir.path().join("more.toml"), "").unwrap();

		let mut loader = ConfigLoader::new(temp_dir.path());
		let err = loader.load_config("main.toml").await.unwrap_err();
		assert!(err.to_string().contains("Nested includes are not supported"));
	}

	#[test]
	fn test_include_must_be_paths() {
		let mut table: toml::Table = toml::from_str("include = 5").unwrap();
		assert!(take_includes(&mut table).is_err());

		let mut table: toml::Table = toml::from_str("include = [\"a.toml\", 1]").unwrap();
		assert!(take_includes(&mut table).is_err());

		let mut table: toml::Table = toml::from_str("include = [\"a.toml\", \"b.toml\"]").unwrap();
		assert_eq!(
			take_includes(&mut table).unwrap(),
			vec![PathBuf::from("a.toml"), PathBuf::from("b.toml")]
		);
		assert!(!table.contains_key("include"));
	}
}
