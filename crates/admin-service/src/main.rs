//! Main entry point for the service-order admin service.
//!
//! Serves the privileged endpoint that changes service-order statuses on
//! behalf of verified administrators and records every change in the audit
//! trail.

use admin_config::Config;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the admin service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "ADMIN_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started admin service");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!(
		service = %config.service.id,
		identity = %config.identity.primary,
		storage = %config.storage.primary,
		guarded = config.transition.guard_concurrent_updates,
		"Loaded configuration"
	);

	let api_config = config.api.clone();
	let engine = Arc::new(factory_registry::build_engine_from_config(config)?);

	server::start_server(api_config, engine).await?;

	tracing::info!("Stopped admin service");
	Ok(())
}
