//! Main entry point for the Trigal fulfillment service.
//!
//! Loads configuration, wires the configured storage and mirror backends into
//! a fulfillment engine, optionally loads seed data, and serves the HTTP API
//! next to the engine's background loop.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trigal_config::Config;
use trigal_core::{FulfillmentBuilder, FulfillmentEngine, FulfillmentFactories, SeedData};

mod apis;
mod server;

use trigal_mirror::implementations::log::create_mirror as create_log_mirror;
use trigal_mirror::implementations::webhook::create_mirror as create_webhook_mirror;
use trigal_storage::implementations::file::create_storage as create_file_storage;
use trigal_storage::implementations::memory::create_storage as create_memory_storage;

/// Command-line arguments for the fulfillment service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/trigal.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	/// JSON file with branches and users to load before serving
	#[arg(long)]
	seed: Option<PathBuf>,
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

	tracing::info!("Started trigal");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let engine = Arc::new(build_engine(config.clone())?);
	engine.initialize().await?;

	if let Some(seed_path) = &args.seed {
		engine.seed(&load_seed(seed_path).await?).await?;
	}

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			let engine_task = engine.run();
			let api_task = server::start_server(api_config, Arc::clone(&engine));

			tokio::select! {
				result = engine_task => {
					tracing::info!("Engine finished");
					result?;
				}
				result = api_task => {
					tracing::info!("API server finished");
					result?;
				}
			}
		},
		None => {
			tracing::info!("Starting engine only");
			engine.run().await?;
		},
	}

	engine.shutdown().await?;
	tracing::info!("Stopped trigal");
	Ok(())
}

/// Reads seed data from a JSON file.
async fn load_seed(path: &Path) -> Result<SeedData, Box<dyn std::error::Error>> {
	let json = tokio::fs::read_to_string(path).await?;
	Ok(SeedData::from_json(&json)?)
}

/// Macro to create a factory HashMap with the appropriate type aliases
macro_rules! create_factory_map {
    ($interface:path, $error:path, $( $name:literal => $factory:expr ),* $(,)?) => {{
        let mut factories = std::collections::HashMap::new();
        $(
            factories.insert(
                $name.to_string(),
                $factory as fn(&toml::Value) -> Result<Box<dyn $interface>, $error>
            );
        )*
        factories
    }};
}

/// Builds the engine with every available storage and mirror implementation.
fn build_engine(config: Config) -> Result<FulfillmentEngine, Box<dyn std::error::Error>> {
	let builder = FulfillmentBuilder::new(config);

	let storage_factories = create_factory_map!(
		trigal_storage::StorageInterface,
		trigal_storage::StorageError,
		"file" => create_file_storage,
		"memory" => create_memory_storage,
	);

	let mirror_factories = create_factory_map!(
		trigal_mirror::MirrorInterface,
		trigal_mirror::MirrorError,
		"log" => create_log_mirror,
		"webhook" => create_webhook_mirror,
	);

	let factories = FulfillmentFactories {
		storage_factories,
		mirror_factories,
	};

	Ok(builder.build(factories)?)
}
