//! Builder for constructing fulfillment engines.
//!
//! Assembles a [`FulfillmentEngine`] from configuration and factory
//! functions for the pluggable storage and mirror backends.

use crate::engine::{event_bus::EventBus, FulfillmentEngine};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use trigal_config::Config;
use trigal_mirror::{MirrorError, MirrorInterface, MirrorService};
use trigal_storage::{StorageError, StorageInterface, StorageService};

/// Capacity of the engine's event bus.
const EVENT_BUS_CAPACITY: usize = 1000;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every pluggable component, keyed by the
/// implementation name used in configuration.
pub struct FulfillmentFactories<SF, MF> {
	pub storage_factories: HashMap<String, SF>,
	pub mirror_factories: HashMap<String, MF>,
}

/// Builder for constructing a FulfillmentEngine with pluggable implementations.
pub struct FulfillmentBuilder {
	config: Config,
}

impl FulfillmentBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine. Only the primary implementation of each component
	/// is used; the others are still constructed so their configuration is
	/// checked at startup.
	pub fn build<SF, MF>(
		self,
		factories: FulfillmentFactories<SF, MF>,
	) -> Result<FulfillmentEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		MF: Fn(&toml::Value) -> Result<Box<dyn MirrorInterface>, MirrorError>,
	{
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			let Some(factory) = factories.storage_factories.get(name) else {
				tracing::warn!(component = "storage", implementation = %name, "Unknown implementation, skipping");
				continue;
			};
			match factory(config) {
				Ok(implementation) => {
					storage_impls.insert(name.clone(), implementation);
					let is_primary = &self.config.storage.primary == name;
					tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
				},
				Err(e) => {
					tracing::error!(
						component = "storage",
						implementation = %name,
						error = %e,
						"Failed to create storage implementation"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create storage implementation '{}': {}",
						name, e
					)));
				},
			}
		}

		let primary_storage = &self.config.storage.primary;
		let storage_backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			BuilderError::MissingComponent(format!(
				"Primary storage '{}' is not available",
				primary_storage
			))
		})?;
		let storage = Arc::new(StorageService::new(storage_backend));

		let mirror = match &self.config.mirror {
			Some(mirror_config) => {
				let mut mirror_impls = HashMap::new();
				for (name, config) in &mirror_config.implementations {
					let Some(factory) = factories.mirror_factories.get(name) else {
						tracing::warn!(component = "mirror", implementation = %name, "Unknown implementation, skipping");
						continue;
					};
					match factory(config) {
						Ok(implementation) => {
							mirror_impls.insert(name.clone(), implementation);
							let is_primary = &mirror_config.primary == name;
							tracing::info!(component = "mirror", implementation = %name, enabled = %is_primary, "Loaded");
						},
						Err(e) => {
							tracing::error!(
								component = "mirror",
								implementation = %name,
								error = %e,
								"Failed to create mirror implementation"
							);
							return Err(BuilderError::Config(format!(
								"Failed to create mirror implementation '{}': {}",
								name, e
							)));
						},
					}
				}

				let backend = mirror_impls.remove(&mirror_config.primary).ok_or_else(|| {
					BuilderError::MissingComponent(format!(
						"Primary mirror '{}' is not available",
						mirror_config.primary
					))
				})?;
				Some(Arc::new(MirrorService::new(backend)))
			},
			None => {
				tracing::info!(component = "mirror", "No mirror configured");
				None
			},
		};

		Ok(FulfillmentEngine::new(
			self.config,
			storage,
			mirror,
			EventBus::new(EVENT_BUS_CAPACITY),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use trigal_mirror::MirrorFactory;
	use trigal_storage::StorageFactory;

	fn factories() -> FulfillmentFactories<StorageFactory, MirrorFactory> {
		FulfillmentFactories {
			storage_factories: trigal_storage::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			mirror_factories: trigal_mirror::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	#[tokio::test]
	async fn test_build_with_memory_storage_and_log_mirror() {
		let config: Config = r#"
			[service]
			id = "trigal-test"

			[storage]
			primary = "memory"
			[storage.implementations.memory]

			[mirror]
			primary = "log"
			[mirror.implementations.log]
			level = "debug"
		"#
		.parse()
		.unwrap();

		let engine = FulfillmentBuilder::new(config).build(factories()).unwrap();
		assert!(engine.mirror_handler.is_some());
		engine.initialize().await.unwrap();
	}

	#[test]
	fn test_invalid_implementation_config_fails() {
		let config: Config = r#"
			[service]
			id = "trigal-test"

			[storage]
			primary = "memory"
			[storage.implementations.memory]

			[mirror]
			primary = "webhook"
			[mirror.implementations.webhook]
			timeout_seconds = 5
		"#
		.parse()
		.unwrap();

		let result = FulfillmentBuilder::new(config).build(factories());
		assert!(matches!(result, Err(BuilderError::Config(_))));
	}

	#[test]
	fn test_without_mirror() {
		let config: Config = r#"
			[service]
			id = "trigal-test"

			[storage]
			primary = "memory"
			[storage.implementations.memory]
		"#
		.parse()
		.unwrap();

		let engine = FulfillmentBuilder::new(config).build(factories()).unwrap();
		assert!(engine.mirror_handler.is_none());
	}
}
