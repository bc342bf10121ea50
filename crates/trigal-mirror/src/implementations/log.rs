//! Log-only mirror, for deployments without an external spreadsheet.

use crate::{MirrorError, MirrorFactory, MirrorInterface, MirrorRegistry};
use async_trait::async_trait;
use trigal_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, OrderSummary, Schema, ValidationError,
};

/// Writes each summary to the log at the configured level.
pub struct LogMirror {
	level: tracing::Level,
}

impl LogMirror {
	pub fn new(level: tracing::Level) -> Self {
		Self { level }
	}
}

#[async_trait]
impl MirrorInterface for LogMirror {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogMirrorSchema)
	}

	async fn send(&self, summary: &OrderSummary) -> Result<(), MirrorError> {
		if self.level == tracing::Level::DEBUG {
			tracing::debug!(order_id = %summary.id, client = %summary.client, total = %summary.total, status = %summary.status, "Order summary");
		} else {
			tracing::info!(order_id = %summary.id, client = %summary.client, total = %summary.total, status = %summary.status, "Order summary");
		}
		Ok(())
	}
}

/// Configuration schema for LogMirror.
pub struct LogMirrorSchema;

impl ConfigSchema for LogMirrorSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![],
			vec![Field::new("level", FieldType::OneOf(vec!["info", "debug"]))],
		)
		.validate(config)
	}
}

/// Factory function to create a log mirror.
///
/// Configuration parameters:
/// - `level`: "info" or "debug" (default: "info")
pub fn create_mirror(config: &toml::Value) -> Result<Box<dyn MirrorInterface>, MirrorError> {
	LogMirrorSchema
		.validate(config)
		.map_err(|e| MirrorError::Configuration(e.to_string()))?;

	let level = match config.get("level").and_then(|v| v.as_str()) {
		Some("debug") => tracing::Level::DEBUG,
		_ => tracing::Level::INFO,
	};
	Ok(Box::new(LogMirror::new(level)))
}

/// Registry for the log mirror implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = MirrorFactory;

	fn factory() -> Self::Factory {
		create_mirror
	}
}

impl MirrorRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_level_must_be_known() {
		let config: toml::Value = toml::from_str("level = \"trace\"").unwrap();
		assert!(create_mirror(&config).is_err());

		let config: toml::Value = toml::from_str("level = \"debug\"").unwrap();
		assert!(create_mirror(&config).is_ok());
	}
}
