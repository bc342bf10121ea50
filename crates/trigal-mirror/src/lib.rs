//! Order summary mirror for the Trigal fulfillment system.
//!
//! After an order is created or changes state, a flattened summary
//! (`{id, cliente, total, estado}`) is pushed to an external system, in
//! production a spreadsheet ingestion endpoint. Mirroring is best-effort:
//! the engine calls it off the request path and only logs failures.

use async_trait::async_trait;
use thiserror::Error;
use trigal_types::{ConfigSchema, ImplementationRegistry, OrderSummary};

/// Re-export implementations
pub mod implementations {
	pub mod log;
	pub mod webhook;
}

/// Errors that can occur while mirroring an order summary.
#[derive(Debug, Error)]
pub enum MirrorError {
	/// The endpoint could not be reached or timed out.
	#[error("Network error: {0}")]
	Network(String),
	/// The endpoint answered with a non-success status.
	#[error("Mirror rejected summary with status {status}")]
	Rejected { status: u16 },
	/// Error that occurs during serialization of the summary.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Invalid implementation configuration.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait implemented by every mirror backend.
#[async_trait]
pub trait MirrorInterface: Send + Sync {
	/// Returns the configuration schema for this mirror implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Pushes one order summary to the external system.
	async fn send(&self, summary: &OrderSummary) -> Result<(), MirrorError>;
}

/// Type alias for mirror factory functions.
pub type MirrorFactory = fn(&toml::Value) -> Result<Box<dyn MirrorInterface>, MirrorError>;

/// Registry trait for mirror implementations.
pub trait MirrorRegistry: ImplementationRegistry<Factory = MirrorFactory> {}

/// Get all registered mirror implementations.
pub fn get_all_implementations() -> Vec<(&'static str, MirrorFactory)> {
	use implementations::{log, webhook};

	vec![
		(log::Registry::NAME, log::Registry::factory()),
		(webhook::Registry::NAME, webhook::Registry::factory()),
	]
}

/// Service wrapping the configured mirror backend.
pub struct MirrorService {
	backend: Box<dyn MirrorInterface>,
}

impl MirrorService {
	pub fn new(backend: Box<dyn MirrorInterface>) -> Self {
		Self { backend }
	}

	/// Sends a summary, logging the outcome.
	///
	/// The error is returned so the caller can report it, but it never
	/// reflects on the order itself.
	pub async fn mirror(&self, summary: &OrderSummary) -> Result<(), MirrorError> {
		match self.backend.send(summary).await {
			Ok(()) => {
				tracing::debug!(order_id = %summary.id, status = %summary.status, "Mirrored order summary");
				Ok(())
			},
			Err(e) => {
				tracing::warn!(order_id = %summary.id, error = %e, "Failed to mirror order summary");
				Err(e)
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;
	use trigal_types::{OrderStatus, Schema, ValidationError};

	struct FlakyMirror {
		calls: Arc<AtomicUsize>,
	}

	struct NoConfig;

	impl ConfigSchema for NoConfig {
		fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
			Schema::new(vec![], vec![]).validate(config)
		}
	}

	#[async_trait]
	impl MirrorInterface for FlakyMirror {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(NoConfig)
		}

		async fn send(&self, _summary: &OrderSummary) -> Result<(), MirrorError> {
			if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
				Err(MirrorError::Rejected { status: 500 })
			} else {
				Ok(())
			}
		}
	}

	#[tokio::test]
	async fn test_mirror_reports_backend_outcome() {
		let calls = Arc::new(AtomicUsize::new(0));
		let service = MirrorService::new(Box::new(FlakyMirror {
			calls: calls.clone(),
		}));
		let summary = OrderSummary {
			id: "o-1".to_string(),
			client: "Sucursal Centro".to_string(),
			total: Default::default(),
			status: OrderStatus::Pending,
		};

		assert!(matches!(
			service.mirror(&summary).await,
			Err(MirrorError::Rejected { status: 500 })
		));
		assert!(service.mirror(&summary).await.is_ok());
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn test_registered_implementations() {
		let names: Vec<_> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["log", "webhook"]);
	}
}
