//! Lifecycle management for the fulfillment engine.
//!
//! Startup checks, loading of reference data, and shutdown.

use super::{EngineError, FulfillmentEngine};
use serde::Deserialize;
use trigal_types::{Branch, StorageKey, UserProfile};

/// Reference data written to the store before the service starts taking
/// requests: the branch catalog and user profiles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
	#[serde(default)]
	pub branches: Vec<Branch>,
	#[serde(default)]
	pub users: Vec<UserProfile>,
}

impl SeedData {
	/// Parses seed data from its JSON representation.
	pub fn from_json(json: &str) -> Result<Self, EngineError> {
		serde_json::from_str(json)
			.map_err(|e| EngineError::Config(format!("Invalid seed data: {}", e)))
	}
}

impl FulfillmentEngine {
	/// Performs any initialization required before running.
	///
	/// Fails when the store cannot be read.
	pub async fn initialize(&self) -> Result<(), EngineError> {
		tracing::info!(service_id = %self.config.service.id, "Initializing fulfillment engine");

		for key in StorageKey::all() {
			let count = self
				.storage
				.query(key.as_str(), |_: &serde_json::Value| true)
				.await
				.map_err(|e| EngineError::Service(format!("Store unavailable: {}", e)))?
				.len();
			tracing::debug!(collection = key.as_str(), count, "Collection ready");
		}
		Ok(())
	}

	/// Writes seed branches and users, replacing documents with the same id.
	pub async fn seed(&self, data: &SeedData) -> Result<(), EngineError> {
		for branch in &data.branches {
			self.storage
				.store(StorageKey::Branches.as_str(), &branch.id, branch)
				.await
				.map_err(|e| {
					EngineError::Service(format!("Failed to seed branch {}: {}", branch.id, e))
				})?;
		}
		for user in &data.users {
			self.storage
				.store(StorageKey::Users.as_str(), &user.id, user)
				.await
				.map_err(|e| {
					EngineError::Service(format!("Failed to seed user {}: {}", user.id, e))
				})?;
		}

		tracing::info!(
			branches = data.branches.len(),
			users = data.users.len(),
			"Seed data loaded"
		);
		Ok(())
	}

	/// Performs cleanup operations.
	pub async fn shutdown(&self) -> Result<(), EngineError> {
		tracing::info!("Shutting down fulfillment engine");

		let removed = self
			.storage
			.cleanup_expired()
			.await
			.map_err(|e| EngineError::Service(e.to_string()))?;
		if removed > 0 {
			tracing::debug!(removed, "Removed expired entries on shutdown");
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::engine::event_bus::EventBus;
	use std::sync::Arc;
	use trigal_storage::implementations::memory::MemoryStorage;
	use trigal_storage::StorageService;
	use trigal_types::{NewOrder, NewOrderItem, Role};

	const SEED: &str = r#"{
		"branches": [
			{"id": "plant-a", "nombre": "Plant A", "esPlantaProduccion": true},
			{"id": "centro", "nombre": "Sucursal Centro", "esPlantaProduccion": false}
		],
		"users": [
			{"id": "u-1", "email": "centro@trigales.com", "rol": "sucursal", "branchId": "centro", "branchName": "Sucursal Centro"}
		]
	}"#;

	fn engine() -> FulfillmentEngine {
		let config = r#"
			[service]
			id = "trigal-test"

			[storage]
			primary = "memory"
			[storage.implementations.memory]
		"#
		.parse()
		.unwrap();
		FulfillmentEngine::new(
			config,
			Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
			None,
			EventBus::new(16),
		)
	}

	#[tokio::test]
	async fn test_seeded_branch_user_routes_to_branch() {
		let engine = engine();
		engine.initialize().await.unwrap();
		engine.seed(&SeedData::from_json(SEED).unwrap()).await.unwrap();

		let actor = engine
			.resolve_actor("u-1", "")
			.await
			.unwrap()
			.unwrap();
		assert_eq!(actor.role, Role::Branch);

		let id = engine
			.create_order(
				NewOrder {
					items: vec![NewOrderItem {
						product_id: "p1".to_string(),
						description: "Medialunas".to_string(),
						unit_price: rust_decimal::Decimal::from(12),
						quantity: 24,
					}],
					origin_id: Some("plant-a".to_string()),
					..Default::default()
				},
				&actor,
			)
			.await
			.unwrap();

		let order = engine.get_order(&id, &actor).await.unwrap();
		assert_eq!(order.destination_id.as_deref(), Some("centro"));
		assert_eq!(order.origin_name.as_deref(), Some("Plant A"));
		assert!(order.client_name.is_none());

		engine.shutdown().await.unwrap();
	}

	#[test]
	fn test_invalid_seed_data() {
		assert!(matches!(
			SeedData::from_json("{\"branches\": 3}"),
			Err(EngineError::Config(_))
		));
		let empty = SeedData::from_json("{}").unwrap();
		assert!(empty.branches.is_empty());

		let unknown_role = SeedData::from_json(r#"{"users":[{"id":"x","rol":"jefe"}]}"#).unwrap();
		assert_eq!(unknown_role.users[0].role, Role::Unknown);
	}
}
