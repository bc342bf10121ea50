//! Forwards order summaries to the external mirror.
//!
//! Runs on tasks spawned by the engine loop, after the store has accepted
//! the write. Failures are reported on the event bus and otherwise dropped.

use crate::engine::event_bus::EventBus;
use std::sync::Arc;
use tracing::instrument;
use trigal_mirror::MirrorService;
use trigal_types::{truncate_id, FulfillmentEvent, MirrorEvent, Order};

/// Handler that mirrors created and updated orders.
pub struct MirrorHandler {
	mirror: Arc<MirrorService>,
	event_bus: EventBus,
}

impl MirrorHandler {
	pub fn new(mirror: Arc<MirrorService>, event_bus: EventBus) -> Self {
		Self { mirror, event_bus }
	}

	/// Sends the order's summary and publishes the outcome.
	#[instrument(skip_all, fields(order_id = %truncate_id(&order.id)))]
	pub async fn handle(&self, order: &Order) {
		let summary = order.summary();
		let event = match self.mirror.mirror(&summary).await {
			Ok(()) => MirrorEvent::Delivered {
				order_id: order.id.clone(),
			},
			Err(e) => MirrorEvent::Failed {
				order_id: order.id.clone(),
				error: e.to_string(),
			},
		};
		self.event_bus.publish(FulfillmentEvent::Mirror(event)).ok();
	}
}
