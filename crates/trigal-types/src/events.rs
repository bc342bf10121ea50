//! Event types for inter-service communication.
//!
//! Engine operations publish events after the store accepted a write.
//! Consumers such as the notification mirror subscribe to the bus and react
//! on their own tasks, so they never delay or fail the write that caused them.

use crate::{Order, OrderStatus};
use serde::{Deserialize, Serialize};

/// Main event type encompassing all fulfillment events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FulfillmentEvent {
	/// Events from the order lifecycle.
	Order(OrderEvent),
	/// Outcomes reported by the notification mirror.
	Mirror(MirrorEvent),
}

/// Events related to order persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OrderEvent {
	/// A new order has been persisted.
	Created { order: Order },
	/// An order moved to a new lifecycle state.
	StatusChanged { order: Order, from: OrderStatus },
	/// An order has been removed from the store.
	Deleted { order_id: String },
}

/// Events reported by the mirror forwarder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MirrorEvent {
	/// The mirror backend accepted the summary.
	Delivered { order_id: String },
	/// The mirror backend failed; the failure was logged and dropped.
	Failed { order_id: String, error: String },
}
