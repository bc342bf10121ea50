//! Order state machine.
//!
//! Orders move `pendiente -> en_produccion -> listo_despacho -> en_ruta ->
//! entregado`, and may be cancelled from any non-terminal state. This module
//! is the only code that writes `estado`; each accepted change appends one
//! history entry.

use crate::error::OrderError;
use crate::policy;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use trigal_storage::StorageService;
use trigal_types::{
	current_time, Actor, Capability, CapabilitySet, HistoryEntry, Order, OrderStatus, StorageKey,
};

/// Outcome of checking a requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCheck {
	/// The order already is in the requested state; nothing to write.
	Unchanged,
	/// The order moves to the requested state.
	Apply,
}

/// Checks a plant-scoped actor against the order's origin plant.
fn check_plant_scope(
	order: &Order,
	actor: &Actor,
	capabilities: &CapabilitySet,
) -> Result<(), OrderError> {
	if !capabilities.contains(Capability::ViewPlantScopedOrders) {
		return Ok(());
	}

	let own_plant = match (&actor.branch_id, &order.origin_id) {
		(Some(plant), Some(origin)) => plant == origin,
		_ => false,
	};
	if own_plant {
		Ok(())
	} else {
		Err(OrderError::Unauthorized(format!(
			"order {} is not assigned to the actor's plant",
			order.id
		)))
	}
}

/// Decides whether `actor` may move `order` to `target`.
///
/// Checks run in a fixed order: terminal state, same-state requests,
/// privileged reassignment, forward skips, the capability for the target,
/// plant scope, and finally backward moves.
pub fn check_transition(
	order: &Order,
	target: OrderStatus,
	actor: &Actor,
	capabilities: &CapabilitySet,
) -> Result<TransitionCheck, OrderError> {
	let current = order.status;

	if current.is_terminal() {
		return Err(OrderError::TerminalStateViolation {
			order_id: order.id.clone(),
			status: current,
		});
	}

	if target == current {
		if !policy::may_enter(capabilities, target) {
			return Err(OrderError::Unauthorized(format!(
				"role {} cannot set orders to {}",
				actor.role, target
			)));
		}
		check_plant_scope(order, actor, capabilities)?;
		return Ok(TransitionCheck::Unchanged);
	}

	if capabilities.contains(Capability::ManageAnyTransition) {
		return Ok(TransitionCheck::Apply);
	}

	let is_successor = current.successor() == Some(target);
	let skips_forward = matches!(
		(current.pipeline_position(), target.pipeline_position()),
		(Some(from), Some(to)) if to > from + 1
	);
	if skips_forward {
		return Err(OrderError::InvalidTransition {
			from: current,
			to: target,
		});
	}

	if !policy::may_enter(capabilities, target) {
		return Err(OrderError::Unauthorized(format!(
			"role {} cannot move orders to {}",
			actor.role, target
		)));
	}

	check_plant_scope(order, actor, capabilities)?;

	if !is_successor {
		return Err(OrderError::InvalidTransition {
			from: current,
			to: target,
		});
	}

	Ok(TransitionCheck::Apply)
}

/// Moves the order to `target` and records the change.
pub fn apply_transition(
	order: &mut Order,
	target: OrderStatus,
	actor: &Actor,
	note: Option<String>,
	at: DateTime<Utc>,
) {
	order.status = target;
	order.history.push(HistoryEntry {
		status: target,
		at,
		user: actor.identity().to_string(),
		note: note.filter(|n| !n.trim().is_empty()),
	});
}

/// Result of a persisted transition request.
#[derive(Debug, Clone)]
pub struct Transition {
	pub order: Order,
	/// State before the request.
	pub from: OrderStatus,
	/// False when the request was a same-state no-op.
	pub changed: bool,
}

/// Manages order state transitions and persistence
pub struct OrderStateMachine {
	storage: Arc<StorageService>,
}

impl OrderStateMachine {
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self { storage }
	}

	/// Reads an order, lets `updater` modify it and writes it back.
	///
	/// The updater returns whether it changed anything; unchanged orders are
	/// not written and keep their `updatedAt`.
	pub async fn update_order_with<F>(
		&self,
		order_id: &str,
		updater: F,
	) -> Result<(Order, bool), OrderError>
	where
		F: FnOnce(&mut Order) -> Result<bool, OrderError>,
	{
		let mut order = self.get_order(order_id).await?;

		if !updater(&mut order)? {
			return Ok((order, false));
		}

		order.updated_at = current_time();
		self.storage
			.update(StorageKey::Orders.as_str(), order_id, &order)
			.await
			.map_err(|e| OrderError::from_storage(e, &format!("order {}", order_id)))?;

		Ok((order, true))
	}

	/// Validates and persists a status change requested by `actor`.
	pub async fn transition_order_status(
		&self,
		order_id: &str,
		target: OrderStatus,
		actor: &Actor,
		capabilities: &CapabilitySet,
		note: Option<String>,
	) -> Result<Transition, OrderError> {
		let mut from = None;
		let (order, changed) = self
			.update_order_with(order_id, |order| {
				from = Some(order.status);
				match check_transition(order, target, actor, capabilities)? {
					TransitionCheck::Unchanged => Ok(false),
					TransitionCheck::Apply => {
						apply_transition(order, target, actor, note, current_time());
						Ok(true)
					},
				}
			})
			.await?;

		Ok(Transition {
			from: from.unwrap_or(order.status),
			order,
			changed,
		})
	}

	/// Gets an order by ID
	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderError> {
		self.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| OrderError::from_storage(e, &format!("order {}", order_id)))
	}
}
