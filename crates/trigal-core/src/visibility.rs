//! Which orders a caller may see.

use std::cmp::Ordering;
use trigal_types::{Actor, Capability, CapabilitySet, Order, OrderStatus};

/// States a plant works on.
pub const PLANT_STATES: [OrderStatus; 3] = [
	OrderStatus::Pending,
	OrderStatus::InProduction,
	OrderStatus::ReadyForDispatch,
];

/// States the transport desk works on.
pub const TRANSPORT_STATES: [OrderStatus; 3] = [
	OrderStatus::ReadyForDispatch,
	OrderStatus::InTransit,
	OrderStatus::Delivered,
];

/// Returns true if `actor` may see `order`.
///
/// The broadest scope held wins: all orders, then plant, then transport,
/// then the actor's own orders.
pub fn is_visible(actor: &Actor, capabilities: &CapabilitySet, order: &Order) -> bool {
	if capabilities.contains(Capability::ViewAllOrders) {
		return true;
	}
	if capabilities.contains(Capability::ViewPlantScopedOrders) {
		return match (actor.branch_id.as_deref(), order.origin_id.as_deref()) {
			(Some(plant), Some(origin)) => plant == origin && PLANT_STATES.contains(&order.status),
			_ => false,
		};
	}
	if capabilities.contains(Capability::ViewTransportScopedOrders) {
		return TRANSPORT_STATES.contains(&order.status);
	}
	if capabilities.contains(Capability::ViewOwnOrdersOnly) {
		return order.user_id == actor.uid;
	}
	false
}

/// Newest first; equal timestamps by id.
fn display_order(a: &Order, b: &Order) -> Ordering {
	b.created_at
		.cmp(&a.created_at)
		.then_with(|| a.id.cmp(&b.id))
}

/// Filters a snapshot of orders down to what `actor` may see.
pub fn visible_orders(
	actor: &Actor,
	capabilities: &CapabilitySet,
	orders: Vec<Order>,
	status: Option<OrderStatus>,
) -> Vec<Order> {
	let mut visible: Vec<Order> = orders
		.into_iter()
		.filter(|order| is_visible(actor, capabilities, order))
		.filter(|order| status.is_none_or(|wanted| order.status == wanted))
		.collect();
	visible.sort_by(display_order);
	visible
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::policy::capabilities_for;
	use chrono::{Duration, TimeZone, Utc};
	use rust_decimal::Decimal;
	use trigal_types::Role;

	fn order(id: &str, status: OrderStatus, origin: Option<&str>, owner: &str, minute: i64) -> Order {
		let at = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap() + Duration::minutes(minute);
		Order {
			id: id.to_string(),
			items: vec![],
			total: Decimal::ZERO,
			status,
			origin_id: origin.map(str::to_string),
			origin_name: None,
			destination_id: None,
			destination_name: None,
			client_name: Some("Cliente".to_string()),
			client_phone: None,
			notes: None,
			history: vec![],
			user_id: owner.to_string(),
			user_email: String::new(),
			created_at: at,
			updated_at: at,
		}
	}

	fn snapshot() -> Vec<Order> {
		vec![
			order("a1", OrderStatus::Pending, Some("plant-a"), "u-1", 0),
			order("a2", OrderStatus::ReadyForDispatch, Some("plant-a"), "u-2", 1),
			order("a3", OrderStatus::Delivered, Some("plant-a"), "u-1", 2),
			order("b1", OrderStatus::InProduction, Some("plant-b"), "u-2", 3),
			order("b2", OrderStatus::InTransit, Some("plant-b"), "u-1", 4),
			order("n1", OrderStatus::Cancelled, None, "u-1", 5),
		]
	}

	fn ids(orders: &[Order]) -> Vec<&str> {
		orders.iter().map(|o| o.id.as_str()).collect()
	}

	fn visible_for(actor: &Actor) -> Vec<Order> {
		visible_orders(actor, &capabilities_for(actor.role), snapshot(), None)
	}

	#[test]
	fn test_all_orders_newest_first() {
		let monitor = Actor::new("u-m", "m@trigales.com", Role::Monitor);
		assert_eq!(
			ids(&visible_for(&monitor)),
			vec!["n1", "b2", "b1", "a3", "a2", "a1"]
		);
	}

	#[test]
	fn test_plant_scope() {
		let baker = Actor::new("u-b", "b@trigales.com", Role::Baker).with_branch("plant-a", "A");
		let visible = visible_for(&baker);
		assert_eq!(ids(&visible), vec!["a2", "a1"]);
		assert!(visible
			.iter()
			.all(|o| o.origin_id.as_deref() == Some("plant-a")));

		let unassigned = Actor::new("u-b2", "b2@trigales.com", Role::Baker);
		assert!(visible_for(&unassigned).is_empty());
	}

	#[test]
	fn test_transport_scope() {
		let carrier = Actor::new("u-c", "c@trigales.com", Role::Carrier);
		assert_eq!(ids(&visible_for(&carrier)), vec!["b2", "a3", "a2"]);
	}

	#[test]
	fn test_own_orders_and_status_filter() {
		let customer = Actor::new("u-1", "ana@example.com", Role::Customer);
		assert_eq!(ids(&visible_for(&customer)), vec!["n1", "b2", "a3", "a1"]);

		let pending = visible_orders(
			&customer,
			&capabilities_for(customer.role),
			snapshot(),
			Some(OrderStatus::Pending),
		);
		assert_eq!(ids(&pending), vec!["a1"]);
	}

	#[test]
	fn test_no_capability_sees_nothing() {
		let stranger = Actor::new("u-1", "x@example.com", Role::Unknown);
		assert!(visible_for(&stranger).is_empty());
	}

	#[test]
	fn test_ties_break_by_id() {
		let monitor = Actor::new("u-m", "m@trigales.com", Role::Monitor);
		let orders = vec![
			order("z", OrderStatus::Pending, None, "u", 0),
			order("a", OrderStatus::Pending, None, "u", 0),
		];
		let visible = visible_orders(&monitor, &capabilities_for(monitor.role), orders, None);
		assert_eq!(ids(&visible), vec!["a", "z"]);
	}
}
