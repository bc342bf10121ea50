//! Role policy.
//!
//! The single place that knows what each role may do. Everything else in the
//! core asks about capabilities, never about role names.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use trigal_types::{Capability, CapabilitySet, OrderStatus, Role};

static ROLE_CAPABILITIES: Lazy<HashMap<Role, CapabilitySet>> = Lazy::new(|| {
	use Capability::*;

	HashMap::from([
		(
			Role::Administrator,
			CapabilitySet::from([
				ViewAllOrders,
				ViewGlobalMetrics,
				ManageAnyTransition,
				DeleteOrder,
				CreateOrders,
			]),
		),
		(
			Role::Manager,
			CapabilitySet::from([
				ViewAllOrders,
				ViewGlobalMetrics,
				ManageAnyTransition,
				CreateOrders,
			]),
		),
		(
			Role::Monitor,
			CapabilitySet::from([ViewAllOrders, ViewGlobalMetrics]),
		),
		(
			Role::Branch,
			CapabilitySet::from([ViewOwnOrdersOnly, CreateOrders]),
		),
		(
			Role::Customer,
			CapabilitySet::from([ViewOwnOrdersOnly, CreateOrders]),
		),
		(
			Role::Baker,
			CapabilitySet::from([ViewPlantScopedOrders, AdvanceProduction]),
		),
		(
			Role::Carrier,
			CapabilitySet::from([ViewTransportScopedOrders, AdvanceDispatch]),
		),
	])
});

/// Returns the capabilities granted to a role. Unknown roles get none.
pub fn capabilities_for(role: Role) -> CapabilitySet {
	ROLE_CAPABILITIES.get(&role).cloned().unwrap_or_default()
}

/// The capability that lets a non-privileged actor move an order into `target`.
pub fn capability_to_enter(target: OrderStatus) -> Capability {
	match target {
		OrderStatus::InProduction | OrderStatus::ReadyForDispatch => Capability::AdvanceProduction,
		OrderStatus::InTransit | OrderStatus::Delivered => Capability::AdvanceDispatch,
		OrderStatus::Pending | OrderStatus::Cancelled => Capability::ManageAnyTransition,
	}
}

/// Returns true if the capability set allows entering `target` at all.
pub fn may_enter(capabilities: &CapabilitySet, target: OrderStatus) -> bool {
	capabilities.contains_any(&[Capability::ManageAnyTransition, capability_to_enter(target)])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_role_table() {
		let admin = capabilities_for(Role::Administrator);
		assert!(admin.contains(Capability::DeleteOrder));
		assert!(admin.contains(Capability::ManageAnyTransition));

		let manager = capabilities_for(Role::Manager);
		assert!(manager.contains(Capability::ManageAnyTransition));
		assert!(!manager.contains(Capability::DeleteOrder));

		let monitor = capabilities_for(Role::Monitor);
		assert!(monitor.contains(Capability::ViewGlobalMetrics));
		assert!(!monitor.contains(Capability::CreateOrders));
		assert!(!monitor.contains(Capability::ManageAnyTransition));

		assert_eq!(
			capabilities_for(Role::Baker),
			CapabilitySet::from([
				Capability::ViewPlantScopedOrders,
				Capability::AdvanceProduction
			])
		);
		assert_eq!(
			capabilities_for(Role::Carrier),
			CapabilitySet::from([
				Capability::ViewTransportScopedOrders,
				Capability::AdvanceDispatch
			])
		);
		assert!(capabilities_for(Role::Customer).contains(Capability::ViewOwnOrdersOnly));
	}

	#[test]
	fn test_unknown_role_fails_closed() {
		assert!(capabilities_for(Role::Unknown).is_empty());
		assert!(capabilities_for(Role::parse("supervisor")).is_empty());
	}

	#[test]
	fn test_may_enter() {
		let baker = capabilities_for(Role::Baker);
		assert!(may_enter(&baker, OrderStatus::InProduction));
		assert!(may_enter(&baker, OrderStatus::ReadyForDispatch));
		assert!(!may_enter(&baker, OrderStatus::InTransit));
		assert!(!may_enter(&baker, OrderStatus::Cancelled));

		let carrier = capabilities_for(Role::Carrier);
		assert!(may_enter(&carrier, OrderStatus::Delivered));
		assert!(!may_enter(&carrier, OrderStatus::InProduction));

		let manager = capabilities_for(Role::Manager);
		assert!(OrderStatus::ALL.iter().all(|s| may_enter(&manager, *s)));
	}
}
