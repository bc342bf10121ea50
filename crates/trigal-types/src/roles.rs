//! Roles, capabilities and the acting principal.
//!
//! Roles come from the identity provider as plain strings. Anything the
//! system does not recognise deserializes to [`Role::Unknown`], which the
//! role policy maps to an empty capability set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Role attribute carried by a user profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
	#[serde(rename = "administrador")]
	Administrator,
	#[serde(rename = "gerente")]
	Manager,
	#[serde(rename = "sucursal")]
	Branch,
	#[serde(rename = "cliente")]
	Customer,
	#[serde(rename = "panadero")]
	Baker,
	#[serde(rename = "transportista")]
	Carrier,
	#[serde(rename = "monitor")]
	Monitor,
	/// Any role string the system does not know about.
	#[serde(other)]
	Unknown,
}

impl Role {
	/// Returns the wire name of the role.
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Administrator => "administrador",
			Role::Manager => "gerente",
			Role::Branch => "sucursal",
			Role::Customer => "cliente",
			Role::Baker => "panadero",
			Role::Carrier => "transportista",
			Role::Monitor => "monitor",
			Role::Unknown => "desconocido",
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			Role::Administrator => "Administrador",
			Role::Manager => "Gerente",
			Role::Branch => "Sucursal",
			Role::Customer => "Cliente",
			Role::Baker => "Panadero",
			Role::Carrier => "Transportista",
			Role::Monitor => "Monitor",
			Role::Unknown => "Desconocido",
		}
	}

	/// Parses a role attribute, mapping unrecognised values to `Unknown`.
	pub fn parse(value: &str) -> Self {
		match value.trim() {
			"administrador" => Role::Administrator,
			"gerente" => Role::Manager,
			"sucursal" => Role::Branch,
			"cliente" => Role::Customer,
			"panadero" => Role::Baker,
			"transportista" => Role::Carrier,
			"monitor" => Role::Monitor,
			_ => Role::Unknown,
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A named permission granted to a role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
	ViewAllOrders,
	ViewOwnOrdersOnly,
	ViewPlantScopedOrders,
	ViewTransportScopedOrders,
	ViewGlobalMetrics,
	AdvanceProduction,
	AdvanceDispatch,
	ManageAnyTransition,
	DeleteOrder,
	CreateOrders,
}

/// Set of capabilities held by an actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
	/// The most restrictive set.
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn contains(&self, capability: Capability) -> bool {
		self.0.contains(&capability)
	}

	/// Returns true if any of the given capabilities is held.
	pub fn contains_any(&self, capabilities: &[Capability]) -> bool {
		capabilities.iter().any(|c| self.0.contains(c))
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
		self.0.iter().copied()
	}
}

impl FromIterator<Capability> for CapabilitySet {
	fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

impl<const N: usize> From<[Capability; N]> for CapabilitySet {
	fn from(capabilities: [Capability; N]) -> Self {
		capabilities.into_iter().collect()
	}
}

/// User profile as stored in the users collection. Read-only to this system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
	pub id: String,
	#[serde(default)]
	pub email: Option<String>,
	#[serde(rename = "displayName", default)]
	pub display_name: Option<String>,
	#[serde(rename = "rol")]
	pub role: Role,
	/// Branch a role-scoped user is attached to (plant for bakers).
	#[serde(rename = "branchId", default)]
	pub branch_id: Option<String>,
	#[serde(rename = "branchName", default)]
	pub branch_name: Option<String>,
}

/// The acting principal for a single core operation.
///
/// Built explicitly by the caller and passed into every operation; no core
/// code reads identity from ambient state.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
	pub uid: String,
	pub email: String,
	pub display_name: Option<String>,
	pub role: Role,
	pub branch_id: Option<String>,
	pub branch_name: Option<String>,
}

impl Actor {
	/// Creates an actor without a branch assignment.
	pub fn new(uid: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
		Self {
			uid: uid.into(),
			email: email.into(),
			display_name: None,
			role,
			branch_id: None,
			branch_name: None,
		}
	}

	/// Attaches a branch assignment.
	pub fn with_branch(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
		self.branch_id = Some(id.into());
		self.branch_name = Some(name.into());
		self
	}

	pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
		self.display_name = Some(name.into());
		self
	}

	/// Builds the actor from an authenticated identity and its stored profile.
	pub fn from_profile(uid: &str, email: &str, profile: &UserProfile) -> Self {
		Self {
			uid: uid.to_string(),
			email: if email.is_empty() {
				profile.email.clone().unwrap_or_default()
			} else {
				email.to_string()
			},
			display_name: profile.display_name.clone(),
			role: profile.role,
			branch_id: profile.branch_id.clone().filter(|id| !id.is_empty()),
			branch_name: profile.branch_name.clone(),
		}
	}

	/// Identity recorded in the audit trail.
	pub fn identity(&self) -> &str {
		if self.email.is_empty() {
			&self.uid
		} else {
			&self.email
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unknown_role_deserializes() {
		let role: Role = serde_json::from_str("\"supervisor\"").unwrap();
		assert_eq!(role, Role::Unknown);

		let role: Role = serde_json::from_str("\"panadero\"").unwrap();
		assert_eq!(role, Role::Baker);
		assert_eq!(Role::parse(" transportista "), Role::Carrier);
	}

	#[test]
	fn test_actor_from_profile() {
		let profile: UserProfile = serde_json::from_value(serde_json::json!({
			"id": "u-7",
			"email": "baker@trigales.com",
			"rol": "panadero",
			"branchId": "plant-a",
			"branchName": "Plant A"
		}))
		.unwrap();

		let actor = Actor::from_profile("u-7", "", &profile);
		assert_eq!(actor.identity(), "baker@trigales.com");
		assert_eq!(actor.role, Role::Baker);
		assert_eq!(actor.branch_id.as_deref(), Some("plant-a"));
	}

	#[test]
	fn test_capability_set_queries() {
		let set = CapabilitySet::from([Capability::AdvanceDispatch, Capability::ViewGlobalMetrics]);
		assert!(set.contains(Capability::AdvanceDispatch));
		assert!(set.contains_any(&[Capability::ManageAnyTransition, Capability::AdvanceDispatch]));
		assert!(!set.contains_any(&[Capability::DeleteOrder]));
		assert!(CapabilitySet::empty().is_empty());
	}
}
