//! Catalog entities referenced by orders.
//!
//! Catalog maintenance happens elsewhere; orders only read branches to
//! resolve production plants and destination names.

use serde::{Deserialize, Serialize};

/// A branch of the operation. Production plants are branches flagged as such.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Branch {
	pub id: String,
	#[serde(rename = "nombre")]
	pub name: String,
	#[serde(rename = "esPlantaProduccion", default)]
	pub is_production_plant: bool,
}
