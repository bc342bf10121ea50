//! Dashboard metrics snapshot.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Operational figures derived from the full order and user collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
	/// Orders that are neither delivered nor cancelled.
	pub active_orders: u64,
	/// Orders still awaiting production, keyed by plant name.
	pub pending_by_plant: BTreeMap<String, u64>,
	/// Orders awaiting production that go to a private client.
	pub pending_private_clients: u64,
	/// Non-cancelled sales created since local midnight, two decimal places.
	pub today_sales: Decimal,
	/// Number of end-customer users.
	pub total_clients: u64,
}
