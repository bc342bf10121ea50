//! Order types for the fulfillment system.
//!
//! This module defines the order document as it is persisted in the store,
//! its line items, the lifecycle states it moves through and the audit trail
//! that records each transition. Field names on the wire keep the document
//! format used by the store and the external mirror.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display name used as destination for end customers without a profile name.
pub const DEFAULT_CLIENT_NAME: &str = "Cliente Web";

/// A customer order moving through production, dispatch and delivery.
///
/// Orders are owned by the store once persisted. Engine operations fetch a
/// copy, validate the requested change and write the updated copy back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
	/// Unique identifier assigned by the store on creation.
	pub id: String,
	/// Ordered line items; never empty.
	pub items: Vec<OrderItem>,
	/// Sum of all item subtotals.
	pub total: Decimal,
	/// Current lifecycle state.
	#[serde(rename = "estado")]
	pub status: OrderStatus,
	/// Production plant the order is routed to.
	#[serde(rename = "origenId", default, skip_serializing_if = "Option::is_none")]
	pub origin_id: Option<String>,
	#[serde(rename = "origenNombre", default, skip_serializing_if = "Option::is_none")]
	pub origin_name: Option<String>,
	/// Destination branch, when the order is delivered to a branch.
	#[serde(rename = "destinoId", default, skip_serializing_if = "Option::is_none")]
	pub destination_id: Option<String>,
	#[serde(rename = "destinoNombre", default, skip_serializing_if = "Option::is_none")]
	pub destination_name: Option<String>,
	/// Free-text destination identity used when no branch is assigned.
	#[serde(rename = "clienteNombre", default, skip_serializing_if = "Option::is_none")]
	pub client_name: Option<String>,
	#[serde(rename = "clienteTelefono", default, skip_serializing_if = "Option::is_none")]
	pub client_phone: Option<String>,
	#[serde(rename = "observaciones", default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
	/// Append-only audit trail, one entry per transition plus the creation entry.
	#[serde(rename = "historial", default)]
	pub history: Vec<HistoryEntry>,
	/// Identity of the order's creator.
	#[serde(rename = "userId")]
	pub user_id: String,
	#[serde(rename = "userEmail", default)]
	pub user_email: String,
	#[serde(rename = "createdAt")]
	pub created_at: DateTime<Utc>,
	#[serde(rename = "updatedAt")]
	pub updated_at: DateTime<Utc>,
}

impl Order {
	/// Name shown to operators and sent to the mirror as the order's client.
	///
	/// Falls back from the free-text client name to the destination branch name.
	pub fn client_label(&self) -> &str {
		self.client_name
			.as_deref()
			.or(self.destination_name.as_deref())
			.unwrap_or("")
	}

	/// Returns true when the order is delivered to a private client rather than a branch.
	pub fn is_private_client(&self) -> bool {
		self.destination_id.as_deref().is_none_or(str::is_empty)
	}

	/// Builds the flattened summary sent to the external mirror.
	pub fn summary(&self) -> OrderSummary {
		OrderSummary {
			id: self.id.clone(),
			client: self.client_label().to_string(),
			total: self.total,
			status: self.status,
		}
	}
}

/// A single product line within an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
	#[serde(rename = "productId")]
	pub product_id: String,
	#[serde(rename = "descripcion")]
	pub description: String,
	#[serde(rename = "precioUnitario")]
	pub unit_price: Decimal,
	#[serde(rename = "cantidad")]
	pub quantity: u32,
	/// Always `unit_price * quantity`.
	pub subtotal: Decimal,
}

impl OrderItem {
	/// Creates an item with its subtotal computed from price and quantity.
	///
	/// Returns `None` when the subtotal does not fit in a `Decimal`.
	pub fn new(
		product_id: impl Into<String>,
		description: impl Into<String>,
		unit_price: Decimal,
		quantity: u32,
	) -> Option<Self> {
		let subtotal = unit_price.checked_mul(Decimal::from(quantity))?;
		Some(Self {
			product_id: product_id.into(),
			description: description.into(),
			unit_price,
			quantity,
			subtotal,
		})
	}
}

/// Sums the subtotals of the given items, or `None` on overflow.
pub fn order_total(items: &[OrderItem]) -> Option<Decimal> {
	items
		.iter()
		.try_fold(Decimal::ZERO, |total, item| total.checked_add(item.subtotal))
}

/// One audit trail record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
	/// State the order entered.
	#[serde(rename = "estado")]
	pub status: OrderStatus,
	#[serde(rename = "fecha")]
	pub at: DateTime<Utc>,
	/// Identity of the actor that performed the transition.
	#[serde(rename = "usuario")]
	pub user: String,
	#[serde(rename = "nota", default, skip_serializing_if = "Option::is_none")]
	pub note: Option<String>,
}

/// Lifecycle state of an order.
///
/// `Delivered` and `Cancelled` are terminal. Every other state moves forward
/// along the production/dispatch pipeline or can be cancelled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrderStatus {
	#[serde(rename = "pendiente")]
	Pending,
	#[serde(rename = "en_produccion")]
	InProduction,
	#[serde(rename = "listo_despacho")]
	ReadyForDispatch,
	#[serde(rename = "en_ruta")]
	InTransit,
	#[serde(rename = "entregado")]
	Delivered,
	#[serde(rename = "cancelado")]
	Cancelled,
}

impl OrderStatus {
	/// Every state, pipeline order first, `Cancelled` last.
	pub const ALL: [OrderStatus; 6] = [
		OrderStatus::Pending,
		OrderStatus::InProduction,
		OrderStatus::ReadyForDispatch,
		OrderStatus::InTransit,
		OrderStatus::Delivered,
		OrderStatus::Cancelled,
	];

	/// States that count as open work.
	pub const ACTIVE: [OrderStatus; 4] = [
		OrderStatus::Pending,
		OrderStatus::InProduction,
		OrderStatus::ReadyForDispatch,
		OrderStatus::InTransit,
	];

	/// States a plant still has to produce.
	pub const AWAITING_PRODUCTION: [OrderStatus; 2] =
		[OrderStatus::Pending, OrderStatus::InProduction];

	/// Returns the wire name of the state.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pendiente",
			OrderStatus::InProduction => "en_produccion",
			OrderStatus::ReadyForDispatch => "listo_despacho",
			OrderStatus::InTransit => "en_ruta",
			OrderStatus::Delivered => "entregado",
			OrderStatus::Cancelled => "cancelado",
		}
	}

	/// Human-readable label shown to operators.
	pub fn label(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "Pendiente",
			OrderStatus::InProduction => "En Producción",
			OrderStatus::ReadyForDispatch => "Listo para Despacho",
			OrderStatus::InTransit => "En Ruta",
			OrderStatus::Delivered => "Entregado",
			OrderStatus::Cancelled => "Cancelado",
		}
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
	}

	pub fn is_active(&self) -> bool {
		Self::ACTIVE.contains(self)
	}

	/// Position along the production/dispatch pipeline; `None` for `Cancelled`.
	pub fn pipeline_position(&self) -> Option<usize> {
		match self {
			OrderStatus::Pending => Some(0),
			OrderStatus::InProduction => Some(1),
			OrderStatus::ReadyForDispatch => Some(2),
			OrderStatus::InTransit => Some(3),
			OrderStatus::Delivered => Some(4),
			OrderStatus::Cancelled => None,
		}
	}

	/// The direct forward successor along the pipeline, if any.
	pub fn successor(&self) -> Option<OrderStatus> {
		match self {
			OrderStatus::Pending => Some(OrderStatus::InProduction),
			OrderStatus::InProduction => Some(OrderStatus::ReadyForDispatch),
			OrderStatus::ReadyForDispatch => Some(OrderStatus::InTransit),
			OrderStatus::InTransit => Some(OrderStatus::Delivered),
			OrderStatus::Delivered | OrderStatus::Cancelled => None,
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|status| status.as_str() == s)
			.ok_or_else(|| format!("Unknown order state: {}", s))
	}
}

/// Input accepted when creating an order.
///
/// Totals, subtotals, state, destination and ownership are never taken from
/// the caller; they are computed during routing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewOrder {
	pub items: Vec<NewOrderItem>,
	#[serde(rename = "origenId", default)]
	pub origin_id: Option<String>,
	#[serde(rename = "clienteNombre", default)]
	pub client_name: Option<String>,
	#[serde(rename = "clienteTelefono", default)]
	pub client_phone: Option<String>,
	#[serde(rename = "observaciones", default)]
	pub notes: Option<String>,
}

/// A requested line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
	#[serde(rename = "productId")]
	pub product_id: String,
	#[serde(rename = "descripcion", default)]
	pub description: String,
	#[serde(rename = "precioUnitario")]
	pub unit_price: Decimal,
	#[serde(rename = "cantidad")]
	pub quantity: u32,
}

/// Flattened order summary delivered to the external mirror.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
	pub id: String,
	#[serde(rename = "cliente")]
	pub client: String,
	/// Sent as a JSON number; spreadsheets do not parse decimal strings.
	#[serde(with = "rust_decimal::serde::float")]
	pub total: Decimal,
	#[serde(rename = "estado")]
	pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_item_subtotal_and_total() {
		let items = vec![
			OrderItem::new("p1", "Pan de campo", Decimal::from(50), 2).unwrap(),
			OrderItem::new("p2", "Medialunas", Decimal::new(1250, 2), 4).unwrap(),
		];

		assert_eq!(items[0].subtotal, Decimal::from(100));
		assert_eq!(items[1].subtotal, Decimal::from(50));
		assert_eq!(order_total(&items), Some(Decimal::from(150)));
	}

	#[test]
	fn test_amount_overflow_is_none() {
		assert!(OrderItem::new("p1", "Pan", Decimal::MAX, 2).is_none());

		let items = vec![
			OrderItem::new("p1", "Pan", Decimal::MAX, 1).unwrap(),
			OrderItem::new("p2", "Torta", Decimal::MAX, 1).unwrap(),
		];
		assert_eq!(order_total(&items), None);
	}

	#[test]
	fn test_status_wire_names() {
		let json = serde_json::to_string(&OrderStatus::ReadyForDispatch).unwrap();
		assert_eq!(json, "\"listo_despacho\"");

		let parsed: OrderStatus = serde_json::from_str("\"en_ruta\"").unwrap();
		assert_eq!(parsed, OrderStatus::InTransit);

		assert_eq!("cancelado".parse::<OrderStatus>(), Ok(OrderStatus::Cancelled));
		assert!("archivado".parse::<OrderStatus>().is_err());
	}

	#[test]
	fn test_status_graph_helpers() {
		assert_eq!(OrderStatus::Pending.successor(), Some(OrderStatus::InProduction));
		assert_eq!(OrderStatus::InTransit.successor(), Some(OrderStatus::Delivered));
		assert_eq!(OrderStatus::Delivered.successor(), None);
		assert!(OrderStatus::Cancelled.is_terminal());
		assert!(!OrderStatus::InTransit.is_terminal());
		assert!(OrderStatus::InTransit.is_active());
		assert!(!OrderStatus::Delivered.is_active());
		assert_eq!(OrderStatus::Cancelled.pipeline_position(), None);
	}

	#[test]
	fn test_order_document_field_names() {
		let now = Utc::now();
		let order = Order {
			id: "o-1".to_string(),
			items: vec![OrderItem::new("p1", "Pan", Decimal::from(50), 2).unwrap()],
			total: Decimal::from(100),
			status: OrderStatus::Pending,
			origin_id: Some("plant-a".to_string()),
			origin_name: Some("Plant A".to_string()),
			destination_id: None,
			destination_name: None,
			client_name: Some("Ana".to_string()),
			client_phone: None,
			notes: None,
			history: vec![],
			user_id: "u-1".to_string(),
			user_email: "ana@example.com".to_string(),
			created_at: now,
			updated_at: now,
		};

		let value = serde_json::to_value(&order).unwrap();
		assert_eq!(value["estado"], "pendiente");
		assert_eq!(value["origenNombre"], "Plant A");
		assert_eq!(value["clienteNombre"], "Ana");
		assert_eq!(value["items"][0]["cantidad"], 2);
		assert!(value.get("destinoId").is_none());

		assert!(order.is_private_client());
		assert_eq!(order.summary().client, "Ana");
	}
}
