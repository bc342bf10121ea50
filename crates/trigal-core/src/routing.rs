//! Order routing.
//!
//! Turns a creation request into a complete order: validated items and
//! total, the producing plant, and exactly one destination (a branch or a
//! named client).

use crate::error::OrderError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use trigal_types::{
	order_total, Actor, Branch, HistoryEntry, NewOrder, NewOrderItem, Order, OrderItem,
	OrderStatus, Role, DEFAULT_CLIENT_NAME,
};

/// Note recorded on the first history entry of every order.
pub const CREATION_NOTE: &str = "Pedido creado";

/// Where an order is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
	/// One of the operation's branches.
	Branch { id: String, name: String },
	/// A private client identified by name.
	Client { name: String },
}

/// Validated order lines together with their total.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedItems {
	pub items: Vec<OrderItem>,
	pub total: Decimal,
}

/// Producing plant resolved from the branch catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
	pub id: String,
	pub name: String,
}

fn amount_too_large(product_id: &str) -> OrderError {
	OrderError::InvalidOrder(format!("amount for {} is too large", product_id))
}

fn non_blank(value: Option<&str>) -> Option<String> {
	value
		.map(str::trim)
		.filter(|v| !v.is_empty())
		.map(str::to_string)
}

/// Validates the requested lines and merges repeated products.
///
/// Lines keep the position of the first occurrence of their product.
/// Subtotals or a total too large for a `Decimal` are rejected.
pub fn prepare_items(items: &[NewOrderItem]) -> Result<PreparedItems, OrderError> {
	if items.is_empty() {
		return Err(OrderError::InvalidOrder(
			"an order needs at least one item".into(),
		));
	}

	let mut merged: Vec<OrderItem> = Vec::with_capacity(items.len());
	for item in items {
		let product_id = item.product_id.trim();
		if product_id.is_empty() {
			return Err(OrderError::InvalidOrder("item without productId".into()));
		}
		if item.quantity == 0 {
			return Err(OrderError::InvalidOrder(format!(
				"quantity for {} must be at least 1",
				product_id
			)));
		}
		if item.unit_price < Decimal::ZERO {
			return Err(OrderError::InvalidOrder(format!(
				"unit price for {} cannot be negative",
				product_id
			)));
		}

		match merged.iter_mut().find(|line| line.product_id == product_id) {
			Some(line) => {
				let quantity = line.quantity.checked_add(item.quantity).ok_or_else(|| {
					OrderError::InvalidOrder(format!("quantity for {} is too large", product_id))
				})?;
				*line = OrderItem::new(
					line.product_id.clone(),
					line.description.clone(),
					line.unit_price,
					quantity,
				)
				.ok_or_else(|| amount_too_large(product_id))?;
			},
			None => merged.push(
				OrderItem::new(
					product_id,
					item.description.trim(),
					item.unit_price,
					item.quantity,
				)
				.ok_or_else(|| amount_too_large(product_id))?,
			),
		}
	}

	let total = order_total(&merged)
		.ok_or_else(|| OrderError::InvalidOrder("order total is too large".into()))?;
	Ok(PreparedItems {
		items: merged,
		total,
	})
}

/// Checks the requested origin against the branch it refers to.
///
/// `branch` is the catalog record for `origin_id`, or `None` if it does not exist.
pub fn resolve_origin(
	origin_id: Option<&str>,
	branch: Option<&Branch>,
	require_origin: bool,
) -> Result<Option<Origin>, OrderError> {
	let Some(origin_id) = origin_id.map(str::trim).filter(|id| !id.is_empty()) else {
		if require_origin {
			return Err(OrderError::InvalidOrigin(
				"a production plant must be selected".into(),
			));
		}
		return Ok(None);
	};

	match branch {
		Some(branch) if branch.is_production_plant => Ok(Some(Origin {
			id: branch.id.clone(),
			name: branch.name.clone(),
		})),
		Some(branch) => Err(OrderError::InvalidOrigin(format!(
			"{} is not a production plant",
			branch.name
		))),
		None => Err(OrderError::InvalidOrigin(format!(
			"unknown branch {}",
			origin_id
		))),
	}
}

/// Picks the destination for an order created by `actor`.
///
/// An assigned branch wins; end customers are their own destination;
/// anyone else must name the client explicitly.
pub fn resolve_destination(
	actor: &Actor,
	client_name: Option<&str>,
) -> Result<Destination, OrderError> {
	if let Some(branch_id) = non_blank(actor.branch_id.as_deref()) {
		let name = non_blank(actor.branch_name.as_deref()).unwrap_or_else(|| branch_id.clone());
		return Ok(Destination::Branch {
			id: branch_id,
			name,
		});
	}

	if actor.role == Role::Customer {
		let name = non_blank(actor.display_name.as_deref())
			.unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string());
		return Ok(Destination::Client { name });
	}

	non_blank(client_name)
		.map(|name| Destination::Client { name })
		.ok_or_else(|| {
			OrderError::MissingDestination(
				"no branch assigned and no client name given".into(),
			)
		})
}

/// Assembles the order document persisted on creation.
pub fn build_order(
	id: &str,
	input: &NewOrder,
	prepared: PreparedItems,
	origin: Option<Origin>,
	destination: Destination,
	actor: &Actor,
	now: DateTime<Utc>,
) -> Order {
	let (destination_id, destination_name, client_name) = match destination {
		Destination::Branch { id, name } => (Some(id), Some(name), None),
		Destination::Client { name } => (None, None, Some(name)),
	};
	let (origin_id, origin_name) = match origin {
		Some(origin) => (Some(origin.id), Some(origin.name)),
		None => (None, None),
	};

	Order {
		id: id.to_string(),
		total: prepared.total,
		items: prepared.items,
		status: OrderStatus::Pending,
		origin_id,
		origin_name,
		destination_id,
		destination_name,
		client_name,
		client_phone: non_blank(input.client_phone.as_deref()),
		notes: non_blank(input.notes.as_deref()),
		history: vec![HistoryEntry {
			status: OrderStatus::Pending,
			at: now,
			user: actor.identity().to_string(),
			note: Some(CREATION_NOTE.to_string()),
		}],
		user_id: actor.uid.clone(),
		user_email: actor.email.clone(),
		created_at: now,
		updated_at: now,
	}
}
