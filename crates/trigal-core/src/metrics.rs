//! Dashboard metrics.
//!
//! A pure aggregation over an order and user snapshot. The result does not
//! depend on the order of either input.

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use trigal_types::{DashboardMetrics, Order, OrderStatus, Role, UserProfile};

/// Start of the calendar day containing `now`, in `now`'s time zone.
fn local_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
	let naive_midnight = now.date_naive().and_time(chrono::NaiveTime::MIN);
	match now.timezone().from_local_datetime(&naive_midnight).earliest() {
		Some(midnight) => midnight.with_timezone(&Utc),
		// Midnight skipped by a DST change: step back by the elapsed local time.
		None => now.with_timezone(&Utc) - (now.naive_local() - naive_midnight),
	}
}

/// Computes the dashboard figures as of `now`.
pub fn compute_metrics<Tz: TimeZone>(
	orders: &[Order],
	users: &[UserProfile],
	now: &DateTime<Tz>,
) -> DashboardMetrics {
	let midnight = local_midnight(now);

	let mut metrics = DashboardMetrics::default();
	let mut pending_by_plant: BTreeMap<String, u64> = BTreeMap::new();
	let mut today_sales = Decimal::ZERO;

	for order in orders {
		if order.status.is_active() {
			metrics.active_orders += 1;
		}

		if OrderStatus::AWAITING_PRODUCTION.contains(&order.status) {
			if let Some(plant) = order.origin_name.as_deref().filter(|n| !n.is_empty()) {
				*pending_by_plant.entry(plant.to_string()).or_default() += 1;
			}
			if order.is_private_client() {
				metrics.pending_private_clients += 1;
			}
		}

		if order.status != OrderStatus::Cancelled && order.created_at >= midnight {
			today_sales = today_sales.checked_add(order.total).unwrap_or_else(|| {
				tracing::warn!(order_id = %order.id, "Today's sales overflowed, saturating");
				Decimal::MAX
			});
		}
	}

	metrics.pending_by_plant = pending_by_plant;
	metrics.today_sales = today_sales.round_dp(2);
	metrics.total_clients = users
		.iter()
		.filter(|user| user.role == Role::Customer)
		.count() as u64;
	metrics
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Duration, FixedOffset};

	fn order(
		id: &str,
		status: OrderStatus,
		plant: Option<&str>,
		branch: Option<&str>,
		total: Decimal,
		created_at: DateTime<Utc>,
	) -> Order {
		Order {
			id: id.to_string(),
			items: vec![],
			total,
			status,
			origin_id: plant.map(|p| p.to_lowercase()),
			origin_name: plant.map(str::to_string),
			destination_id: branch.map(str::to_string),
			destination_name: branch.map(str::to_string),
			client_name: None,
			client_phone: None,
			notes: None,
			history: vec![],
			user_id: "u".to_string(),
			user_email: String::new(),
			created_at,
			updated_at: created_at,
		}
	}

	fn user(role: Role) -> UserProfile {
		UserProfile {
			id: format!("u-{}", role),
			email: None,
			display_name: None,
			role,
			branch_id: None,
			branch_name: None,
		}
	}

	#[test]
	fn test_pending_and_delivered() {
		let now = Utc::now();
		let orders = vec![
			order("1", OrderStatus::Pending, Some("Plant A"), None, Decimal::from(100), now),
			order("2", OrderStatus::Delivered, Some("Plant A"), None, Decimal::from(40), now),
		];

		let metrics = compute_metrics(&orders, &[], &now);
		assert_eq!(metrics.active_orders, 1);
		assert_eq!(
			metrics.pending_by_plant,
			BTreeMap::from([("Plant A".to_string(), 1)])
		);
		assert_eq!(metrics.pending_private_clients, 1);
		assert_eq!(metrics.today_sales, Decimal::from(140));
	}

	#[test]
	fn test_today_sales_saturates_on_overflow() {
		let now = Utc::now();
		let orders = vec![
			order("1", OrderStatus::Delivered, None, None, Decimal::MAX, now),
			order("2", OrderStatus::Delivered, None, None, Decimal::MAX, now),
		];

		let metrics = compute_metrics(&orders, &[], &now);
		assert_eq!(metrics.today_sales, Decimal::MAX);
	}

	#[test]
	fn test_today_sales_window_and_cancellations() {
		let tz = FixedOffset::west_opt(3 * 3600).unwrap();
		let now = tz.with_ymd_and_hms(2025, 6, 10, 9, 30, 0).unwrap();
		let local_midnight = tz.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap().with_timezone(&Utc);

		let orders = vec![
			order("today", OrderStatus::InTransit, None, Some("centro"), Decimal::new(10005, 2), local_midnight),
			order("yesterday", OrderStatus::Delivered, None, None, Decimal::from(999), local_midnight - Duration::seconds(1)),
			order("cancelled", OrderStatus::Cancelled, None, None, Decimal::from(500), local_midnight + Duration::hours(1)),
			order("third", OrderStatus::Pending, None, Some("norte"), Decimal::new(3333, 3), local_midnight + Duration::hours(2)),
		];

		let metrics = compute_metrics(&orders, &[], &now);
		assert_eq!(metrics.today_sales, Decimal::new(10338, 2));
		assert_eq!(metrics.active_orders, 2);
		assert!(metrics.pending_by_plant.is_empty());
		assert_eq!(metrics.pending_private_clients, 0);
	}

	#[test]
	fn test_counts_only_customers() {
		let users = vec![
			user(Role::Customer),
			user(Role::Customer),
			user(Role::Baker),
			user(Role::Unknown),
		];
		assert_eq!(compute_metrics(&[], &users, &Utc::now()).total_clients, 2);
	}

	#[test]
	fn test_permutation_invariant() {
		let now = Utc::now();
		let mut orders = vec![
			order("1", OrderStatus::Pending, Some("Plant A"), None, Decimal::from(10), now),
			order("2", OrderStatus::InProduction, Some("Plant B"), Some("c"), Decimal::from(20), now),
			order("3", OrderStatus::InProduction, Some("Plant A"), None, Decimal::from(30), now),
			order("4", OrderStatus::Cancelled, Some("Plant B"), None, Decimal::from(40), now),
			order("5", OrderStatus::ReadyForDispatch, Some(""), None, Decimal::from(50), now),
		];
		let users = vec![user(Role::Customer), user(Role::Manager)];

		let expected = compute_metrics(&orders, &users, &now);
		assert_eq!(expected.pending_by_plant.get("Plant A"), Some(&2));
		assert_eq!(expected.pending_by_plant.get("Plant B"), Some(&1));
		assert_eq!(expected.pending_private_clients, 2);

		orders.reverse();
		assert_eq!(compute_metrics(&orders, &users, &now), expected);
		orders.rotate_left(2);
		assert_eq!(compute_metrics(&orders, &users, &now), expected);
	}
}
