//! Core fulfillment engine.
//!
//! [`FulfillmentEngine`] is the entry point for every order operation. It
//! resolves the actor's capabilities, delegates to routing, the state machine
//! and the visibility filter, and publishes an event for each accepted
//! write. [`FulfillmentEngine::run`] drives the background side: the mirror
//! forwarder and periodic storage cleanup.

pub mod event_bus;
pub mod lifecycle;

use crate::error::OrderError;
use crate::handlers::MirrorHandler;
use crate::metrics::compute_metrics;
use crate::policy::capabilities_for;
use crate::routing::{build_order, prepare_items, resolve_destination, resolve_origin};
use crate::state::OrderStateMachine;
use crate::visibility::{is_visible, visible_orders};
use chrono::{DateTime, Local, TimeZone};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, Semaphore};
use tracing::instrument;
use trigal_config::Config;
use trigal_mirror::MirrorService;
use trigal_storage::{StorageError, StorageService};
use trigal_types::{
	truncate_id, Actor, Branch, Capability, CapabilitySet, DashboardMetrics, FulfillmentEvent,
	NewOrder, Order, OrderEvent, OrderStatus, StorageKey, UserProfile,
};

/// Upper bound on concurrently running background handler tasks.
const MAX_HANDLER_TASKS: usize = 100;

/// Errors raised while running the engine's background loop.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Service error: {0}")]
	Service(String),
	#[error("Handler error: {0}")]
	Handler(String),
}

/// Orchestrates order operations and their side effects.
#[derive(Clone)]
pub struct FulfillmentEngine {
	/// Service configuration.
	pub(crate) config: Config,
	/// Document store.
	pub(crate) storage: Arc<StorageService>,
	/// Event bus for inter-service communication.
	pub(crate) event_bus: event_bus::EventBus,
	/// Order state machine.
	pub(crate) state_machine: Arc<OrderStateMachine>,
	/// Mirror forwarder, absent when no mirror is configured.
	pub(crate) mirror_handler: Option<Arc<MirrorHandler>>,
}

fn require(
	capabilities: &CapabilitySet,
	capability: Capability,
	action: &str,
) -> Result<(), OrderError> {
	if capabilities.contains(capability) {
		Ok(())
	} else {
		Err(OrderError::Unauthorized(format!("role may not {}", action)))
	}
}

impl FulfillmentEngine {
	/// Creates a new engine over the given services.
	pub fn new(
		config: Config,
		storage: Arc<StorageService>,
		mirror: Option<Arc<MirrorService>>,
		event_bus: event_bus::EventBus,
	) -> Self {
		let state_machine = Arc::new(OrderStateMachine::new(storage.clone()));
		let mirror_handler =
			mirror.map(|mirror| Arc::new(MirrorHandler::new(mirror, event_bus.clone())));

		Self {
			config,
			storage,
			event_bus,
			state_machine,
			mirror_handler,
		}
	}

	/// Validates, routes and persists a new order. Returns its id.
	#[instrument(skip_all, fields(user = %actor.identity(), role = %actor.role))]
	pub async fn create_order(&self, input: NewOrder, actor: &Actor) -> Result<String, OrderError> {
		let capabilities = capabilities_for(actor.role);
		require(&capabilities, Capability::CreateOrders, "create orders")?;

		let prepared = prepare_items(&input.items)?;

		let branch = match input.origin_id.as_deref().map(str::trim) {
			Some(origin_id) if !origin_id.is_empty() => self.find_branch(origin_id).await?,
			_ => None,
		};
		let origin = resolve_origin(
			input.origin_id.as_deref(),
			branch.as_ref(),
			self.config.routing.require_origin,
		)?;
		let destination = resolve_destination(actor, input.client_name.as_deref())?;

		let now = trigal_types::current_time();
		let (id, order) = self
			.storage
			.insert(StorageKey::Orders.as_str(), |id| {
				build_order(id, &input, prepared, origin, destination, actor, now)
			})
			.await
			.map_err(|e| OrderError::from_storage(e, "new order"))?;

		tracing::info!(
			order_id = %truncate_id(&id),
			total = %order.total,
			origin = order.origin_name.as_deref().unwrap_or("-"),
			client = %order.client_label(),
			"Order created"
		);
		self.event_bus
			.publish(FulfillmentEvent::Order(OrderEvent::Created { order }))
			.ok();

		Ok(id)
	}

	/// Moves an order to `target` on behalf of `actor`.
	///
	/// Same-state requests succeed without writing anything.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id), target = %target))]
	pub async fn advance(
		&self,
		order_id: &str,
		target: OrderStatus,
		actor: &Actor,
		note: Option<String>,
	) -> Result<Order, OrderError> {
		let capabilities = capabilities_for(actor.role);
		let transition = self
			.state_machine
			.transition_order_status(order_id, target, actor, &capabilities, note)
			.await?;

		if transition.changed {
			tracing::info!(
				from = %transition.from,
				to = %target,
				user = %actor.identity(),
				"Order status changed"
			);
			self.event_bus
				.publish(FulfillmentEvent::Order(OrderEvent::StatusChanged {
					order: transition.order.clone(),
					from: transition.from,
				}))
				.ok();
		} else {
			tracing::debug!(status = %target, "Order already in requested status");
		}

		Ok(transition.order)
	}

	/// Returns one order if `actor` may see it.
	///
	/// Orders outside the actor's scope are reported as not found.
	pub async fn get_order(&self, order_id: &str, actor: &Actor) -> Result<Order, OrderError> {
		let order = self.state_machine.get_order(order_id).await?;
		if is_visible(actor, &capabilities_for(actor.role), &order) {
			Ok(order)
		} else {
			Err(OrderError::NotFound(format!("order {}", order_id)))
		}
	}

	/// Lists the orders visible to `actor`, newest first.
	pub async fn list_orders(
		&self,
		actor: &Actor,
		status: Option<OrderStatus>,
	) -> Result<Vec<Order>, OrderError> {
		let orders = self.all_orders().await?;
		Ok(visible_orders(
			actor,
			&capabilities_for(actor.role),
			orders,
			status,
		))
	}

	/// Removes an order.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn delete_order(&self, order_id: &str, actor: &Actor) -> Result<(), OrderError> {
		require(&capabilities_for(actor.role), Capability::DeleteOrder, "delete orders")?;

		let what = format!("order {}", order_id);
		let exists = self
			.storage
			.exists(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| OrderError::from_storage(e, &what))?;
		if !exists {
			return Err(OrderError::NotFound(what));
		}

		self.storage
			.remove(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|e| OrderError::from_storage(e, &what))?;

		tracing::info!(user = %actor.identity(), "Order deleted");
		self.event_bus
			.publish(FulfillmentEvent::Order(OrderEvent::Deleted {
				order_id: order_id.to_string(),
			}))
			.ok();
		Ok(())
	}

	/// Dashboard metrics as of now, in the server's local time zone.
	pub async fn metrics(&self, actor: &Actor) -> Result<DashboardMetrics, OrderError> {
		self.metrics_at(actor, &Local::now()).await
	}

	/// Dashboard metrics as of `now`; "today" is the calendar day of `now`.
	pub async fn metrics_at<Tz: TimeZone>(
		&self,
		actor: &Actor,
		now: &DateTime<Tz>,
	) -> Result<DashboardMetrics, OrderError> {
		require(
			&capabilities_for(actor.role),
			Capability::ViewGlobalMetrics,
			"view global metrics",
		)?;

		let orders = self.all_orders().await?;
		let users: Vec<UserProfile> = self
			.storage
			.retrieve_all(StorageKey::Users.as_str())
			.await
			.map_err(|e| OrderError::from_storage(e, "users"))?;

		Ok(compute_metrics(&orders, &users, now))
	}

	/// Builds the actor for an authenticated identity from its user profile.
	///
	/// Returns `None` when the user has no profile.
	pub async fn resolve_actor(&self, uid: &str, email: &str) -> Result<Option<Actor>, OrderError> {
		match self
			.storage
			.retrieve::<UserProfile>(StorageKey::Users.as_str(), uid)
			.await
		{
			Ok(profile) => Ok(Some(Actor::from_profile(uid, email, &profile))),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(OrderError::from_storage(e, &format!("user {}", uid))),
		}
	}

	async fn find_branch(&self, branch_id: &str) -> Result<Option<Branch>, OrderError> {
		match self
			.storage
			.retrieve::<Branch>(StorageKey::Branches.as_str(), branch_id)
			.await
		{
			Ok(branch) => Ok(Some(branch)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(OrderError::from_storage(e, &format!("branch {}", branch_id))),
		}
	}

	async fn all_orders(&self) -> Result<Vec<Order>, OrderError> {
		self.storage
			.retrieve_all(StorageKey::Orders.as_str())
			.await
			.map_err(|e| OrderError::from_storage(e, "orders"))
	}

	/// Runs the background loop until ctrl-c.
	pub async fn run(&self) -> Result<(), EngineError> {
		self.run_until(async {
			tokio::signal::ctrl_c().await.ok();
		})
		.await
	}

	/// Runs the background loop until `shutdown` completes.
	pub async fn run_until<S>(&self, shutdown: S) -> Result<(), EngineError>
	where
		S: Future<Output = ()>,
	{
		let mut event_receiver = self.event_bus.subscribe();

		// Start storage cleanup task
		let storage = self.storage.clone();
		let mut cleanup_interval = tokio::time::interval(Duration::from_secs(
			self.config.storage.cleanup_interval_seconds,
		));
		let cleanup_handle = tokio::spawn(async move {
			loop {
				cleanup_interval.tick().await;
				match storage.cleanup_expired().await {
					Ok(count) if count > 0 => {
						tracing::debug!("Storage cleanup: removed {} expired entries", count);
					},
					Err(e) => {
						tracing::warn!("Storage cleanup failed: {}", e);
					},
					_ => {},
				}
			}
		});

		let semaphore = Arc::new(Semaphore::new(MAX_HANDLER_TASKS));
		tokio::pin!(shutdown);

		loop {
			tokio::select! {
				received = event_receiver.recv() => {
					match received {
						Ok(FulfillmentEvent::Order(OrderEvent::Created { order }))
						| Ok(FulfillmentEvent::Order(OrderEvent::StatusChanged { order, .. })) => {
							if self.mirror_handler.is_some() {
								self.spawn_handler(&semaphore, move |engine| async move {
									let handler = engine.mirror_handler.ok_or_else(|| {
										EngineError::Handler("mirror handler missing".into())
									})?;
									handler.handle(&order).await;
									Ok(())
								})
								.await;
							}
						},
						Ok(_) => {},
						Err(broadcast::error::RecvError::Lagged(skipped)) => {
							tracing::warn!(skipped, "Event loop lagged; some orders were not mirrored");
						},
						Err(broadcast::error::RecvError::Closed) => break,
					}
				}

				_ = &mut shutdown => {
					break;
				}
			}
		}

		cleanup_handle.abort();
		Ok(())
	}

	/// Returns a reference to the event bus.
	pub fn event_bus(&self) -> &event_bus::EventBus {
		&self.event_bus
	}

	/// Returns a reference to the configuration.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Returns a reference to the storage service.
	pub(crate) fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Spawns a handler task, bounded by `semaphore`; errors are logged.
	async fn spawn_handler<F, Fut>(&self, semaphore: &Arc<Semaphore>, handler: F)
	where
		F: FnOnce(FulfillmentEngine) -> Fut + Send + 'static,
		Fut: Future<Output = Result<(), EngineError>> + Send,
	{
		let engine = self.clone();
		match semaphore.clone().acquire_owned().await {
			Ok(permit) => {
				tokio::spawn(async move {
					let _permit = permit;
					if let Err(e) = handler(engine).await {
						tracing::error!("Handler error: {}", e);
					}
				});
			},
			Err(e) => {
				tracing::error!("Failed to acquire semaphore permit: {}", e);
			},
		}
	}
}
