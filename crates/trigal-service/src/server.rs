//! HTTP server for the Trigal API.
//!
//! Every route lives under `/api` and acts on behalf of the caller named in
//! the identity headers (see [`crate::apis::identity`]).

use crate::apis::{self, identity::Caller};
use axum::{
	extract::{
		rejection::{JsonRejection, QueryRejection},
		DefaultBodyLimit, Path, Query, Request, State,
	},
	http::StatusCode,
	middleware::{self, Next},
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use trigal_config::ApiConfig;
use trigal_core::FulfillmentEngine;
use trigal_types::{
	APIError, CreateOrderResponse, DashboardMetrics, ListOrdersQuery, ListOrdersResponse, NewOrder,
	Order, StatusChangeRequest,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Engine handling every request.
	pub engine: Arc<FulfillmentEngine>,
}

/// Builds the API router.
pub fn router(engine: Arc<FulfillmentEngine>, api_config: &ApiConfig) -> Router {
	let app_state = AppState { engine };
	let timeout = Duration::from_secs(api_config.timeout_seconds);

	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", post(handle_create_order).get(handle_list_orders))
				.route(
					"/orders/{id}",
					get(handle_get_order_by_id).delete(handle_delete_order),
				)
				.route("/orders/{id}/status", post(handle_change_status))
				.route("/metrics", get(handle_metrics)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive())
				.layer(DefaultBodyLimit::max(api_config.max_request_size))
				.layer(middleware::from_fn_with_state(timeout, enforce_timeout)),
		)
		.with_state(app_state)
}

/// Starts the HTTP server and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<FulfillmentEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Trigal API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Answers 503 when a request runs longer than the configured timeout.
async fn enforce_timeout(State(timeout): State<Duration>, request: Request, next: Next) -> Response {
	match tokio::time::timeout(timeout, next.run(request)).await {
		Ok(response) => response,
		Err(_) => {
			tracing::warn!(timeout_seconds = timeout.as_secs(), "Request timed out");
			APIError::ServiceUnavailable {
				error_type: "TIMEOUT".to_string(),
				message: "Request timed out".to_string(),
				retry_after: None,
			}
			.into_response()
		},
	}
}

/// Handles POST /api/orders.
async fn handle_create_order(
	State(state): State<AppState>,
	Caller(actor): Caller,
	payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateOrderResponse>), APIError> {
	let Json(request) = payload.map_err(apis::order::json_rejection)?;
	match apis::order::create_order(&state.engine, &actor, request).await {
		Ok(response) => Ok((StatusCode::CREATED, Json(response))),
		Err(e) => {
			tracing::warn!("Order creation failed: {}", e);
			Err(e)
		},
	}
}

/// Handles GET /api/orders.
async fn handle_list_orders(
	State(state): State<AppState>,
	Caller(actor): Caller,
	query: Result<Query<ListOrdersQuery>, QueryRejection>,
) -> Result<Json<ListOrdersResponse>, APIError> {
	let Query(query) = query.map_err(apis::order::query_rejection)?;
	apis::order::list_orders(&state.engine, &actor, query)
		.await
		.map(Json)
}

/// Handles GET /api/orders/{id}.
async fn handle_get_order_by_id(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Caller(actor): Caller,
) -> Result<Json<Order>, APIError> {
	apis::order::get_order_by_id(&state.engine, &actor, &id)
		.await
		.map(Json)
}

/// Handles POST /api/orders/{id}/status.
async fn handle_change_status(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Caller(actor): Caller,
	payload: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> Result<Json<Order>, APIError> {
	let Json(request) = payload.map_err(apis::order::json_rejection)?;
	match apis::order::change_status(&state.engine, &actor, &id, request).await {
		Ok(order) => Ok(Json(order)),
		Err(e) => {
			tracing::warn!("Status change failed: {}", e);
			Err(e)
		},
	}
}

/// Handles DELETE /api/orders/{id}.
async fn handle_delete_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
	Caller(actor): Caller,
) -> Result<StatusCode, APIError> {
	apis::order::delete_order(&state.engine, &actor, &id).await?;
	Ok(StatusCode::NO_CONTENT)
}

/// Handles GET /api/metrics.
async fn handle_metrics(
	State(state): State<AppState>,
	Caller(actor): Caller,
) -> Result<Json<DashboardMetrics>, APIError> {
	apis::order::metrics(&state.engine, &actor).await.map(Json)
}
