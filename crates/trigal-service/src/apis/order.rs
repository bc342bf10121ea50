//! Order API.
//!
//! Thin adapters from HTTP requests to [`FulfillmentEngine`] operations, and
//! the mapping from order errors to HTTP statuses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use trigal_core::{FulfillmentEngine, OrderError};
use trigal_types::{
	APIError, Actor, CreateOrderResponse, DashboardMetrics, ListOrdersQuery, ListOrdersResponse,
	NewOrder, Order, StatusChangeRequest,
};

/// Suggested client back-off when the store is unavailable.
const STORE_RETRY_AFTER_SECONDS: u64 = 5;

/// Maps a core error to its HTTP representation.
pub fn to_api_error(err: OrderError) -> APIError {
	let error_type = err.kind().to_string();
	let message = err.to_string();
	match err {
		OrderError::Unauthorized(_) => APIError::Forbidden {
			error_type,
			message,
		},
		OrderError::NotFound(_) => APIError::NotFound {
			error_type,
			message,
		},
		OrderError::InvalidTransition { .. } | OrderError::TerminalStateViolation { .. } => {
			APIError::Conflict {
				error_type,
				message,
			}
		},
		OrderError::InvalidOrder(_)
		| OrderError::InvalidOrigin(_)
		| OrderError::MissingDestination(_) => APIError::UnprocessableEntity {
			error_type,
			message,
			details: None,
		},
		OrderError::StoreUnavailable(_) => {
			tracing::error!(error = %message, "Order store unavailable");
			APIError::ServiceUnavailable {
				error_type,
				message,
				retry_after: Some(STORE_RETRY_AFTER_SECONDS),
			}
		},
	}
}

/// Maps a malformed JSON body to a 400/422 response.
pub fn json_rejection(rejection: JsonRejection) -> APIError {
	match rejection {
		JsonRejection::JsonDataError(e) => APIError::UnprocessableEntity {
			error_type: "INVALID_ORDER".to_string(),
			message: e.body_text(),
			details: None,
		},
		other => APIError::BadRequest {
			error_type: "INVALID_REQUEST".to_string(),
			message: other.body_text(),
		},
	}
}

pub fn query_rejection(rejection: QueryRejection) -> APIError {
	APIError::BadRequest {
		error_type: "INVALID_REQUEST".to_string(),
		message: rejection.body_text(),
	}
}

/// Handles order creation.
pub async fn create_order(
	engine: &FulfillmentEngine,
	actor: &Actor,
	request: NewOrder,
) -> Result<CreateOrderResponse, APIError> {
	let id = engine
		.create_order(request, actor)
		.await
		.map_err(to_api_error)?;
	Ok(CreateOrderResponse { id })
}

pub async fn list_orders(
	engine: &FulfillmentEngine,
	actor: &Actor,
	query: ListOrdersQuery,
) -> Result<ListOrdersResponse, APIError> {
	let orders = engine
		.list_orders(actor, query.status)
		.await
		.map_err(to_api_error)?;
	Ok(ListOrdersResponse {
		count: orders.len(),
		orders,
	})
}

pub async fn get_order_by_id(
	engine: &FulfillmentEngine,
	actor: &Actor,
	id: &str,
) -> Result<Order, APIError> {
	engine.get_order(id, actor).await.map_err(to_api_error)
}

/// Handles a status change; returns the updated order.
pub async fn change_status(
	engine: &FulfillmentEngine,
	actor: &Actor,
	id: &str,
	request: StatusChangeRequest,
) -> Result<Order, APIError> {
	engine
		.advance(id, request.status, actor, request.note)
		.await
		.map_err(to_api_error)
}

pub async fn delete_order(
	engine: &FulfillmentEngine,
	actor: &Actor,
	id: &str,
) -> Result<(), APIError> {
	engine.delete_order(id, actor).await.map_err(to_api_error)
}

pub async fn metrics(
	engine: &FulfillmentEngine,
	actor: &Actor,
) -> Result<DashboardMetrics, APIError> {
	engine.metrics(actor).await.map_err(to_api_error)
}
