//! API types for the Trigal HTTP API.
//!
//! This module defines the request and response bodies of the order
//! endpoints and the structured error type returned by every handler.

use crate::{Order, OrderStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Response returned after an order has been created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
	/// Identifier assigned by the store.
	pub id: String,
}

/// Request to move an order to another lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRequest {
	/// Target state.
	#[serde(rename = "estado")]
	pub status: OrderStatus,
	/// Optional note recorded in the audit trail.
	#[serde(rename = "nota", default)]
	pub note: Option<String>,
}

/// Query parameters accepted by the order listing endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListOrdersQuery {
	/// Only return orders in this state.
	#[serde(rename = "estado", default)]
	pub status: Option<OrderStatus>,
}

/// Response containing the orders visible to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOrdersResponse {
	pub orders: Vec<Order>,
	/// Number of orders returned.
	pub count: usize,
}

/// API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Stable machine-readable error kind
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
	/// Suggested retry delay in seconds
	#[serde(rename = "retryAfter", skip_serializing_if = "Option::is_none")]
	pub retry_after: Option<u64>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed request (400)
	BadRequest { error_type: String, message: String },
	/// Missing or unknown caller identity (401)
	Unauthenticated { message: String },
	/// Caller lacks the capability for the request (403)
	Forbidden { error_type: String, message: String },
	/// Unknown or invisible resource (404)
	NotFound { error_type: String, message: String },
	/// Request conflicts with the current order state (409)
	Conflict { error_type: String, message: String },
	/// Validation failure on the request body (422)
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Backend unavailable; the same request may be retried (503)
	ServiceUnavailable {
		error_type: String,
		message: String,
		retry_after: Option<u64>,
	},
	/// Internal server error (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::Unauthenticated { .. } => 401,
			APIError::Forbidden { .. } => 403,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		let (error, message, details, retry_after) = match self {
			APIError::Unauthenticated { message } => {
				("UNAUTHENTICATED".to_string(), message.clone(), None, None)
			},
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::Forbidden {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::Conflict {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => (error_type.clone(), message.clone(), None, None),
			APIError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => (error_type.clone(), message.clone(), details.clone(), None),
			APIError::ServiceUnavailable {
				error_type,
				message,
				retry_after,
			} => (error_type.clone(), message.clone(), None, *retry_after),
		};

		ErrorResponse {
			error,
			message,
			details,
			retry_after,
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let response = self.to_error_response();
		write!(f, "{} ({}): {}", response.error, self.status_code(), response.message)
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status =
			StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		let error_response = self.to_error_response();
		(status, Json(error_response)).into_response()
	}
}
