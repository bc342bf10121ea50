//! Caller identity.
//!
//! Authentication happens upstream; the gateway forwards the verified uid
//! and email in `x-user-id` and `x-user-email`. The acting principal is built
//! from that identity and the stored user profile.

use crate::server::AppState;
use axum::{extract::FromRequestParts, http::request::Parts};
use trigal_types::{APIError, Actor};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// The authenticated actor of a request.
#[derive(Debug, Clone)]
pub struct Caller(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
	parts
		.headers
		.get(name)
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.filter(|value| !value.is_empty())
}

impl FromRequestParts<AppState> for Caller {
	type Rejection = APIError;

	async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
		let uid = header(parts, USER_ID_HEADER).ok_or_else(|| APIError::Unauthenticated {
			message: format!("Missing {} header", USER_ID_HEADER),
		})?;
		let email = header(parts, USER_EMAIL_HEADER).unwrap_or_default();

		match state.engine.resolve_actor(uid, email).await {
			Ok(Some(actor)) => Ok(Caller(actor)),
			Ok(None) => {
				tracing::warn!(user_id = %uid, "Request from user without profile");
				Err(APIError::Unauthenticated {
					message: format!("No profile for user {}", uid),
				})
			},
			Err(e) => Err(crate::apis::order::to_api_error(e)),
		}
	}
}
