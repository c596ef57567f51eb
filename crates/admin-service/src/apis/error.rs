//! Error responses for the admin endpoint.
//!
//! Every failure leaves the service as `{ "error": "<message>" }` with the
//! JSON content type, including panics and timeouts.

use admin_core::TransitionError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};
use thiserror::Error;

/// Content type carried by every response.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Errors surfaced to callers of the admin endpoint.
#[derive(Debug, Error)]
pub enum ApiError {
	#[error("Not authenticated")]
	Unauthenticated,
	#[error("Access denied: admin required")]
	Forbidden,
	#[error("Method not supported")]
	MethodNotAllowed,
	#[error("{0}")]
	BadRequest(String),
	/// The order store failed.
	#[error("{0}")]
	Store(String),
	#[error("Internal failure: {0}")]
	Internal(String),
}

impl ApiError {
	pub fn status_code(&self) -> StatusCode {
		match self {
			ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
			ApiError::Forbidden => StatusCode::FORBIDDEN,
			ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
			ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
			ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}
}

impl From<TransitionError> for ApiError {
	fn from(err: TransitionError) -> Self {
		match err {
			TransitionError::Storage(_) => ApiError::Store(err.to_string()),
			TransitionError::NotFound(_)
			| TransitionError::InvalidStatus(_)
			| TransitionError::DisallowedTransition { .. }
			| TransitionError::Conflict { .. }
			| TransitionError::Rejected(_) => ApiError::BadRequest(err.to_string()),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		json_response(self.status_code(), json!({ "error": self.to_string() }))
	}
}

/// Builds a JSON response with the charset-qualified content type.
pub fn json_response(status: StatusCode, body: Value) -> Response {
	(
		status,
		[(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
		Json(body),
	)
		.into_response()
}
