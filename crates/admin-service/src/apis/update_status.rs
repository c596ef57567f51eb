//! Action payloads and the `update_status` action.
//!
//! Bodies are read leniently: anything that is not valid JSON counts as an
//! empty object, and scalar fields are taken as their text form, so
//! `"order_id": 42` names order `"42"`.

use super::error::{json_response, ApiError};
use admin_core::AdminEngine;
use admin_types::Principal;
use axum::http::StatusCode;
use axum::response::Response;
use serde_json::{json, Value};

/// The only action the endpoint defines.
pub const UPDATE_STATUS: &str = "update_status";

/// Fields of an admin request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionRequest {
	pub action: String,
	pub order_id: String,
	pub status: String,
}

impl ActionRequest {
	/// Parses a request body. Never fails.
	pub fn from_body(body: &[u8]) -> Self {
		let value: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
		Self {
			action: text_field(&value, "action"),
			order_id: text_field(&value, "order_id"),
			status: text_field(&value, "status"),
		}
	}
}

/// Missing and null fields read as the empty string.
fn text_field(body: &Value, key: &str) -> String {
	match body.get(key) {
		None | Some(Value::Null) => String::new(),
		Some(Value::String(s)) => s.clone(),
		Some(other) => other.to_string(),
	}
}

/// Routes a verified admin request to its action.
pub async fn dispatch(
	engine: &AdminEngine,
	principal: &Principal,
	request: ActionRequest,
) -> Result<Response, ApiError> {
	match request.action.as_str() {
		UPDATE_STATUS => update_status(engine, principal, &request).await,
		other => {
			tracing::debug!(action = %other, "Unknown action");
			Err(ApiError::BadRequest("Unknown action".to_string()))
		},
	}
}

async fn update_status(
	engine: &AdminEngine,
	principal: &Principal,
	request: &ActionRequest,
) -> Result<Response, ApiError> {
	if request.order_id.is_empty() || request.status.is_empty() {
		return Err(ApiError::BadRequest(
			"Missing parameters: order_id, status".to_string(),
		));
	}

	let order = engine
		.update_status(&request.order_id, &request.status, principal)
		.await?;

	Ok(json_response(
		StatusCode::OK,
		json!({ "ok": true, "order": order }),
	))
}
