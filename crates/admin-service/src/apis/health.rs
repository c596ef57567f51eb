//! Liveness check.

use super::error::json_response;
use axum::http::StatusCode;
use axum::response::Response;
use chrono::{SecondsFormat, Utc};
use serde_json::json;

/// Answers `GET` with the service id and the current time. Touches no backend.
pub fn liveness(service_id: &str) -> Response {
	json_response(
		StatusCode::OK,
		json!({
			"ok": true,
			"service": service_id,
			"time": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
		}),
	)
}
