//! HTTP server for the admin endpoint.
//!
//! A single handler answers every method. It is mounted at `/` and at
//! `/functions/v1/admin`, the path existing clients call.

use crate::apis::{self, update_status::ActionRequest, ApiError};
use admin_config::{ApiConfig, CorsConfig};
use admin_core::AdminEngine;
use axum::{
	body::Bytes,
	error_handling::HandleErrorLayer,
	extract::{rejection::BytesRejection, DefaultBodyLimit, State},
	http::{header, HeaderMap, HeaderName, HeaderValue, Method},
	response::{IntoResponse, Response},
	routing::any,
	BoxError, Router,
};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

/// Path hosted functions are reached under.
pub const FUNCTION_PATH: &str = "/functions/v1/admin";

/// Shared application state for the handler.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<AdminEngine>,
}

/// Builds the router with its middleware stack.
pub fn build_router(engine: Arc<AdminEngine>) -> Router {
	let api_config = engine.config().api.clone();

	Router::new()
		.route("/", any(handle_admin))
		.route(FUNCTION_PATH, any(handle_admin))
		.layer(DefaultBodyLimit::max(api_config.max_request_size))
		.layer(
			ServiceBuilder::new()
				.layer(CatchPanicLayer::custom(handle_panic))
				.layer(TraceLayer::new_for_http())
				.layer(cors_layer(api_config.cors.as_ref()))
				.layer(HandleErrorLayer::new(handle_timeout))
				.timeout(Duration::from_secs(api_config.timeout_seconds)),
		)
		.with_state(AppState { engine })
}

/// Starts the HTTP server and serves until the listener fails.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<AdminEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(engine);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Admin API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Handles every request to the admin endpoint.
///
/// Checks run in order and stop at the first failure: method, credential,
/// admin role, payload, then the action itself.
async fn handle_admin(
	State(state): State<AppState>,
	method: Method,
	headers: HeaderMap,
	body: Result<Bytes, BytesRejection>,
) -> Response {
	let result = match method {
		Method::GET => Ok(apis::health::liveness(&state.engine.config().service.id)),
		Method::POST => handle_post(&state.engine, &headers, body).await,
		other => {
			tracing::debug!(method = %other, "Unsupported method");
			Err(ApiError::MethodNotAllowed)
		},
	};

	result.unwrap_or_else(|e| {
		if let ApiError::Store(ref message) = e {
			tracing::error!(error = %message, "Order store failure");
		}
		e.into_response()
	})
}

async fn handle_post(
	engine: &AdminEngine,
	headers: &HeaderMap,
	body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
	let authorization = headers
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok());

	let principal = engine
		.authenticate(authorization)
		.await
		.map_err(|_| ApiError::Unauthenticated)?;

	if !principal.is_admin {
		tracing::info!(user_id = %principal.id, "Admin role required");
		return Err(ApiError::Forbidden);
	}

	let body = body.unwrap_or_else(|rejection| {
		tracing::debug!(error = %rejection, "Unreadable request body");
		Bytes::new()
	});
	let request = ActionRequest::from_body(&body);

	apis::update_status::dispatch(engine, &principal, request).await
}

/// Builds the CORS layer; permissive unless origins are configured.
fn cors_layer(config: Option<&CorsConfig>) -> CorsLayer {
	let Some(config) = config else {
		return CorsLayer::permissive();
	};

	let origins: Vec<HeaderValue> = config
		.allowed_origins
		.iter()
		.filter_map(|origin| match origin.parse::<HeaderValue>() {
			Ok(value) => Some(value),
			Err(_) => {
				tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
				None
			},
		})
		.collect();

	CorsLayer::new()
		.allow_origin(origins)
		.allow_methods([Method::GET, Method::POST])
		.allow_headers([
			header::AUTHORIZATION,
			header::CONTENT_TYPE,
			HeaderName::from_static("apikey"),
			HeaderName::from_static("x-client-info"),
		])
}

async fn handle_timeout(err: BoxError) -> ApiError {
	if err.is::<tower::timeout::error::Elapsed>() {
		tracing::warn!("Request timed out");
		ApiError::Internal("request timed out".to_string())
	} else {
		ApiError::Internal(err.to_string())
	}
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
	let detail = if let Some(s) = err.downcast_ref::<String>() {
		s.clone()
	} else if let Some(s) = err.downcast_ref::<&str>() {
		s.to_string()
	} else {
		"unknown panic".to_string()
	};

	tracing::error!(panic = %detail, "Request handler panicked");
	ApiError::Internal(detail).into_response()
}
