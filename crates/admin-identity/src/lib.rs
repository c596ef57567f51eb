//! Identity verification for the admin service.
//!
//! Exchanges the bearer credential a caller presents for a verified
//! `Principal` carrying the user id and the admin role claim. Verification is
//! delegated to a pluggable backend selected from configuration.

use admin_types::{ConfigSchema, ImplementationRegistry, Principal, SecretString};
use async_trait::async_trait;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod static_tokens;
	pub mod supabase;
}

/// Errors that can occur while verifying a caller.
#[derive(Debug, Error)]
pub enum IdentityError {
	/// The credential is missing, malformed or rejected by the provider.
	#[error("Unauthenticated: {0}")]
	Unauthenticated(String),
	/// The provider could not be reached or answered with garbage.
	#[error("Provider error: {0}")]
	Provider(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait implemented by identity verification backends.
#[async_trait]
pub trait IdentityInterface: Send + Sync {
	/// Returns the configuration schema for this backend.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Verifies a bearer token and returns the principal it belongs to.
	///
	/// Read-only: verification never changes provider state.
	async fn verify(&self, token: &SecretString) -> Result<Principal, IdentityError>;
}

/// Factory signature shared by all identity backends.
pub type IdentityFactory = fn(&toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError>;

/// Registry trait for identity backends.
pub trait IdentityRegistry: ImplementationRegistry<Factory = IdentityFactory> {}

/// Returns `(name, factory)` for every built-in backend.
pub fn get_all_implementations() -> Vec<(&'static str, IdentityFactory)> {
	use implementations::{static_tokens, supabase};

	vec![
		(static_tokens::Registry::NAME, static_tokens::Registry::factory()),
		(supabase::Registry::NAME, supabase::Registry::factory()),
	]
}

/// Returns the token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer_token(header: &str) -> Result<&str, IdentityError> {
	let Some(token) = header.strip_prefix("Bearer ") else {
		return Err(IdentityError::Unauthenticated(
			"Missing Bearer token".to_string(),
		));
	};
	if token.is_empty() {
		return Err(IdentityError::Unauthenticated(
			"Empty Bearer token".to_string(),
		));
	}
	Ok(token)
}

/// Identity service wrapping the configured backend.
pub struct IdentityService {
	backend: Box<dyn IdentityInterface>,
}

impl IdentityService {
	pub fn new(backend: Box<dyn IdentityInterface>) -> Self {
		Self { backend }
	}

	/// Authenticates a request from its raw `Authorization` header.
	///
	/// Every failure, including an unreachable provider, comes back as
	/// `IdentityError::Unauthenticated`; the caller cannot be verified either way.
	pub async fn authenticate(&self, header: Option<&str>) -> Result<Principal, IdentityError> {
		let token = extract_bearer_token(header.unwrap_or_default())?;
		let token = SecretString::from(token);

		match self.backend.verify(&token).await {
			Ok(principal) => {
				tracing::debug!(user_id = %principal.id, is_admin = principal.is_admin, "Caller verified");
				Ok(principal)
			},
			Err(IdentityError::Unauthenticated(reason)) => {
				tracing::debug!(reason = %reason, "Credential rejected");
				Err(IdentityError::Unauthenticated(reason))
			},
			Err(e) => {
				tracing::warn!(error = %e, "Identity provider unavailable");
				Err(IdentityError::Unauthenticated(e.to_string()))
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Arc;

	struct CountingVerifier {
		calls: Arc<AtomicUsize>,
		result: fn() -> Result<Principal, IdentityError>,
	}

	#[async_trait]
	impl IdentityInterface for CountingVerifier {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(implementations::static_tokens::StaticIdentitySchema)
		}

		async fn verify(&self, _token: &SecretString) -> Result<Principal, IdentityError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			(self.result)()
		}
	}

	fn service(result: fn() -> Result<Principal, IdentityError>) -> (IdentityService, Arc<AtomicUsize>) {
		let calls = Arc::new(AtomicUsize::new(0));
		let verifier = CountingVerifier {
			calls: calls.clone(),
			result,
		};
		(IdentityService::new(Box::new(verifier)), calls)
	}

	#[test]
	fn test_extract_bearer_token() {
		assert_eq!(extract_bearer_token("Bearer abc123").unwrap(), "abc123");
		assert!(extract_bearer_token("Basic abc123").is_err());
		assert!(extract_bearer_token("bearer abc123").is_err());
		assert!(extract_bearer_token("Bearer ").is_err());
		assert!(extract_bearer_token("").is_err());
	}

	#[tokio::test]
	async fn test_malformed_header_skips_provider() {
		let (service, calls) = service(|| {
			Ok(Principal {
				id: "u1".into(),
				is_admin: true,
			})
		});

		for header in [None, Some("Token abc"), Some("Bearer ")] {
			let result = service.authenticate(header).await;
			assert!(matches!(result, Err(IdentityError::Unauthenticated(_))));
		}
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_provider_failure_is_unauthenticated() {
		let (service, calls) = service(|| Err(IdentityError::Provider("connection refused".into())));

		let result = service.authenticate(Some("Bearer abc")).await;
		assert!(matches!(result, Err(IdentityError::Unauthenticated(_))));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_verified_principal_passes_through() {
		let (service, _) = service(|| {
			Ok(Principal {
				id: "u1".into(),
				is_admin: false,
			})
		});

		let principal = service.authenticate(Some("Bearer abc")).await.unwrap();
		assert_eq!(principal.id, "u1");
		assert!(!principal.is_admin);
	}

	#[test]
	fn test_all_implementations_registered() {
		let names: Vec<&str> = get_all_implementations()
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["static", "supabase"]);
	}
}
