//! Verified caller identity.

use serde::{Deserialize, Serialize};

/// The verified identity making a request.
///
/// Derived per request from a bearer credential and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
	/// Identity provider user id.
	pub id: String,
	/// Whether the provider granted the admin role claim.
	pub is_admin: bool,
}
