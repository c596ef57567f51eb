//! Admin engine tying identity, order store and audit together.
//!
//! The engine is built once at startup and shared across requests behind an
//! `Arc`. It holds no per-request state.

use crate::audit::AuditRecorder;
use crate::state::{OrderStateMachine, TransitionError};
use admin_config::Config;
use admin_identity::{IdentityError, IdentityService};
use admin_storage::StorageService;
use admin_types::{OrderRecord, Principal};
use std::sync::Arc;

/// Main engine serving admin requests.
#[derive(Clone)]
pub struct AdminEngine {
	config: Config,
	identity: Arc<IdentityService>,
	state_machine: Arc<OrderStateMachine>,
	audit: Arc<AuditRecorder>,
}

impl AdminEngine {
	pub fn new(config: Config, identity: Arc<IdentityService>, storage: Arc<StorageService>) -> Self {
		let state_machine = Arc::new(OrderStateMachine::new(
			storage.clone(),
			config.transition.guard_concurrent_updates,
		));
		let audit = Arc::new(AuditRecorder::new(storage));

		Self {
			config,
			identity,
			state_machine,
			audit,
		}
	}

	/// Returns the configuration the engine was built from.
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Verifies the caller behind an `Authorization` header value.
	pub async fn authenticate(&self, header: Option<&str>) -> Result<Principal, IdentityError> {
		self.identity.authenticate(header).await
	}

	/// Changes an order's status on behalf of `actor` and records the change.
	///
	/// The audit append happens after the write and cannot fail the call.
	pub async fn update_status(
		&self,
		order_id: &str,
		target: &str,
		actor: &Principal,
	) -> Result<OrderRecord, TransitionError> {
		let transition = match self
			.state_machine
			.transition_order_status(order_id, target)
			.await
		{
			Ok(transition) => transition,
			Err(e) => {
				tracing::info!(order_id = %order_id, target = %target, user_id = %actor.id, reason = %e, "Status update rejected");
				return Err(e);
			},
		};

		tracing::info!(
			order_id = %order_id,
			from = %transition.previous,
			to = %transition.order.status,
			user_id = %actor.id,
			"Status updated"
		);

		self.audit
			.record(
				order_id,
				&actor.id,
				&transition.previous,
				transition.order.status,
			)
			.await;

		Ok(transition.order)
	}
}
