//! Status transition policy.
//!
//! The permitted edges between order statuses are a fixed, directed table.
//! `cancelled` has no outbound edges. A status may always be "moved" to
//! itself, which the policy treats as a permitted no-op.

use admin_types::{OrderStatus, StoredStatus};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Each status maps to the statuses it may move to.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	use OrderStatus::*;

	let mut m = HashMap::new();
	m.insert(
		Pending,
		HashSet::from([AwaitingApproval, AwaitingPayment, InProgress, Cancelled]),
	);
	m.insert(
		AwaitingApproval,
		HashSet::from([AwaitingPayment, InProgress, Cancelled]),
	);
	m.insert(AwaitingPayment, HashSet::from([InProgress, Completed, Cancelled]));
	m.insert(InProgress, HashSet::from([Completed, Cancelled]));
	m.insert(Completed, HashSet::from([Cancelled]));
	m.insert(Cancelled, HashSet::new()); // terminal
	m
});

/// Statuses reachable from `from` in one step, in workflow order.
///
/// Does not include `from` itself.
pub fn allowed_targets(from: OrderStatus) -> Vec<OrderStatus> {
	let Some(targets) = TRANSITIONS.get(&from) else {
		return Vec::new();
	};
	OrderStatus::all()
		.filter(|status| targets.contains(status))
		.collect()
}

/// Whether an order currently in `current` may be set to `target`.
///
/// An unrecognized stored value has no outbound edges, and since it can
/// never equal a valid target, nothing is allowed from it.
pub fn is_allowed(current: &StoredStatus, target: OrderStatus) -> bool {
	match current {
		StoredStatus::Known(from) => {
			*from == target
				|| TRANSITIONS
					.get(from)
					.is_some_and(|set| set.contains(&target))
		},
		StoredStatus::Unrecognized(_) => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use OrderStatus::*;

	#[test]
	fn test_self_transition_always_allowed() {
		for status in OrderStatus::all() {
			assert!(is_allowed(&status.into(), status), "{} -> {}", status, status);
		}
	}

	#[test]
	fn test_unknown_target_is_not_a_status() {
		for raw in ["archived", "", "PENDING"] {
			assert!(raw.parse::<OrderStatus>().is_err(), "{raw:?}");
		}
	}

	#[test]
	fn test_cancelled_is_terminal() {
		assert!(allowed_targets(Cancelled).is_empty());
		for target in OrderStatus::all().filter(|s| *s != Cancelled) {
			assert!(!is_allowed(&Cancelled.into(), target));
		}
	}

	#[test]
	fn test_completed_edges() {
		assert!(is_allowed(&Completed.into(), Cancelled));
		assert!(!is_allowed(&Completed.into(), Pending));
		assert!(!is_allowed(&Completed.into(), InProgress));
	}

	#[test]
	fn test_full_table() {
		assert_eq!(
			allowed_targets(Pending),
			vec![AwaitingApproval, AwaitingPayment, InProgress, Cancelled]
		);
		assert_eq!(
			allowed_targets(AwaitingApproval),
			vec![AwaitingPayment, InProgress, Cancelled]
		);
		assert_eq!(
			allowed_targets(AwaitingPayment),
			vec![InProgress, Completed, Cancelled]
		);
		assert_eq!(allowed_targets(InProgress), vec![Completed, Cancelled]);
		assert_eq!(allowed_targets(Completed), vec![Cancelled]);
	}

	#[test]
	fn test_no_edges_lead_back_to_pending() {
		for from in OrderStatus::all().filter(|s| *s != Pending) {
			assert!(!is_allowed(&from.into(), Pending), "{} -> pending", from);
		}
	}

	#[test]
	fn test_every_status_has_an_entry() {
		for status in OrderStatus::all() {
			assert!(TRANSITIONS.contains_key(&status));
		}
		assert_eq!(TRANSITIONS.len(), OrderStatus::ALL.len());
	}

	#[test]
	fn test_unrecognized_current_rejects_everything() {
		let corrupt = StoredStatus::Unrecognized("archived".to_string());
		for target in OrderStatus::all() {
			assert!(!is_allowed(&corrupt, target));
		}
		assert_eq!(StoredStatus::from_raw(Some("archived")), corrupt);
	}
}
