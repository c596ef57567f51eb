//! Order status state machine.
//!
//! Reads an order's current status, checks the requested change against the
//! transition policy and writes it through the order store.

pub mod order;

pub use order::{OrderStateMachine, TransitionError};
