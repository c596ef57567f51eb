//! Core of the service-order admin service.
//!
//! Holds the status transition policy, the order state machine, the audit
//! recorder and the `AdminEngine` that combines them with the configured
//! identity verifier and order store.

pub mod audit;
pub mod builder;
pub mod engine;
pub mod policy;
pub mod state;

pub use builder::{AdminBuilder, AdminFactories, BuilderError};
pub use engine::AdminEngine;
pub use state::TransitionError;
