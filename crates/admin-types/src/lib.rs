//! Common types for the service-order admin system.
//!
//! This crate defines the domain types shared by every admin component:
//! order statuses, order records, verified principals and audit records,
//! together with configuration validation helpers and the implementation
//! registry used by pluggable backends.

/// Audit trail types for recorded status changes.
pub mod audit;
/// Verified caller identity types.
pub mod identity;
/// Order record types returned by the order store.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Redacting wrapper for credential material.
pub mod secret_string;
/// Order status enumeration and stored-status handling.
pub mod status;
/// Table names shared by the storage backends.
pub mod storage;
/// Configuration validation types for implementation-specific settings.
pub mod validation;

pub use audit::{AuditRecord, AuditSource};
pub use identity::Principal;
pub use order::OrderRecord;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use status::{OrderStatus, StoredStatus, UnknownStatus};
pub use storage::StorageTable;
pub use validation::*;
