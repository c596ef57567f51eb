//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Every pluggable backend (order stores, identity verifiers) ships a
/// `Registry` type implementing this trait, declaring the name it is
/// configured under and the factory that builds it.
pub trait ImplementationRegistry {
	/// Name used in configuration, e.g. `memory` for
	/// `[storage.implementations.memory]`.
	const NAME: &'static str;

	/// Factory function type for the component family.
	type Factory;

	/// Returns the factory function for this implementation.
	fn factory() -> Self::Factory;
}
