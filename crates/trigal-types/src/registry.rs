//! Registry trait for self-registering implementations.
//!
//! Pluggable backends (storage, mirror) expose a `Registry` type that names
//! the implementation as it appears in configuration and hands out its factory.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// for example `"file"` for `storage.implementations.file` or `"webhook"`
	/// for `mirror.implementations.webhook`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
