//! Common types module for the Trigal fulfillment system.
//!
//! This module defines the core data types shared by every Trigal crate:
//! orders and their audit trail, roles and capabilities, catalog references,
//! events, storage keys and configuration validation helpers.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Read-only catalog entities referenced by orders (branches, plants).
pub mod catalog;
/// Event types for inter-service communication.
pub mod events;
/// Dashboard metrics snapshot types.
pub mod metrics;
/// Order types including line items, lifecycle states and history entries.
pub mod order;
/// Registry trait for pluggable implementations.
pub mod registry;
/// Roles, capabilities and the acting principal.
pub mod roles;
/// Storage types for managing persistent data.
pub mod storage;
/// Utility functions for common formatting and time handling.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use catalog::*;
pub use events::*;
pub use metrics::*;
pub use order::*;
pub use registry::*;
pub use roles::*;
pub use storage::*;
pub use utils::{current_time, truncate_id};
pub use validation::*;
