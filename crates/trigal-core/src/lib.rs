//! Core of the Trigal order fulfillment system.
//!
//! Holds the order rules: the role policy, routing of new orders to a plant
//! and destination, the status state machine, per-role visibility and the
//! dashboard metrics. [`FulfillmentEngine`] ties them to the store and the
//! event bus; [`FulfillmentBuilder`] assembles an engine from configuration.

pub mod builder;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod policy;
pub mod routing;
pub mod state;
pub mod visibility;

pub use builder::{BuilderError, FulfillmentBuilder, FulfillmentFactories};
pub use engine::event_bus::EventBus;
pub use engine::lifecycle::SeedData;
pub use engine::{EngineError, FulfillmentEngine};
pub use error::OrderError;
