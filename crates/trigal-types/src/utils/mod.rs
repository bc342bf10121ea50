//! Utility functions shared across the fulfillment crates.

pub mod formatting;
pub mod helpers;

pub use formatting::truncate_id;
pub use helpers::current_time;
