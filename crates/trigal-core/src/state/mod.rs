//! State management for orders.
//!
//! Holds the lifecycle state machine and the persistence of its transitions.

pub mod order;

pub use order::{
	apply_transition, check_transition, OrderStateMachine, Transition, TransitionCheck,
};
