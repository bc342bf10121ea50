//! Event handlers run by the engine's background loop.

pub mod mirror;

pub use mirror::MirrorHandler;
