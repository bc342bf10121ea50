//! Request handlers behind the HTTP routes.

pub mod identity;
pub mod order;
