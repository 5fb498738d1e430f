//! HTTP route handlers.

pub mod flight;
pub mod health;
pub mod metrics;
