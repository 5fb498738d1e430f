//! Shared types for the flight scheduling workspace.

mod types;

pub use types::AggregateId;
