//! Append-only event log for the flight scheduling system.
//!
//! Events are stored per aggregate in version order. A batch of events
//! handed to [`EventStore::append`] is all-or-nothing: either every event
//! in the batch is appended or none is.

pub mod error;
pub mod event;
pub mod memory;
pub mod query;
pub mod snapshot;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventEnvelope, EventEnvelopeBuilder, EventId, Version};
pub use memory::InMemoryEventStore;
pub use query::EventQuery;
pub use snapshot::Snapshot;
pub use store::{AppendOptions, EventStore, EventStoreExt, EventStream};
