//! Domain error types.

use common::AggregateId;
use event_store::EventStoreError;
use thiserror::Error;

use crate::booking::SlotError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the event store.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// A booking rule rejected the command.
    #[error("{0}")]
    Slot(#[from] SlotError),

    /// The stored stream under this id belongs to another aggregate type.
    #[error("Aggregate {aggregate_id} is a {found}, not a {expected}")]
    AggregateTypeMismatch {
        aggregate_id: AggregateId,
        expected: &'static str,
        found: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of a [`DomainError`], used by callers that map
/// failures onto another error surface (HTTP status codes, for instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The addressed booking does not exist.
    NotFound,
    /// The aggregate's current state does not allow the command.
    InvalidState,
    /// The command itself is malformed.
    ValidationFailed,
    /// Store or serialization failure.
    Internal,
}

impl DomainError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Slot(err) => err.kind(),
            // A lost optimistic race means the state moved under the command.
            DomainError::EventStore(EventStoreError::ConcurrencyConflict { .. }) => {
                ErrorKind::InvalidState
            }
            DomainError::EventStore(_)
            | DomainError::AggregateTypeMismatch { .. }
            | DomainError::Serialization(_) => ErrorKind::Internal,
        }
    }
}
