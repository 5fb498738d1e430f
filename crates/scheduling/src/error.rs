//! Scheduling error types.

use domain::{DomainError, ErrorKind};
use thiserror::Error;

use crate::conditions::ConditionsError;

/// Errors that can occur while coordinating a booking.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// The slot or a participant rejected the command.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The conditions service could not give a verdict.
    #[error(transparent)]
    Conditions(#[from] ConditionsError),

    /// The conditions service judged the slot unflyable.
    #[error("Conditions do not permit booking slot {slot_id}: {summary}")]
    ConditionsNotMet { slot_id: String, summary: String },
}

impl SchedulingError {
    /// Returns the domain classification, if this is a domain failure.
    pub fn domain_kind(&self) -> Option<ErrorKind> {
        match self {
            SchedulingError::Domain(err) => Some(err.kind()),
            _ => None,
        }
    }
}

/// Convenience type alias for scheduling results.
pub type Result<T> = std::result::Result<T, SchedulingError>;
