//! Vocabulary shared by the slot and participant-slot aggregates.

mod events;
mod value_objects;

pub use events::{AvailabilityData, BookingData, BookingEvent};
pub use value_objects::{Booking, Participant, ParticipantType};

use thiserror::Error;

use crate::error::ErrorKind;

/// Separates the parts of a participant-slot key. Slot and participant ids
/// may not contain it, which keeps slot keys and participant-slot keys apart.
pub const KEY_SEPARATOR: char = '/';

/// Number of participants every reservation binds together.
pub const PARTICIPANTS_PER_BOOKING: usize = 3;

/// Errors raised by booking rules on either aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// The three participants are not all available in their role.
    #[error("Timeslot is not bookable")]
    NotBookable,

    /// The booking id is already active in this slot.
    #[error("Booking {booking_id} already exists in this timeslot")]
    DuplicateBooking { booking_id: String },

    /// No active booking carries this id.
    #[error("Booking does not exist: {booking_id}")]
    BookingNotFound { booking_id: String },

    /// The booking does not cover exactly three participants.
    #[error("Booking {booking_id} is incomplete: found {found} of 3 participants")]
    IncompleteBooking { booking_id: String, found: usize },

    /// A required identifier was empty after trimming.
    #[error("{0} must not be blank")]
    BlankField(&'static str),

    /// An identifier that would make aggregate keys ambiguous.
    #[error("{field} must not contain '/': {value}")]
    InvalidIdentifier { field: &'static str, value: String },

    /// Text that does not name a participant type.
    #[error("invalid participant type: {0}")]
    InvalidParticipantType(String),

    /// Text that does not name a participant status.
    #[error("invalid participant status: {0}")]
    InvalidParticipantStatus(String),
}

impl SlotError {
    /// Classifies the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SlotError::BookingNotFound { .. } => ErrorKind::NotFound,
            SlotError::NotBookable
            | SlotError::DuplicateBooking { .. }
            | SlotError::IncompleteBooking { .. } => ErrorKind::InvalidState,
            SlotError::BlankField(_)
            | SlotError::InvalidIdentifier { .. }
            | SlotError::InvalidParticipantType(_)
            | SlotError::InvalidParticipantStatus(_) => ErrorKind::ValidationFailed,
        }
    }
}

/// Returns the trimmed value, or [`SlotError::BlankField`] if nothing is left.
pub(crate) fn require_non_blank<'a>(
    field: &'static str,
    value: &'a str,
) -> Result<&'a str, SlotError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(SlotError::BlankField(field))
    } else {
        Ok(trimmed)
    }
}

/// Like [`require_non_blank`], and also rejects values containing
/// [`KEY_SEPARATOR`]. Used for ids that end up in aggregate keys.
pub(crate) fn require_identifier<'a>(
    field: &'static str,
    value: &'a str,
) -> Result<&'a str, SlotError> {
    let trimmed = require_non_blank(field, value)?;
    if trimmed.contains(KEY_SEPARATOR) {
        Err(SlotError::InvalidIdentifier {
            field,
            value: trimmed.to_string(),
        })
    } else {
        Ok(trimmed)
    }
}

/// Trims a slot id and checks it can key a slot stream.
pub fn validate_slot_id(slot_id: &str) -> Result<&str, SlotError> {
    require_identifier("slot_id", slot_id)
}
