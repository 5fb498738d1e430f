//! Slot commands.

use serde::{Deserialize, Serialize};

use crate::booking::{Participant, SlotError, require_identifier, require_non_blank};

/// Request to book a student, an aircraft and an instructor together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookReservation {
    pub student_id: String,
    pub aircraft_id: String,
    pub instructor_id: String,
    pub booking_id: String,
}

impl BookReservation {
    pub fn new(
        student_id: impl Into<String>,
        aircraft_id: impl Into<String>,
        instructor_id: impl Into<String>,
        booking_id: impl Into<String>,
    ) -> Self {
        Self {
            student_id: student_id.into(),
            aircraft_id: aircraft_id.into(),
            instructor_id: instructor_id.into(),
            booking_id: booking_id.into(),
        }
    }

    /// Returns a copy with every field trimmed, or the first blank field.
    pub fn normalized(&self) -> Result<Self, SlotError> {
        Ok(Self {
            student_id: require_identifier("student_id", &self.student_id)?.to_string(),
            aircraft_id: require_identifier("aircraft_id", &self.aircraft_id)?.to_string(),
            instructor_id: require_identifier("instructor_id", &self.instructor_id)?.to_string(),
            booking_id: require_non_blank("booking_id", &self.booking_id)?.to_string(),
        })
    }

    /// The three participants, in booking order.
    pub fn participants(&self) -> [Participant; 3] {
        [
            Participant::student(self.student_id.clone()),
            Participant::aircraft(self.aircraft_id.clone()),
            Participant::instructor(self.instructor_id.clone()),
        ]
    }
}

/// Commands accepted by the slot aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotCommand {
    MarkAvailable(Participant),
    UnmarkAvailable(Participant),
    BookReservation(BookReservation),
    CancelBooking { booking_id: String },
}
