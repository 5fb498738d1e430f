//! Booking domain events.

use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{Booking, Participant, ParticipantType};

/// Events recorded by both the slot and the participant-slot aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum BookingEvent {
    /// A participant declared itself available for the slot.
    ParticipantMarkedAvailable(AvailabilityData),

    /// A participant withdrew its availability.
    ParticipantUnmarkedAvailable(AvailabilityData),

    /// A participant was bound to a reservation.
    ParticipantBooked(BookingData),

    /// A participant's share of a reservation was released.
    ParticipantCanceled(BookingData),
}

impl DomainEvent for BookingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::ParticipantMarkedAvailable(_) => "ParticipantMarkedAvailable",
            BookingEvent::ParticipantUnmarkedAvailable(_) => "ParticipantUnmarkedAvailable",
            BookingEvent::ParticipantBooked(_) => "ParticipantBooked",
            BookingEvent::ParticipantCanceled(_) => "ParticipantCanceled",
        }
    }
}

/// Data for the availability events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityData {
    pub slot_id: String,
    pub participant_id: String,
    pub participant_type: ParticipantType,
}

impl AvailabilityData {
    pub fn participant(&self) -> Participant {
        Participant::new(self.participant_id.clone(), self.participant_type)
    }
}

/// Data for the booking and cancellation events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingData {
    pub slot_id: String,
    pub participant_id: String,
    pub participant_type: ParticipantType,
    pub booking_id: String,
}

impl BookingData {
    pub fn participant(&self) -> Participant {
        Participant::new(self.participant_id.clone(), self.participant_type)
    }

    pub fn booking(&self) -> Booking {
        Booking::new(self.participant(), self.booking_id.clone())
    }
}

// Convenience constructors for events
impl BookingEvent {
    pub fn marked_available(slot_id: &str, participant: &Participant) -> Self {
        BookingEvent::ParticipantMarkedAvailable(AvailabilityData {
            slot_id: slot_id.to_string(),
            participant_id: participant.id.clone(),
            participant_type: participant.participant_type,
        })
    }

    pub fn unmarked_available(slot_id: &str, participant: &Participant) -> Self {
        BookingEvent::ParticipantUnmarkedAvailable(AvailabilityData {
            slot_id: slot_id.to_string(),
            participant_id: participant.id.clone(),
            participant_type: participant.participant_type,
        })
    }

    pub fn booked(slot_id: &str, participant: &Participant, booking_id: &str) -> Self {
        BookingEvent::ParticipantBooked(BookingData {
            slot_id: slot_id.to_string(),
            participant_id: participant.id.clone(),
            participant_type: participant.participant_type,
            booking_id: booking_id.to_string(),
        })
    }

    pub fn canceled(slot_id: &str, participant: &Participant, booking_id: &str) -> Self {
        BookingEvent::ParticipantCanceled(BookingData {
            slot_id: slot_id.to_string(),
            participant_id: participant.id.clone(),
            participant_type: participant.participant_type,
            booking_id: booking_id.to_string(),
        })
    }

    /// Returns the slot the event belongs to.
    pub fn slot_id(&self) -> &str {
        match self {
            BookingEvent::ParticipantMarkedAvailable(data)
            | BookingEvent::ParticipantUnmarkedAvailable(data) => &data.slot_id,
            BookingEvent::ParticipantBooked(data) | BookingEvent::ParticipantCanceled(data) => {
                &data.slot_id
            }
        }
    }

    /// Returns the participant the event is about.
    pub fn participant(&self) -> Participant {
        match self {
            BookingEvent::ParticipantMarkedAvailable(data)
            | BookingEvent::ParticipantUnmarkedAvailable(data) => data.participant(),
            BookingEvent::ParticipantBooked(data) | BookingEvent::ParticipantCanceled(data) => {
                data.participant()
            }
        }
    }

    /// Returns the booking id for booking and cancellation events.
    pub fn booking_id(&self) -> Option<&str> {
        match self {
            BookingEvent::ParticipantBooked(data) | BookingEvent::ParticipantCanceled(data) => {
                Some(&data.booking_id)
            }
            _ => None,
        }
    }
}
