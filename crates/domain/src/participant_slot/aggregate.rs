//! Participant-slot aggregate implementation.

use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::booking::{
    BookingEvent, Participant, SlotError, require_identifier, require_non_blank,
};

use super::{ParticipantSlotCommand, ParticipantStatus};

/// Identity of a participant-slot aggregate: `{slot_id}/{type}/{participant_id}`
/// with the type in lowercase, e.g. `S1/student/A`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantSlotId {
    slot_id: String,
    participant: Participant,
}

impl ParticipantSlotId {
    pub fn new(slot_id: impl Into<String>, participant: Participant) -> Self {
        Self {
            slot_id: slot_id.into(),
            participant,
        }
    }

    pub fn slot_id(&self) -> &str {
        &self.slot_id
    }

    pub fn participant(&self) -> &Participant {
        &self.participant
    }

    pub fn aggregate_id(&self) -> AggregateId {
        AggregateId::new(self.to_string())
    }
}

impl std::fmt::Display for ParticipantSlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.slot_id,
            self.participant.participant_type.as_key(),
            self.participant.id
        )
    }
}

impl From<&ParticipantSlotId> for AggregateId {
    fn from(id: &ParticipantSlotId) -> Self {
        id.aggregate_id()
    }
}

/// One participant's status for one slot.
///
/// Commands whose guard does not hold are accepted and record nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSlot {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    slot_id: Option<String>,

    participant: Option<Participant>,

    status: ParticipantStatus,

    /// Present only while booked.
    booking_id: Option<String>,
}

impl Aggregate for ParticipantSlot {
    type Event = BookingEvent;
    type Error = SlotError;

    fn aggregate_type() -> &'static str {
        "ParticipantSlot"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id.clone()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        if self.id.is_none() {
            let participant = event.participant();
            let id = ParticipantSlotId::new(event.slot_id(), participant.clone());
            self.id = Some(id.aggregate_id());
            self.slot_id = Some(event.slot_id().to_string());
            self.participant = Some(participant);
        }

        match event {
            BookingEvent::ParticipantMarkedAvailable(_) => {
                self.status = ParticipantStatus::Available;
                self.booking_id = None;
            }
            BookingEvent::ParticipantUnmarkedAvailable(_) => {
                self.status = ParticipantStatus::Unavailable;
                self.booking_id = None;
            }
            BookingEvent::ParticipantBooked(data) => {
                self.status = ParticipantStatus::Booked;
                self.booking_id = Some(data.booking_id);
            }
            BookingEvent::ParticipantCanceled(_) => {
                self.status = ParticipantStatus::Available;
                self.booking_id = None;
            }
        }
    }
}

// Query methods
impl ParticipantSlot {
    pub fn status(&self) -> ParticipantStatus {
        self.status
    }

    pub fn booking_id(&self) -> Option<&str> {
        self.booking_id.as_deref()
    }

    pub fn slot_id(&self) -> Option<&str> {
        self.slot_id.as_deref()
    }

    pub fn participant(&self) -> Option<&Participant> {
        self.participant.as_ref()
    }
}

// Command methods (return events)
impl ParticipantSlot {
    /// Decides a command for `participant` in `slot_id`.
    ///
    /// Returns no events when the current status does not allow the command.
    pub fn handle(
        &self,
        slot_id: &str,
        participant: &Participant,
        command: &ParticipantSlotCommand,
    ) -> Result<Vec<BookingEvent>, SlotError> {
        let slot_id = require_identifier("slot_id", slot_id)?;
        let participant = Participant::try_new(&participant.id, participant.participant_type)?;

        let event = match command {
            ParticipantSlotCommand::MarkAvailable => self
                .status
                .can_mark_available()
                .then(|| BookingEvent::marked_available(slot_id, &participant)),
            ParticipantSlotCommand::UnmarkAvailable => self
                .status
                .can_unmark_available()
                .then(|| BookingEvent::unmarked_available(slot_id, &participant)),
            ParticipantSlotCommand::Book { booking_id } => {
                let booking_id = require_non_blank("booking_id", booking_id)?;
                self.status
                    .can_book()
                    .then(|| BookingEvent::booked(slot_id, &participant, booking_id))
            }
            ParticipantSlotCommand::Cancel { booking_id } => {
                let booking_id = require_non_blank("booking_id", booking_id)?;
                (self.status.can_cancel() && self.booking_id.as_deref() == Some(booking_id))
                    .then(|| BookingEvent::canceled(slot_id, &participant, booking_id))
            }
        };

        match event {
            Some(event) => Ok(vec![event]),
            None => {
                tracing::debug!(
                    slot_id,
                    participant = %participant,
                    status = %self.status,
                    command = command.name(),
                    "command not allowed in current status, ignoring"
                );
                Ok(vec![])
            }
        }
    }
}
