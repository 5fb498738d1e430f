//! Timeslot aggregate implementation.

use std::collections::BTreeSet;

use common::AggregateId;
use event_store::Version;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, SnapshotCapable};
use crate::booking::{
    Booking, BookingEvent, PARTICIPANTS_PER_BOOKING, Participant, ParticipantType, SlotError,
    require_non_blank,
};

use super::{BookReservation, SlotCommand};

/// Booking slot aggregate root.
///
/// Holds who has declared availability for one slot and which bookings are
/// active in it. Whether the slot is bookable is derived from these two
/// sets on demand and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeslot {
    id: Option<AggregateId>,

    #[serde(default)]
    version: Version,

    available: BTreeSet<Participant>,

    bookings: BTreeSet<Booking>,
}

impl Aggregate for Timeslot {
    type Event = BookingEvent;
    type Error = SlotError;

    fn aggregate_type() -> &'static str {
        "BookingSlot"
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
            self.id = Some(AggregateId::new(event.slot_id()));
        }

        match event {
            BookingEvent::ParticipantMarkedAvailable(data) => {
                self.available.insert(data.participant());
            }
            BookingEvent::ParticipantUnmarkedAvailable(data) => {
                self.available.remove(&data.participant());
            }
            BookingEvent::ParticipantBooked(data) => {
                self.available.remove(&data.participant());
                self.bookings.insert(data.booking());
            }
            BookingEvent::ParticipantCanceled(data) => {
                // Cancelled participants must re-declare availability.
                self.bookings.remove(&data.booking());
            }
        }
    }
}

impl SnapshotCapable for Timeslot {}

// Query methods
impl Timeslot {
    /// Participants currently declared available.
    pub fn available(&self) -> impl Iterator<Item = &Participant> {
        self.available.iter()
    }

    /// Active bookings.
    pub fn bookings(&self) -> impl Iterator<Item = &Booking> {
        self.bookings.iter()
    }

    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    /// Returns true if the participant is declared available in that role.
    pub fn is_available(&self, participant: &Participant) -> bool {
        self.available.contains(participant)
    }

    /// Returns true if the participant holds any active booking in that role.
    pub fn has_active_booking(&self, participant: &Participant) -> bool {
        self.bookings.iter().any(|b| &b.participant == participant)
    }

    /// Bookings carrying the given booking id.
    pub fn find_booking(&self, booking_id: &str) -> Vec<&Booking> {
        self.bookings
            .iter()
            .filter(|b| b.booking_id == booking_id)
            .collect()
    }

    /// Returns true if the three participants are available in their roles
    /// and none of them is already booked in that role.
    pub fn is_bookable(&self, student_id: &str, aircraft_id: &str, instructor_id: &str) -> bool {
        [
            Participant::student(student_id),
            Participant::aircraft(aircraft_id),
            Participant::instructor(instructor_id),
        ]
        .iter()
        .all(|p| self.is_available(p) && !self.has_active_booking(p))
    }
}

// Command methods (return events)
impl Timeslot {
    /// Declares a participant available. Repeating the call records another
    /// event but leaves the state unchanged.
    pub fn mark_available(
        &self,
        slot_id: &str,
        participant: &Participant,
    ) -> Result<Vec<BookingEvent>, SlotError> {
        let participant = Participant::try_new(&participant.id, participant.participant_type)?;
        Ok(vec![BookingEvent::marked_available(slot_id, &participant)])
    }

    /// Withdraws a participant's availability.
    pub fn unmark_available(
        &self,
        slot_id: &str,
        participant: &Participant,
    ) -> Result<Vec<BookingEvent>, SlotError> {
        let participant = Participant::try_new(&participant.id, participant.participant_type)?;
        Ok(vec![BookingEvent::unmarked_available(slot_id, &participant)])
    }

    /// Books the three participants of a reservation together.
    ///
    /// Emits one `ParticipantBooked` per participant, in student, aircraft,
    /// instructor order, all carrying the reservation's booking id.
    pub fn book(
        &self,
        slot_id: &str,
        reservation: &BookReservation,
    ) -> Result<Vec<BookingEvent>, SlotError> {
        let reservation = reservation.normalized()?;

        if !self.find_booking(&reservation.booking_id).is_empty() {
            return Err(SlotError::DuplicateBooking {
                booking_id: reservation.booking_id,
            });
        }

        if !self.is_bookable(
            &reservation.student_id,
            &reservation.aircraft_id,
            &reservation.instructor_id,
        ) {
            return Err(SlotError::NotBookable);
        }

        Ok(reservation
            .participants()
            .iter()
            .map(|p| BookingEvent::booked(slot_id, p, &reservation.booking_id))
            .collect())
    }

    /// Cancels every participant of a booking together.
    pub fn cancel(&self, slot_id: &str, booking_id: &str) -> Result<Vec<BookingEvent>, SlotError> {
        let booking_id = require_non_blank("booking_id", booking_id)?;
        let matches = self.find_booking(booking_id);

        match matches.len() {
            0 => Err(SlotError::BookingNotFound {
                booking_id: booking_id.to_string(),
            }),
            PARTICIPANTS_PER_BOOKING => {
                let mut participants: Vec<&Participant> =
                    matches.iter().map(|b| &b.participant).collect();
                participants.sort_by_key(|p| booking_order(p.participant_type));
                Ok(participants
                    .into_iter()
                    .map(|p| BookingEvent::canceled(slot_id, p, booking_id))
                    .collect())
            }
            found => Err(SlotError::IncompleteBooking {
                booking_id: booking_id.to_string(),
                found,
            }),
        }
    }

    /// Decides any slot command.
    pub fn handle(&self, slot_id: &str, command: &SlotCommand) -> Result<Vec<BookingEvent>, SlotError> {
        match command {
            SlotCommand::MarkAvailable(participant) => self.mark_available(slot_id, participant),
            SlotCommand::UnmarkAvailable(participant) => {
                self.unmark_available(slot_id, participant)
            }
            SlotCommand::BookReservation(reservation) => self.book(slot_id, reservation),
            SlotCommand::CancelBooking { booking_id } => self.cancel(slot_id, booking_id),
        }
    }
}

fn booking_order(participant_type: ParticipantType) -> usize {
    ParticipantType::ALL
        .iter()
        .position(|t| *t == participant_type)
        .unwrap_or(ParticipantType::ALL.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot_with(events: Vec<BookingEvent>) -> Timeslot {
        let mut slot = Timeslot::default();
        let mut version = Version::initial();
        for event in events {
            slot.apply(event);
            version = version.next();
            slot.set_version(version);
        }
        slot
    }

    fn all_available(slot_id: &str) -> Vec<BookingEvent> {
        vec![
            BookingEvent::marked_available(slot_id, &Participant::student("A")),
            BookingEvent::marked_available(slot_id, &Participant::aircraft("B")),
            BookingEvent::marked_available(slot_id, &Participant::instructor("C")),
        ]
    }

    fn reservation(booking_id: &str) -> BookReservation {
        BookReservation::new("A", "B", "C", booking_id)
    }

    #[test]
    fn empty_slot_has_nothing() {
        let slot = Timeslot::default();
        assert!(slot.id().is_none());
        assert_eq!(slot.available_count(), 0);
        assert_eq!(slot.booking_count(), 0);
        assert!(!slot.is_bookable("A", "B", "C"));
    }

    #[test]
    fn marking_twice_is_idempotent_on_state() {
        let mut events = all_available("S1");
        events.push(BookingEvent::marked_available("S1", &Participant::student("A")));
        let slot = slot_with(events);

        assert_eq!(slot.id(), Some(AggregateId::new("S1")));
        assert_eq!(slot.available_count(), 3);
    }

    #[test]
    fn mark_available_always_emits_one_event() {
        let slot = slot_with(all_available("S1"));
        let events = slot
            .mark_available("S1", &Participant::student("A"))
            .unwrap();
        assert_eq!(
            events,
            vec![BookingEvent::marked_available("S1", &Participant::student("A"))]
        );
    }

    #[test]
    fn mark_available_rejects_blank_participant() {
        let err = Timeslot::default()
            .mark_available("S1", &Participant::student("  "))
            .unwrap_err();
        assert_eq!(err, SlotError::BlankField("participant_id"));
    }

    #[test]
    fn unmark_removes_availability() {
        let mut events = all_available("S1");
        events.push(BookingEvent::unmarked_available(
            "S1",
            &Participant::aircraft("B"),
        ));
        let slot = slot_with(events);

        assert!(!slot.is_available(&Participant::aircraft("B")));
        assert!(!slot.is_bookable("A", "B", "C"));
    }

    #[test]
    fn availability_is_per_role() {
        let slot = slot_with(vec![
            BookingEvent::marked_available("S1", &Participant::student("A")),
            BookingEvent::marked_available("S1", &Participant::student("B")),
            BookingEvent::marked_available("S1", &Participant::student("C")),
        ]);
        assert!(!slot.is_bookable("A", "B", "C"));
    }

    #[test]
    fn book_emits_three_events_in_role_order() {
        let slot = slot_with(all_available("S1"));
        let events = slot.book("S1", &reservation("BK1")).unwrap();

        assert_eq!(
            events,
            vec![
                BookingEvent::booked("S1", &Participant::student("A"), "BK1"),
                BookingEvent::booked("S1", &Participant::aircraft("B"), "BK1"),
                BookingEvent::booked("S1", &Participant::instructor("C"), "BK1"),
            ]
        );
    }

    #[test]
    fn booking_consumes_availability() {
        let slot = slot_with(all_available("S1"));
        let events = slot.book("S1", &reservation("BK1")).unwrap();
        let mut all = all_available("S1");
        all.extend(events);
        let slot = slot_with(all);

        assert_eq!(slot.available_count(), 0);
        assert_eq!(slot.booking_count(), 3);
        assert!(slot.bookings().all(|b| b.booking_id == "BK1"));
        assert_eq!(
            slot.book("S1", &reservation("BK2")).unwrap_err(),
            SlotError::NotBookable
        );
    }

    #[test]
    fn booked_participant_cannot_be_booked_again_in_same_role() {
        let mut events = all_available("S1");
        events.extend(vec![
            BookingEvent::booked("S1", &Participant::student("A"), "BK1"),
            BookingEvent::booked("S1", &Participant::aircraft("B"), "BK1"),
            BookingEvent::booked("S1", &Participant::instructor("C"), "BK1"),
        ]);
        // Re-declared availability does not release the active booking.
        events.extend(all_available("S1"));
        let slot = slot_with(events);

        assert_eq!(slot.available_count(), 3);
        assert!(!slot.is_bookable("A", "B", "C"));
    }

    #[test]
    fn duplicate_booking_id_is_rejected() {
        let mut events = all_available("S1");
        events.extend(slot_with(all_available("S1")).book("S1", &reservation("BK1")).unwrap());
        events.extend(vec![
            BookingEvent::marked_available("S1", &Participant::student("D")),
            BookingEvent::marked_available("S1", &Participant::aircraft("E")),
            BookingEvent::marked_available("S1", &Participant::instructor("F")),
        ]);
        let slot = slot_with(events);

        let err = slot
            .book("S1", &BookReservation::new("D", "E", "F", "BK1"))
            .unwrap_err();
        assert_eq!(
            err,
            SlotError::DuplicateBooking {
                booking_id: "BK1".into()
            }
        );
    }

    #[test]
    fn book_rejects_blank_fields() {
        let slot = slot_with(all_available("S1"));
        let err = slot
            .book("S1", &BookReservation::new("A", "", "C", "BK1"))
            .unwrap_err();
        assert_eq!(err, SlotError::BlankField("aircraft_id"));
    }

    #[test]
    fn cancel_emits_three_events_and_clears_bookings() {
        let mut events = all_available("S1");
        events.extend(slot_with(all_available("S1")).book("S1", &reservation("BK1")).unwrap());
        let slot = slot_with(events.clone());

        let cancel = slot.cancel("S1", "BK1").unwrap();
        assert_eq!(
            cancel,
            vec![
                BookingEvent::canceled("S1", &Participant::student("A"), "BK1"),
                BookingEvent::canceled("S1", &Participant::aircraft("B"), "BK1"),
                BookingEvent::canceled("S1", &Participant::instructor("C"), "BK1"),
            ]
        );

        events.extend(cancel);
        let slot = slot_with(events);
        assert_eq!(slot.booking_count(), 0);
        assert_eq!(slot.available_count(), 0);
        assert!(!slot.is_bookable("A", "B", "C"));
    }

    #[test]
    fn cancel_unknown_booking_is_not_found() {
        let slot = slot_with(all_available("S1"));
        assert_eq!(
            slot.cancel("S1", "NOPE").unwrap_err(),
            SlotError::BookingNotFound {
                booking_id: "NOPE".into()
            }
        );
    }

    #[test]
    fn cancel_partial_booking_is_invalid_state() {
        let slot = slot_with(vec![
            BookingEvent::booked("S1", &Participant::student("A"), "BK1"),
            BookingEvent::booked("S1", &Participant::aircraft("B"), "BK1"),
        ]);
        assert_eq!(
            slot.cancel("S1", "BK1").unwrap_err(),
            SlotError::IncompleteBooking {
                booking_id: "BK1".into(),
                found: 2
            }
        );
    }

    #[test]
    fn replay_is_deterministic() {
        let mut events = all_available("S1");
        events.extend(slot_with(all_available("S1")).book("S1", &reservation("BK1")).unwrap());
        events.push(BookingEvent::marked_available("S1", &Participant::student("Z")));

        assert_eq!(slot_with(events.clone()), slot_with(events));
    }

    #[test]
    fn handle_dispatches_every_command() {
        let slot = slot_with(all_available("S1"));

        let events = slot
            .handle("S1", &SlotCommand::MarkAvailable(Participant::student("X")))
            .unwrap();
        assert_eq!(events.len(), 1);

        let events = slot
            .handle("S1", &SlotCommand::BookReservation(reservation("BK1")))
            .unwrap();
        assert_eq!(events.len(), 3);

        let err = slot
            .handle(
                "S1",
                &SlotCommand::CancelBooking {
                    booking_id: "BK1".into(),
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn state_serializes_for_snapshots() {
        let slot = slot_with(all_available("S1"));
        let json = serde_json::to_value(&slot).unwrap();
        let back: Timeslot = serde_json::from_value(json).unwrap();
        assert_eq!(back, slot);
    }
}
