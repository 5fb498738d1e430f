//! Domain layer for flight-training scheduling.
//!
//! Two event-sourced aggregates share one event vocabulary:
//! - [`Timeslot`] is authoritative for a slot: who is available and which
//!   three-participant bookings are active.
//! - [`ParticipantSlot`] tracks one participant's status for one slot.
//!
//! Both are driven through [`CommandHandler`], which serialises commands per
//! aggregate id.

pub mod aggregate;
pub mod booking;
pub mod command;
pub mod error;
pub mod locks;
pub mod participant_slot;
pub mod slot;

pub use aggregate::{Aggregate, DomainEvent, SnapshotCapable};
pub use booking::{
    AvailabilityData, Booking, BookingData, BookingEvent, KEY_SEPARATOR, PARTICIPANTS_PER_BOOKING,
    Participant, ParticipantType, SlotError, validate_slot_id,
};
pub use command::{CommandHandler, CommandResult};
pub use error::{DomainError, ErrorKind};
pub use locks::{KeyedGuard, KeyedLocks};
pub use participant_slot::{
    ParticipantSlot, ParticipantSlotCommand, ParticipantSlotId, ParticipantSlotService,
    ParticipantStatus,
};
pub use slot::{BookReservation, SlotCommand, SlotService, Timeslot};
