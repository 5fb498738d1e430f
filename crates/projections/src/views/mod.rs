//! Read model views for the query side.

pub mod participant_slots;

pub use participant_slots::{ParticipantSlotEntry, ParticipantSlotsView};
