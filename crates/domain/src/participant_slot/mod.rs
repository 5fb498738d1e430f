//! Per-participant view of one slot, kept as its own aggregate.

mod aggregate;
mod commands;
mod service;
mod state;

pub use aggregate::{ParticipantSlot, ParticipantSlotId};
pub use commands::ParticipantSlotCommand;
pub use service::ParticipantSlotService;
pub use state::ParticipantStatus;
