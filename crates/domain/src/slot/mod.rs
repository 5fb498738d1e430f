//! Booking slot aggregate and related types.

mod aggregate;
mod commands;
mod service;

pub use aggregate::Timeslot;
pub use commands::{BookReservation, SlotCommand};
pub use service::SlotService;
