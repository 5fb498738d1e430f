//! Read models and projections for the query side.
//!
//! - [`Projection`] trait for folding events into read models
//! - [`ReadModel`] trait for inspecting a view
//! - [`ProjectionProcessor`] for feeding events from the store to projections
//! - [`ParticipantSlotsView`]: which slots a participant is available for or
//!   booked in

pub mod error;
pub mod processor;
pub mod projection;
pub mod read_model;
pub mod views;

pub use error::{ProjectionError, Result};
pub use processor::ProjectionProcessor;
pub use projection::{Projection, ProjectionPosition};
pub use read_model::ReadModel;
pub use views::{ParticipantSlotEntry, ParticipantSlotsView};
