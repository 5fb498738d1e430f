//! Booking coordination for flight slots.
//!
//! A booking touches two aggregate kinds: the slot itself, which decides
//! whether the reservation is allowed, and one participant-slot per
//! participant, which tracks each participant's own status. The
//! [`BookingCoordinator`] drives both:
//!
//! 1. Validate the request
//! 2. Ask the [`ConditionsService`] whether the slot is flyable
//! 3. Book the slot
//! 4. Move each participant-slot to `BOOKED`
//!
//! The slot is the source of truth. Participant-slot updates are
//! best-effort and a failure there never undoes a slot booking.

pub mod conditions;
pub mod coordinator;
pub mod error;

pub use conditions::{
    ConditionsError, ConditionsReport, ConditionsService, FlightMinima, Forecast,
    ForecastConditionsService, InMemoryConditionsService,
};
pub use coordinator::{BookingCoordinator, DEFAULT_CONDITIONS_TIMEOUT};
pub use error::{Result, SchedulingError};
