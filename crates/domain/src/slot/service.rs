//! Slot service providing the command surface for booking slots.

use common::AggregateId;
use event_store::{EventEnvelope, EventStore};

use crate::booking::{Participant, require_identifier};
use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{BookReservation, SlotCommand, Timeslot};

/// Service for managing booking slots.
///
/// A slot springs into existence with its first event; there is no separate
/// create step.
pub struct SlotService<S: EventStore> {
    handler: CommandHandler<S, Timeslot>,
}

impl<S: EventStore + Clone> Clone for SlotService<S> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

impl<S: EventStore> SlotService<S> {
    /// Creates a new slot service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Timeslot> {
        &self.handler
    }

    /// Declares a participant available for the slot.
    #[tracing::instrument(skip(self))]
    pub async fn mark_available(
        &self,
        slot_id: &str,
        participant: Participant,
    ) -> Result<CommandResult<Timeslot>, DomainError> {
        self.dispatch(slot_id, SlotCommand::MarkAvailable(participant))
            .await
    }

    /// Withdraws a participant's availability for the slot.
    #[tracing::instrument(skip(self))]
    pub async fn unmark_available(
        &self,
        slot_id: &str,
        participant: Participant,
    ) -> Result<CommandResult<Timeslot>, DomainError> {
        self.dispatch(slot_id, SlotCommand::UnmarkAvailable(participant))
            .await
    }

    /// Books a student, aircraft and instructor together.
    #[tracing::instrument(skip(self))]
    pub async fn book_slot(
        &self,
        slot_id: &str,
        reservation: BookReservation,
    ) -> Result<CommandResult<Timeslot>, DomainError> {
        let booking_id = reservation.booking_id.clone();
        let result = self
            .dispatch(slot_id, SlotCommand::BookReservation(reservation))
            .await?;
        tracing::info!(slot_id, booking_id = %booking_id, "slot booked");
        Ok(result)
    }

    /// Cancels all participants of a booking.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_booking(
        &self,
        slot_id: &str,
        booking_id: &str,
    ) -> Result<CommandResult<Timeslot>, DomainError> {
        let result = self
            .dispatch(
                slot_id,
                SlotCommand::CancelBooking {
                    booking_id: booking_id.to_string(),
                },
            )
            .await?;
        tracing::info!(slot_id, booking_id, "booking canceled");
        Ok(result)
    }

    /// Runs any slot command against the slot's current state.
    pub async fn dispatch(
        &self,
        slot_id: &str,
        command: SlotCommand,
    ) -> Result<CommandResult<Timeslot>, DomainError> {
        let slot_id = require_identifier("slot_id", slot_id)?;
        let aggregate_id = AggregateId::new(slot_id);

        self.handler
            .execute_with_snapshot(&aggregate_id, |slot| slot.handle(slot_id, &command))
            .await
    }

    /// Returns the folded state of the slot. Unknown slots are empty.
    #[tracing::instrument(skip(self))]
    pub async fn get_slot(&self, slot_id: &str) -> Result<Timeslot, DomainError> {
        let slot_id = require_identifier("slot_id", slot_id)?;
        self.handler.load(&AggregateId::new(slot_id)).await
    }

    /// Returns the raw event stream of the slot, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn events(&self, slot_id: &str) -> Result<Vec<EventEnvelope>, DomainError> {
        let slot_id = require_identifier("slot_id", slot_id)?;
        Ok(self
            .handler
            .store()
            .get_events_for_aggregate(&AggregateId::new(slot_id))
            .await?)
    }
}
