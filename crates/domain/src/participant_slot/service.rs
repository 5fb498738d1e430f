//! Participant-slot service.

use event_store::EventStore;

use crate::booking::{Participant, SlotError, require_identifier};
use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{ParticipantSlot, ParticipantSlotCommand, ParticipantSlotId};

/// Service for managing participant-slot aggregates.
pub struct ParticipantSlotService<S: EventStore> {
    handler: CommandHandler<S, ParticipantSlot>,
}

impl<S: EventStore + Clone> Clone for ParticipantSlotService<S> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
        }
    }
}

impl<S: EventStore> ParticipantSlotService<S> {
    /// Creates a new participant-slot service with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, ParticipantSlot> {
        &self.handler
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_available(
        &self,
        slot_id: &str,
        participant: &Participant,
    ) -> Result<CommandResult<ParticipantSlot>, DomainError> {
        self.dispatch(slot_id, participant, ParticipantSlotCommand::MarkAvailable)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn unmark_available(
        &self,
        slot_id: &str,
        participant: &Participant,
    ) -> Result<CommandResult<ParticipantSlot>, DomainError> {
        self.dispatch(slot_id, participant, ParticipantSlotCommand::UnmarkAvailable)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn book(
        &self,
        slot_id: &str,
        participant: &Participant,
        booking_id: &str,
    ) -> Result<CommandResult<ParticipantSlot>, DomainError> {
        self.dispatch(
            slot_id,
            participant,
            ParticipantSlotCommand::Book {
                booking_id: booking_id.to_string(),
            },
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn cancel(
        &self,
        slot_id: &str,
        participant: &Participant,
        booking_id: &str,
    ) -> Result<CommandResult<ParticipantSlot>, DomainError> {
        self.dispatch(
            slot_id,
            participant,
            ParticipantSlotCommand::Cancel {
                booking_id: booking_id.to_string(),
            },
        )
        .await
    }

    /// Runs any participant-slot command.
    ///
    /// Ids are trimmed before the key is built, so `" A "` and `"A"` address
    /// the same aggregate.
    pub async fn dispatch(
        &self,
        slot_id: &str,
        participant: &Participant,
        command: ParticipantSlotCommand,
    ) -> Result<CommandResult<ParticipantSlot>, DomainError> {
        let id = Self::key(slot_id, participant)?;

        self.handler
            .execute(&id.aggregate_id(), |state| {
                state.handle(id.slot_id(), id.participant(), &command)
            })
            .await
    }

    /// Loads the participant's state for a slot. Unknown pairs are
    /// `Unavailable`.
    #[tracing::instrument(skip(self))]
    pub async fn get(
        &self,
        slot_id: &str,
        participant: &Participant,
    ) -> Result<ParticipantSlot, DomainError> {
        let id = Self::key(slot_id, participant)?;
        self.handler.load(&id.aggregate_id()).await
    }

    fn key(slot_id: &str, participant: &Participant) -> Result<ParticipantSlotId, SlotError> {
        let slot_id = require_identifier("slot_id", slot_id)?;
        let participant = Participant::try_new(&participant.id, participant.participant_type)?;
        Ok(ParticipantSlotId::new(slot_id, participant))
    }
}
