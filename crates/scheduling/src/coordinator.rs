//! Booking coordinator keeping slots and participant-slots in step.

use std::time::{Duration, Instant};

use domain::{
    BookReservation, CommandResult, DomainError, KeyedLocks, Participant, ParticipantSlot,
    ParticipantSlotService, SlotService, Timeslot, validate_slot_id,
};
use event_store::{EventEnvelope, EventStore};

use crate::conditions::{ConditionsError, ConditionsService};
use crate::error::{Result, SchedulingError};

/// How long a booking waits for a conditions verdict by default.
pub const DEFAULT_CONDITIONS_TIMEOUT: Duration = Duration::from_secs(5);

/// Drives booking commands across both aggregate kinds.
///
/// Every command goes to the slot first. Only once the slot has accepted
/// it are the affected participant-slots updated. Those updates are
/// best-effort: a failure is logged and counted, never propagated.
///
/// Commands for one slot hold that slot's lock from the slot command until
/// the last participant-slot update, so participant-slots see a slot's
/// bookings and cancellations in the order the slot recorded them.
pub struct BookingCoordinator<S, C>
where
    S: EventStore,
    C: ConditionsService,
{
    slots: SlotService<S>,
    participant_slots: ParticipantSlotService<S>,
    conditions: C,
    conditions_timeout: Duration,
    slot_locks: KeyedLocks<String>,
}

impl<S, C> BookingCoordinator<S, C>
where
    S: EventStore + Clone,
    C: ConditionsService,
{
    /// Creates a coordinator whose services share `store`.
    pub fn new(store: S, conditions: C) -> Self {
        Self {
            slots: SlotService::new(store.clone()),
            participant_slots: ParticipantSlotService::new(store),
            conditions,
            conditions_timeout: DEFAULT_CONDITIONS_TIMEOUT,
            slot_locks: KeyedLocks::new(),
        }
    }

    /// Sets how long to wait for a conditions verdict.
    pub fn with_conditions_timeout(mut self, timeout: Duration) -> Self {
        self.conditions_timeout = timeout;
        self
    }
}

impl<S, C> BookingCoordinator<S, C>
where
    S: EventStore,
    C: ConditionsService,
{
    pub fn slots(&self) -> &SlotService<S> {
        &self.slots
    }

    pub fn participant_slots(&self) -> &ParticipantSlotService<S> {
        &self.participant_slots
    }

    pub fn conditions(&self) -> &C {
        &self.conditions
    }

    /// Declares a participant available for the slot.
    #[tracing::instrument(skip(self))]
    pub async fn mark_available(
        &self,
        slot_id: &str,
        participant: Participant,
    ) -> Result<CommandResult<Timeslot>> {
        let slot_id = slot_id.trim();
        let _slot = self.slot_locks.lock(&slot_id.to_string()).await;
        let result = self
            .slots
            .mark_available(slot_id, participant.clone())
            .await?;

        let synced = self
            .participant_slots
            .mark_available(slot_id, &participant)
            .await;
        self.record_sync(slot_id, &participant, "mark_available", synced);

        Ok(result)
    }

    /// Withdraws a participant's availability for the slot.
    #[tracing::instrument(skip(self))]
    pub async fn unmark_available(
        &self,
        slot_id: &str,
        participant: Participant,
    ) -> Result<CommandResult<Timeslot>> {
        let slot_id = slot_id.trim();
        let _slot = self.slot_locks.lock(&slot_id.to_string()).await;
        let result = self
            .slots
            .unmark_available(slot_id, participant.clone())
            .await?;

        let synced = self
            .participant_slots
            .unmark_available(slot_id, &participant)
            .await;
        self.record_sync(slot_id, &participant, "unmark_available", synced);

        Ok(result)
    }

    /// Books a reservation once conditions allow it.
    ///
    /// The request is validated before the conditions service is asked, so
    /// malformed requests never cost a lookup. The slot lock is taken only
    /// after the verdict, so a slow check does not hold up the slot.
    #[tracing::instrument(skip(self))]
    pub async fn book(
        &self,
        slot_id: &str,
        reservation: BookReservation,
    ) -> Result<CommandResult<Timeslot>> {
        let slot_id = validate_slot_id(slot_id).map_err(DomainError::from)?;
        let reservation = reservation.normalized().map_err(DomainError::from)?;

        if let Err(err) = self.check_conditions(slot_id).await {
            metrics::counter!("bookings_rejected_total").increment(1);
            return Err(err);
        }

        let _slot = self.slot_locks.lock(&slot_id.to_string()).await;
        let result = match self.slots.book_slot(slot_id, reservation.clone()).await {
            Ok(result) => result,
            Err(err) => {
                metrics::counter!("bookings_rejected_total").increment(1);
                tracing::info!(error = %err, "booking rejected by slot");
                return Err(err.into());
            }
        };
        metrics::counter!("bookings_created_total").increment(1);

        for participant in reservation.participants() {
            let synced = self
                .participant_slots
                .book(slot_id, &participant, &reservation.booking_id)
                .await;
            self.record_sync(slot_id, &participant, "book", synced);
        }

        Ok(result)
    }

    /// Cancels a booking and frees its participants.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, slot_id: &str, booking_id: &str) -> Result<CommandResult<Timeslot>> {
        let slot_id = slot_id.trim();
        let _slot = self.slot_locks.lock(&slot_id.to_string()).await;
        let result = self.slots.cancel_booking(slot_id, booking_id).await?;
        metrics::counter!("bookings_canceled_total").increment(1);

        for event in &result.events {
            let Some(booking_id) = event.booking_id() else {
                continue;
            };
            let participant = event.participant();
            let synced = self
                .participant_slots
                .cancel(slot_id, &participant, booking_id)
                .await;
            self.record_sync(slot_id, &participant, "cancel", synced);
        }

        Ok(result)
    }

    /// Returns the folded state of the slot.
    pub async fn get_slot(&self, slot_id: &str) -> Result<Timeslot> {
        Ok(self.slots.get_slot(slot_id).await?)
    }

    /// Returns the raw event stream of the slot.
    pub async fn slot_events(&self, slot_id: &str) -> Result<Vec<EventEnvelope>> {
        Ok(self.slots.events(slot_id).await?)
    }

    /// Asks the conditions service for a verdict, bounded by the timeout.
    async fn check_conditions(&self, slot_id: &str) -> Result<()> {
        let started = Instant::now();
        let outcome =
            tokio::time::timeout(self.conditions_timeout, self.conditions.evaluate(slot_id)).await;
        metrics::histogram!("conditions_check_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        let report = match outcome {
            Ok(Ok(report)) => report,
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "conditions check failed");
                return Err(err.into());
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.conditions_timeout.as_millis() as u64,
                    "conditions check timed out"
                );
                return Err(ConditionsError::Timeout.into());
            }
        };

        if !report.meets_requirements {
            tracing::info!(summary = %report.summary, "conditions do not permit booking");
            return Err(SchedulingError::ConditionsNotMet {
                slot_id: report.slot_id,
                summary: report.summary,
            });
        }

        Ok(())
    }

    fn record_sync(
        &self,
        slot_id: &str,
        participant: &Participant,
        command: &'static str,
        outcome: std::result::Result<CommandResult<ParticipantSlot>, DomainError>,
    ) {
        match outcome {
            Ok(result) if result.is_noop() => {
                tracing::debug!(
                    slot_id,
                    participant_id = %participant.id,
                    command,
                    "participant slot unchanged"
                );
            }
            Ok(_) => {}
            Err(err) => {
                metrics::counter!("participant_sync_failures_total").increment(1);
                tracing::warn!(
                    slot_id,
                    participant_id = %participant.id,
                    participant_type = participant.participant_type.as_str(),
                    command,
                    error = %err,
                    "participant slot update failed"
                );
            }
        }
    }
}
