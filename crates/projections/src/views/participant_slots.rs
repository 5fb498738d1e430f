//! Participant slots read model: which slots a participant is available for
//! or booked in.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use domain::{Aggregate, BookingEvent, ParticipantSlot, ParticipantStatus, ParticipantType};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition};
use crate::read_model::ReadModel;

/// One participant's standing in one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSlotEntry {
    pub slot_id: String,
    pub participant_id: String,
    pub participant_type: ParticipantType,
    pub status: ParticipantStatus,
    pub booking_id: Option<String>,
}

/// Entries keyed by participant id, then by (slot id, role) so that reads
/// come out sorted by slot.
type Entries = HashMap<String, BTreeMap<(String, ParticipantType), ParticipantSlotEntry>>;

struct ParticipantSlotsState {
    entries: Entries,
    position: ProjectionPosition,
}

/// Read model over participant-slot events.
///
/// Events from other aggregate types only advance the position.
#[derive(Clone)]
pub struct ParticipantSlotsView {
    state: Arc<RwLock<ParticipantSlotsState>>,
}

impl ParticipantSlotsView {
    /// Creates a new empty view.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ParticipantSlotsState {
                entries: HashMap::new(),
                position: ProjectionPosition::zero(),
            })),
        }
    }

    /// Slots in which the participant currently has `status`, sorted by slot id.
    ///
    /// A participant id used in several roles reports every matching role.
    pub async fn slots_by_status(
        &self,
        participant_id: &str,
        status: ParticipantStatus,
    ) -> Vec<ParticipantSlotEntry> {
        self.state
            .read()
            .await
            .entries
            .get(participant_id)
            .map(|slots| {
                slots
                    .values()
                    .filter(|entry| entry.status == status)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All entries for one participant, sorted by slot id.
    pub async fn slots_for(&self, participant_id: &str) -> Vec<ParticipantSlotEntry> {
        self.state
            .read()
            .await
            .entries
            .get(participant_id)
            .map(|slots| slots.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for ParticipantSlotsView {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Projection for ParticipantSlotsView {
    fn name(&self) -> &'static str {
        "ParticipantSlotsView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if event.aggregate_type != ParticipantSlot::aggregate_type() {
            let mut state = self.state.write().await;
            state.position = state.position.advance();
            return Ok(());
        }

        let booking_event: BookingEvent = serde_json::from_value(event.payload.clone())?;
        let participant = booking_event.participant();
        let slot_id = booking_event.slot_id().to_string();

        let (status, booking_id) = match &booking_event {
            BookingEvent::ParticipantMarkedAvailable(_) => (ParticipantStatus::Available, None),
            BookingEvent::ParticipantUnmarkedAvailable(_) => {
                (ParticipantStatus::Unavailable, None)
            }
            BookingEvent::ParticipantBooked(data) => {
                (ParticipantStatus::Booked, Some(data.booking_id.clone()))
            }
            BookingEvent::ParticipantCanceled(_) => (ParticipantStatus::Available, None),
        };

        let mut state = self.state.write().await;
        state
            .entries
            .entry(participant.id.clone())
            .or_default()
            .insert(
                (slot_id.clone(), participant.participant_type),
                ParticipantSlotEntry {
                    slot_id,
                    participant_id: participant.id,
                    participant_type: participant.participant_type,
                    status,
                    booking_id,
                },
            );
        state.position = state.position.advance();

        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        self.state.read().await.position
    }

    async fn reset(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.position = ProjectionPosition::zero();
        Ok(())
    }
}

impl ReadModel for ParticipantSlotsView {
    fn name(&self) -> &'static str {
        "ParticipantSlotsView"
    }

    fn count(&self) -> usize {
        self.state
            .try_read()
            .map(|s| s.entries.values().map(BTreeMap::len).sum())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{DomainEvent, Participant, Timeslot};
    use event_store::Version;

    fn envelope(aggregate_type: &str, version: i64, event: &BookingEvent) -> EventEnvelope {
        let participant = event.participant();
        EventEnvelope::builder()
            .aggregate_id(format!(
                "{}/{}/{}",
                event.slot_id(),
                participant.participant_type.as_key(),
                participant.id
            ))
            .aggregate_type(aggregate_type)
            .event_type(event.event_type())
            .version(Version::new(version))
            .payload(event)
            .unwrap()
            .build()
            .unwrap()
    }

    fn participant_slot_event(version: i64, event: BookingEvent) -> EventEnvelope {
        envelope(ParticipantSlot::aggregate_type(), version, &event)
    }

    #[tokio::test]
    async fn booked_slots_are_listed_sorted_by_slot() {
        let view = ParticipantSlotsView::new();
        let student = Participant::student("A");

        for slot in ["S3", "S1", "S2"] {
            view.handle(&participant_slot_event(
                1,
                BookingEvent::marked_available(slot, &student),
            ))
            .await
            .unwrap();
        }
        view.handle(&participant_slot_event(
            2,
            BookingEvent::booked("S3", &student, "BK3"),
        ))
        .await
        .unwrap();
        view.handle(&participant_slot_event(
            2,
            BookingEvent::booked("S1", &student, "BK1"),
        ))
        .await
        .unwrap();

        let booked = view.slots_by_status("A", ParticipantStatus::Booked).await;
        let slots: Vec<_> = booked.iter().map(|e| e.slot_id.as_str()).collect();
        assert_eq!(slots, vec!["S1", "S3"]);
        assert_eq!(booked[0].booking_id.as_deref(), Some("BK1"));

        let available = view.slots_by_status("A", ParticipantStatus::Available).await;
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].slot_id, "S2");
    }

    #[tokio::test]
    async fn cancel_returns_entry_to_available() {
        let view = ParticipantSlotsView::new();
        let aircraft = Participant::aircraft("B");

        view.handle(&participant_slot_event(
            1,
            BookingEvent::marked_available("S1", &aircraft),
        ))
        .await
        .unwrap();
        view.handle(&participant_slot_event(
            2,
            BookingEvent::booked("S1", &aircraft, "BK1"),
        ))
        .await
        .unwrap();
        view.handle(&participant_slot_event(
            3,
            BookingEvent::canceled("S1", &aircraft, "BK1"),
        ))
        .await
        .unwrap();

        assert!(view.slots_by_status("B", ParticipantStatus::Booked).await.is_empty());
        let available = view.slots_by_status("B", ParticipantStatus::Available).await;
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].booking_id, None);
    }

    #[tokio::test]
    async fn slot_aggregate_events_only_advance_position() {
        let view = ParticipantSlotsView::new();

        view.handle(&envelope(
            Timeslot::aggregate_type(),
            1,
            &BookingEvent::marked_available("S1", &Participant::student("A")),
        ))
        .await
        .unwrap();

        assert_eq!(view.position().await.events_processed, 1);
        assert!(view.slots_for("A").await.is_empty());
        assert_eq!(ReadModel::count(&view), 0);
    }

    #[tokio::test]
    async fn reset_clears_entries() {
        let view = ParticipantSlotsView::new();
        view.handle(&participant_slot_event(
            1,
            BookingEvent::marked_available("S1", &Participant::student("A")),
        ))
        .await
        .unwrap();
        assert_eq!(ReadModel::count(&view), 1);

        view.reset().await.unwrap();
        assert_eq!(ReadModel::count(&view), 0);
        assert_eq!(view.position().await, ProjectionPosition::zero());
    }

    #[test]
    fn entry_serializes_camel_case() {
        let entry = ParticipantSlotEntry {
            slot_id: "S1".into(),
            participant_id: "A".into(),
            participant_type: ParticipantType::Student,
            status: ParticipantStatus::Booked,
            booking_id: Some("BK1".into()),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "slotId": "S1",
                "participantId": "A",
                "participantType": "STUDENT",
                "status": "BOOKED",
                "bookingId": "BK1"
            })
        );
    }
}
