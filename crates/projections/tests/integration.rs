//! Integration tests: slot and participant-slot commands → ProjectionProcessor
//! → ParticipantSlotsView.

use domain::{BookReservation, Participant, ParticipantSlotService, ParticipantStatus, SlotService};
use event_store::InMemoryEventStore;
use projections::{ParticipantSlotsView, ProjectionProcessor, ReadModel};

fn setup() -> (
    SlotService<InMemoryEventStore>,
    ParticipantSlotService<InMemoryEventStore>,
    ProjectionProcessor<InMemoryEventStore>,
    ParticipantSlotsView,
) {
    let store = InMemoryEventStore::new();
    let slots = SlotService::new(store.clone());
    let participants = ParticipantSlotService::new(store.clone());

    let view = ParticipantSlotsView::new();
    let mut processor = ProjectionProcessor::new(store);
    processor.register(Box::new(view.clone()));

    (slots, participants, processor, view)
}

fn trio() -> [Participant; 3] {
    [
        Participant::student("A"),
        Participant::aircraft("B"),
        Participant::instructor("C"),
    ]
}

#[tokio::test]
async fn booked_slot_shows_up_for_each_participant() {
    let (slots, participants, processor, view) = setup();

    for p in trio() {
        slots.mark_available("S1", p.clone()).await.unwrap();
        participants.mark_available("S1", &p).await.unwrap();
    }
    slots
        .book_slot("S1", BookReservation::new("A", "B", "C", "BK1"))
        .await
        .unwrap();
    for p in trio() {
        participants.book("S1", &p, "BK1").await.unwrap();
    }

    processor.run_catch_up().await.unwrap();

    for id in ["A", "B", "C"] {
        let booked = view.slots_by_status(id, ParticipantStatus::Booked).await;
        assert_eq!(booked.len(), 1, "participant {id}");
        assert_eq!(booked[0].slot_id, "S1");
        assert_eq!(booked[0].booking_id.as_deref(), Some("BK1"));
    }
    assert_eq!(view.count(), 3);
}

#[tokio::test]
async fn availability_across_slots_is_sorted() {
    let (_, participants, processor, view) = setup();
    let student = Participant::student("A");

    for slot in ["S3", "S1", "S2"] {
        participants.mark_available(slot, &student).await.unwrap();
    }
    participants.unmark_available("S2", &student).await.unwrap();

    processor.run_catch_up().await.unwrap();

    let available: Vec<_> = view
        .slots_by_status("A", ParticipantStatus::Available)
        .await
        .into_iter()
        .map(|e| e.slot_id)
        .collect();
    assert_eq!(available, vec!["S1", "S3"]);

    let unavailable = view
        .slots_by_status("A", ParticipantStatus::Unavailable)
        .await;
    assert_eq!(unavailable.len(), 1);
}

#[tokio::test]
async fn rebuild_gives_same_answers() {
    let (_, participants, processor, view) = setup();
    let aircraft = Participant::aircraft("B");

    participants.mark_available("S1", &aircraft).await.unwrap();
    participants.book("S1", &aircraft, "BK1").await.unwrap();
    processor.run_catch_up().await.unwrap();
    let before = view.slots_for("B").await;

    processor.rebuild_all().await.unwrap();

    assert_eq!(view.slots_for("B").await, before);
}

#[tokio::test]
async fn unknown_participant_has_no_slots() {
    let (_, _, processor, view) = setup();
    processor.run_catch_up().await.unwrap();

    assert!(
        view.slots_by_status("nobody", ParticipantStatus::Booked)
            .await
            .is_empty()
    );
}
