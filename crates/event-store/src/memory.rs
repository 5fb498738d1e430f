use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventQuery, EventStoreError, Result, Snapshot, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

/// In-memory event store.
///
/// Events are kept in a single append-ordered log. Appends take the write
/// lock for the whole batch, so readers never observe part of a batch.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<EventEnvelope>>>,
    snapshots: Arc<RwLock<HashMap<AggregateId, Snapshot>>>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Clears all events and snapshots.
    pub async fn clear(&self) {
        self.events.write().await.clear();
        self.snapshots.write().await.clear();
    }

    fn current_version(log: &[EventEnvelope], aggregate_id: &AggregateId) -> Option<Version> {
        log.iter()
            .filter(|e| &e.aggregate_id == aggregate_id)
            .map(|e| e.version)
            .max()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)?;

        let aggregate_id = events[0].aggregate_id.clone();
        let first_new_version = events[0].version;

        let mut log = self.events.write().await;

        let current_version =
            Self::current_version(&log, &aggregate_id).unwrap_or(Version::initial());

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected,
                actual: current_version,
            });
        }

        // The batch must continue the stream exactly where it ends.
        if first_new_version != current_version.next() {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: options.expected_version.unwrap_or(current_version),
                actual: current_version,
            });
        }

        let last_version = events
            .last()
            .map(|e| e.version)
            .unwrap_or(current_version);
        log.extend(events);

        tracing::trace!(
            aggregate_id = %aggregate_id,
            version = %last_version,
            "events appended"
        );

        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: &AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let log = self.events.read().await;
        let mut events: Vec<_> = log
            .iter()
            .filter(|e| &e.aggregate_id == aggregate_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn get_events_for_aggregate_from_version(
        &self,
        aggregate_id: &AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let log = self.events.read().await;
        let mut events: Vec<_> = log
            .iter()
            .filter(|e| &e.aggregate_id == aggregate_id && e.version >= from_version)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.version);
        Ok(events)
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<EventEnvelope>> {
        let log = self.events.read().await;
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        let events = log
            .iter()
            .filter(|e| query.matches(e))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(events)
    }

    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        let log = self.events.read().await;
        Ok(log
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let events = self.events.read().await.clone();
        let stream = stream::iter(events.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }

    async fn get_aggregate_version(&self, aggregate_id: &AggregateId) -> Result<Option<Version>> {
        let log = self.events.read().await;
        Ok(Self::current_version(&log, aggregate_id))
    }

    async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(snapshot.aggregate_id.clone(), snapshot);
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_id: &AggregateId) -> Result<Option<Snapshot>> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(aggregate_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_event(aggregate_id: &str, version: Version, event_type: &str) -> EventEnvelope {
        EventEnvelope::builder()
            .aggregate_id(aggregate_id)
            .aggregate_type("BookingSlot")
            .event_type(event_type)
            .version(version)
            .payload_raw(serde_json::json!({"test": true}))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn append_single_event() {
        let store = InMemoryEventStore::new();
        let event = create_test_event("S1", Version::first(), "ParticipantMarkedAvailable");

        let result = store.append(vec![event], AppendOptions::expect_new()).await;
        assert_eq!(result.unwrap(), Version::first());

        let events = store
            .get_events_for_aggregate(&AggregateId::new("S1"))
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn append_batch_is_stored_together() {
        let store = InMemoryEventStore::new();

        let events = vec![
            create_test_event("S1", Version::new(1), "ParticipantBooked"),
            create_test_event("S1", Version::new(2), "ParticipantBooked"),
            create_test_event("S1", Version::new(3), "ParticipantBooked"),
        ];

        let result = store.append(events, AppendOptions::expect_new()).await;
        assert_eq!(result.unwrap(), Version::new(3));

        let stored = store
            .get_events_for_aggregate(&AggregateId::new("S1"))
            .await
            .unwrap();
        assert_eq!(stored.len(), 3);
    }

    #[tokio::test]
    async fn rejected_batch_leaves_log_untouched() {
        let store = InMemoryEventStore::new();
        store
            .append(
                vec![create_test_event("S1", Version::first(), "Event1")],
                AppendOptions::expect_new(),
            )
            .await
            .unwrap();

        // Stale writer: thinks the stream is empty.
        let batch = vec![
            create_test_event("S1", Version::new(1), "ParticipantBooked"),
            create_test_event("S1", Version::new(2), "ParticipantBooked"),
            create_test_event("S1", Version::new(3), "ParticipantBooked"),
        ];
        let result = store.append(batch, AppendOptions::expect_new()).await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn concurrency_conflict_on_wrong_version() {
        let store = InMemoryEventStore::new();

        let event1 = create_test_event("S1", Version::first(), "Event1");
        store
            .append(vec![event1], AppendOptions::expect_new())
            .await
            .unwrap();

        let event2 = create_test_event("S1", Version::new(2), "Event2");
        let result = store
            .append(
                vec![event2],
                AppendOptions::expect_version(Version::initial()),
            )
            .await;

        assert!(matches!(
            result,
            Err(EventStoreError::ConcurrencyConflict { .. })
        ));
    }

    #[tokio::test]
    async fn append_with_correct_expected_version() {
        let store = InMemoryEventStore::new();

        let event1 = create_test_event("S1", Version::first(), "Event1");
        store
            .append(vec![event1], AppendOptions::expect_new())
            .await
            .unwrap();

        let event2 = create_test_event("S1", Version::new(2), "Event2");
        let result = store
            .append(
                vec![event2],
                AppendOptions::expect_version(Version::first()),
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn version_gap_without_expected_version_is_rejected() {
        let store = InMemoryEventStore::new();
        let event = create_test_event("S1", Version::new(2), "Event2");

        let result = store.append(vec![event], AppendOptions::new()).await;
        assert!(result.is_err());
        assert_eq!(store.event_count().await, 0);
    }

    #[tokio::test]
    async fn get_events_from_version() {
        let store = InMemoryEventStore::new();

        let events = vec![
            create_test_event("S1", Version::new(1), "Event1"),
            create_test_event("S1", Version::new(2), "Event2"),
            create_test_event("S1", Version::new(3), "Event3"),
        ];
        store.append(events, AppendOptions::new()).await.unwrap();

        let from_v2 = store
            .get_events_for_aggregate_from_version(&AggregateId::new("S1"), Version::new(2))
            .await
            .unwrap();
        assert_eq!(from_v2.len(), 2);
        assert_eq!(from_v2[0].version, Version::new(2));
        assert_eq!(from_v2[1].version, Version::new(3));
    }

    #[tokio::test]
    async fn get_events_by_type() {
        let store = InMemoryEventStore::new();

        store
            .append(
                vec![create_test_event("S1", Version::first(), "ParticipantBooked")],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .append(
                vec![create_test_event("S2", Version::first(), "ParticipantCanceled")],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .append(
                vec![create_test_event("S1", Version::new(2), "ParticipantBooked")],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let booked = store.get_events_by_type("ParticipantBooked").await.unwrap();
        assert_eq!(booked.len(), 2);

        let canceled = store
            .get_events_by_type("ParticipantCanceled")
            .await
            .unwrap();
        assert_eq!(canceled.len(), 1);
    }

    #[tokio::test]
    async fn snapshot_save_and_retrieve() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new("S1");

        let snapshot = Snapshot::new(
            aggregate_id.clone(),
            "BookingSlot",
            Version::new(5),
            serde_json::json!({"state": "saved"}),
        );

        store.save_snapshot(snapshot).await.unwrap();

        let retrieved = store.get_snapshot(&aggregate_id).await.unwrap().unwrap();
        assert_eq!(retrieved.aggregate_id, aggregate_id);
        assert_eq!(retrieved.version, Version::new(5));
    }

    #[tokio::test]
    async fn snapshot_not_found() {
        let store = InMemoryEventStore::new();

        let result = store.get_snapshot(&AggregateId::new("S1")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn query_events_with_filters() {
        let store = InMemoryEventStore::new();

        let events = vec![
            create_test_event("S1", Version::new(1), "Event1"),
            create_test_event("S1", Version::new(2), "Event2"),
            create_test_event("S1", Version::new(3), "Event3"),
        ];
        store.append(events, AppendOptions::new()).await.unwrap();

        let query = EventQuery::new()
            .aggregate_id(AggregateId::new("S1"))
            .from_version(Version::new(2))
            .to_version(Version::new(2));

        let results = store.query_events(query).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].version, Version::new(2));
    }

    #[tokio::test]
    async fn stream_all_events_in_append_order() {
        use futures_util::StreamExt;

        let store = InMemoryEventStore::new();

        store
            .append(
                vec![create_test_event("S1", Version::first(), "Event1")],
                AppendOptions::new(),
            )
            .await
            .unwrap();
        store
            .append(
                vec![create_test_event("S2", Version::first(), "Event2")],
                AppendOptions::new(),
            )
            .await
            .unwrap();

        let stream = store.stream_all_events().await.unwrap();
        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_ref().unwrap().event_type, "Event1");
        assert_eq!(events[1].as_ref().unwrap().event_type, "Event2");
    }

    #[tokio::test]
    async fn get_aggregate_version() {
        let store = InMemoryEventStore::new();
        let aggregate_id = AggregateId::new("S1");

        let version = store.get_aggregate_version(&aggregate_id).await.unwrap();
        assert!(version.is_none());

        let events = vec![
            create_test_event("S1", Version::new(1), "Event1"),
            create_test_event("S1", Version::new(2), "Event2"),
        ];
        store.append(events, AppendOptions::new()).await.unwrap();

        let version = store.get_aggregate_version(&aggregate_id).await.unwrap();
        assert_eq!(version, Some(Version::new(2)));
    }
}
