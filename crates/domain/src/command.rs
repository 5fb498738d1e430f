//! Command handling infrastructure.

use std::marker::PhantomData;

use common::AggregateId;
use event_store::{AppendOptions, EventEnvelope, EventStore, EventStoreExt, Snapshot, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::aggregate::{Aggregate, DomainEvent, SnapshotCapable};
use crate::error::DomainError;
use crate::locks::KeyedLocks;

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate after applying the new events.
    pub aggregate: A,

    /// The events that were generated and persisted.
    pub events: Vec<A::Event>,

    /// The new version of the aggregate after the command.
    pub new_version: Version,
}

impl<A: Aggregate> CommandResult<A> {
    /// Returns true if the command was accepted but recorded nothing.
    pub fn is_noop(&self) -> bool {
        self.events.is_empty()
    }
}

/// Handler for executing commands against aggregates.
///
/// Each aggregate id has its own async mutex. Load, decide, append and fold
/// for one id happen while holding that mutex, so commands against the same
/// aggregate run one at a time while different aggregates proceed in
/// parallel. Appends still carry the expected version, which catches
/// writers that bypass this handler.
///
/// Streams are only folded if every stored event and snapshot belongs to
/// `A`'s aggregate type.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    locks: KeyedLocks<AggregateId>,
    _phantom: PhantomData<A>,
}

impl<S, A> Clone for CommandHandler<S, A>
where
    S: EventStore + Clone,
    A: Aggregate,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            locks: self.locks.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate + DeserializeOwned,
    A::Event: DeserializeOwned + Serialize,
{
    /// Creates a new command handler with the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: KeyedLocks::new(),
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate from the event store.
    ///
    /// If the aggregate has no events yet, returns a default instance.
    pub async fn load(&self, aggregate_id: &AggregateId) -> Result<A, DomainError> {
        let (snapshot, events) = self.store.load_aggregate(aggregate_id).await?;

        let mut aggregate = if let Some(snapshot) = snapshot {
            Self::check_type(aggregate_id, &snapshot.aggregate_type)?;
            Self::restore_from_snapshot(snapshot)?
        } else {
            A::default()
        };

        // Apply events after snapshot
        for envelope in events {
            Self::check_type(aggregate_id, &envelope.aggregate_type)?;
            let event: A::Event = serde_json::from_value(envelope.payload)?;
            aggregate.apply(event);
            aggregate.set_version(envelope.version);
        }

        Ok(aggregate)
    }

    /// Loads an aggregate, returning None if it has no events.
    pub async fn load_existing(&self, aggregate_id: &AggregateId) -> Result<Option<A>, DomainError> {
        let aggregate = self.load(aggregate_id).await?;
        if aggregate.id().is_some() {
            Ok(Some(aggregate))
        } else {
            Ok(None)
        }
    }

    /// Executes a command and persists the resulting events.
    ///
    /// The command function receives the current aggregate state and returns
    /// either a list of events to apply, or an error. The events are
    /// appended as one batch.
    pub async fn execute<F>(
        &self,
        aggregate_id: &AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let _guard = self.locks.lock(aggregate_id).await;

        let mut aggregate = self.load(aggregate_id).await?;
        let current_version = aggregate.version();

        let events = command_fn(&aggregate)?;

        if events.is_empty() {
            return Ok(CommandResult {
                aggregate,
                events: vec![],
                new_version: current_version,
            });
        }

        let envelopes = Self::build_envelopes(aggregate_id, current_version, &events)?;

        // Persist events with optimistic concurrency
        let options = if current_version == Version::initial() {
            AppendOptions::expect_new()
        } else {
            AppendOptions::expect_version(current_version)
        };

        let new_version = self.store.append(envelopes, options).await?;

        for event in &events {
            aggregate.apply(event.clone());
        }
        aggregate.set_version(new_version);

        tracing::debug!(
            aggregate_type = A::aggregate_type(),
            aggregate_id = %aggregate_id,
            events = events.len(),
            version = %new_version,
            "command applied"
        );

        Ok(CommandResult {
            aggregate,
            events,
            new_version,
        })
    }

    /// Number of aggregate ids with a command in flight.
    pub fn locked_aggregates(&self) -> usize {
        self.locks.len()
    }

    fn check_type(aggregate_id: &AggregateId, found: &str) -> Result<(), DomainError> {
        if found == A::aggregate_type() {
            Ok(())
        } else {
            Err(DomainError::AggregateTypeMismatch {
                aggregate_id: aggregate_id.clone(),
                expected: A::aggregate_type(),
                found: found.to_string(),
            })
        }
    }

    /// Builds event envelopes from domain events.
    fn build_envelopes(
        aggregate_id: &AggregateId,
        current_version: Version,
        events: &[A::Event],
    ) -> Result<Vec<EventEnvelope>, DomainError> {
        let mut envelopes = Vec::with_capacity(events.len());
        let mut version = current_version;

        for event in events {
            version = version.next();
            let envelope = EventEnvelope::builder()
                .aggregate_id(aggregate_id.clone())
                .aggregate_type(A::aggregate_type())
                .event_type(event.event_type())
                .version(version)
                .payload(event)?
                .build()?;
            envelopes.push(envelope);
        }

        Ok(envelopes)
    }

    fn restore_from_snapshot(snapshot: Snapshot) -> Result<A, DomainError> {
        let version = snapshot.version;
        let mut aggregate: A = snapshot.into_state()?;
        aggregate.set_version(version);
        Ok(aggregate)
    }
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: SnapshotCapable,
    A::Event: DeserializeOwned + Serialize,
{
    /// Executes a command and saves a snapshot when the new events cross
    /// the aggregate's snapshot interval.
    pub async fn execute_with_snapshot<F>(
        &self,
        aggregate_id: &AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let result = self.execute(aggregate_id, command_fn).await?;

        let previous = Version::new(result.new_version.as_i64() - result.events.len() as i64);
        if !result.is_noop() && result.aggregate.crossed_snapshot_boundary(previous) {
            let snapshot = Snapshot::from_state(
                aggregate_id.clone(),
                A::aggregate_type(),
                result.new_version,
                &result.aggregate,
            )?;
            self.store.save_snapshot(snapshot).await?;
            tracing::debug!(
                aggregate_id = %aggregate_id,
                version = %result.new_version,
                "snapshot saved"
            );
        }

        Ok(result)
    }
}
