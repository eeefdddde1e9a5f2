use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use agora_core::{ExpectedVersion, LedgerId, Timestamp};
use agora_events::EventEnvelope;
use std::sync::Arc;

/// An event ready to be appended to a stream (not yet assigned a sequence number).
///
/// Lifecycle:
///
/// 1. **Domain event**: produced by the ledger's `handle()`
/// 2. **UncommittedEvent**: serialized and wrapped with stream metadata
/// 3. **StoredEvent**: persisted with an assigned `sequence_number`
/// 4. **EventEnvelope**: delivered to consumers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncommittedEvent {
    pub event_id: Uuid,
    pub ledger_id: LedgerId,

    pub event_type: String,
    pub event_version: u32,
    /// Logical time of the call that produced the event.
    pub timestamp: Timestamp,

    pub payload: JsonValue,
}

/// A stored event in an append-only stream (assigned a sequence number).
///
/// Sequence numbers start at 1, increase by one per event, and never change.
/// The stream version is the sequence number of the last stored event (0 for
/// an empty stream), which equals the number of events the ledger has applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub event_id: Uuid,
    pub ledger_id: LedgerId,

    /// Monotonically increasing position in the ledger stream.
    pub sequence_number: u64,

    pub event_type: String,
    pub event_version: u32,
    pub timestamp: Timestamp,
    /// Wall-clock time the store accepted the event. Informational only.
    pub recorded_at: DateTime<Utc>,

    pub payload: JsonValue,
}

impl StoredEvent {
    /// Convert into an envelope with the payload decoded as `E`.
    pub fn decode<E>(&self) -> Result<EventEnvelope<E>, EventStoreError>
    where
        E: DeserializeOwned,
    {
        let payload: E = serde_json::from_value(self.payload.clone()).map_err(|e| {
            EventStoreError::Serialization(format!(
                "payload of event #{} ({}) failed to decode: {e}",
                self.sequence_number, self.event_type
            ))
        })?;

        Ok(EventEnvelope::new(
            self.event_id,
            self.ledger_id,
            self.event_type.clone(),
            self.sequence_number,
            self.timestamp,
            payload,
        ))
    }
}

/// Event store operation error.
///
/// These are infrastructure errors, as opposed to the ledger's domain errors.
#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("invalid append: {0}")]
    InvalidAppend(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("event store lock poisoned")]
    Poisoned,
}

/// Append-only event store, one stream per ledger.
///
/// `append()`:
/// - requires every event in the batch to target the same ledger
/// - checks the expected version against the current stream version
/// - assigns sequence numbers starting at `current_version + 1`
/// - stores the whole batch or nothing
///
/// `load_stream()` returns the stream in sequence order, or an empty vector
/// for a ledger with no events yet.
pub trait EventStore: Send + Sync {
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    fn load_stream(&self, ledger_id: LedgerId) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Events with `sequence_number > after`, for consumers catching up.
    fn load_since(
        &self,
        ledger_id: LedgerId,
        after: u64,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let mut stream = self.load_stream(ledger_id)?;
        stream.retain(|e| e.sequence_number > after);
        Ok(stream)
    }
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected_version: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).append(events, expected_version)
    }

    fn load_stream(&self, ledger_id: LedgerId) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_stream(ledger_id)
    }

    fn load_since(
        &self,
        ledger_id: LedgerId,
        after: u64,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        (**self).load_since(ledger_id, after)
    }
}

impl UncommittedEvent {
    /// Serialize a typed domain event, capturing the metadata needed to
    /// decode it again.
    pub fn from_typed<E>(
        ledger_id: LedgerId,
        event_id: Uuid,
        timestamp: Timestamp,
        event: &E,
    ) -> Result<Self, EventStoreError>
    where
        E: agora_events::Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| {
            EventStoreError::Serialization(format!("payload serialization failed: {e}"))
        })?;

        Ok(Self {
            event_id,
            ledger_id,
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            timestamp,
            payload,
        })
    }
}
