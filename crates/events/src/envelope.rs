use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agora_core::{LedgerId, Timestamp};

/// Envelope for an event, containing stream metadata.
///
/// This is the unit delivered to external consumers (indexers).
///
/// Notes:
/// - **Append-only**: `sequence_number` increases by one per committed event
///   in the ledger's stream, starting at 1.
/// - `timestamp` is the logical time of the call that produced the event.
/// - `payload` is the domain event (typed or JSON).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    ledger_id: LedgerId,
    event_type: String,

    /// Monotonically increasing position in the ledger stream.
    sequence_number: u64,
    timestamp: Timestamp,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        ledger_id: LedgerId,
        event_type: impl Into<String>,
        sequence_number: u64,
        timestamp: Timestamp,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            ledger_id,
            event_type: event_type.into(),
            sequence_number,
            timestamp,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn ledger_id(&self) -> LedgerId {
        self.ledger_id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
