//! Append-only event store boundary.
//!
//! Every committed ledger mutation is recorded here before it is published,
//! so the store is the durable record and the source for replay.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
