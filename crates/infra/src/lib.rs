//! Infrastructure layer: event store, time sources, configuration and the
//! single-writer ledger service.

pub mod clock;
pub mod config;
pub mod event_store;
pub mod service;

pub use clock::{Clock, FixedClock, LogicalClock, SystemClock};
pub use config::{ClockKind, ConfigError, LedgerConfig};
pub use event_store::{
    EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent,
};
pub use service::{LedgerService, ServiceError, SocialEnvelope};
