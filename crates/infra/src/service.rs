//! Single-writer ledger service.
//!
//! Owns the `Ledger` behind one mutex and runs every mutating call to
//! completion inside it:
//!
//! ```text
//! call(&Caller, args)
//!   ↓ lock
//! 1. read the clock
//! 2. build the command (identity from the caller, time from the clock)
//! 3. handle (pure decision; domain errors stop here, nothing changed)
//! 4. append to the event store (optimistic check against the ledger version)
//! 5. apply the events to the ledger
//! 6. publish envelopes to the bus
//!   ↓ unlock
//! ```
//!
//! Because publish happens under the same lock, subscribers receive events in
//! commit order. Reads lock briefly and return owned copies, so they never
//! observe a half-applied call.

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use agora_core::{
    Address, Aggregate, AggregateRoot, Caller, CommentId, DomainError, ExpectedVersion, LedgerId,
    PostId, Timestamp,
};
use agora_events::{EventBus, EventEnvelope, Subscription};
use agora_social::{
    AddComment, Comment, CreatePost, Ledger, LedgerCommand, LikePost, Post, RegisterUser,
    SocialEvent, User,
};

use crate::clock::Clock;
use crate::config::LedgerConfig;
use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

/// Envelope type delivered to subscribers.
pub type SocialEnvelope = EventEnvelope<SocialEvent>;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Precondition failure; the ledger is unchanged and nothing was emitted.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Recording failed; the ledger is unchanged and nothing was emitted.
    #[error("event store: {0}")]
    Store(#[from] EventStoreError),

    /// Publication failed after the mutation was recorded and applied.
    /// Consumers can recover the events from the store.
    #[error("event publication failed: {0}")]
    Publish(String),

    /// Recorded history could not be decoded or is out of order.
    #[error("replay failed: {0}")]
    Replay(String),

    #[error("ledger lock poisoned")]
    Poisoned,
}

impl ServiceError {
    /// The domain error behind this failure, if it is one.
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

pub struct LedgerService<S, B, C> {
    ledger: Mutex<Ledger>,
    store: S,
    bus: B,
    clock: C,
}

impl<S, B, C> core::fmt::Debug for LedgerService<S, B, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LedgerService").finish_non_exhaustive()
    }
}

impl<S, B, C> LedgerService<S, B, C>
where
    S: EventStore,
    B: EventBus<SocialEnvelope>,
    C: Clock,
{
    /// Start a fresh ledger. The store's stream for `ledger_id` should be empty.
    pub fn new(ledger_id: LedgerId, owner: Address, store: S, bus: B, clock: C) -> Self {
        info!(ledger_id = %ledger_id, owner = %owner, "ledger created");
        Self {
            ledger: Mutex::new(Ledger::new(ledger_id, owner)),
            store,
            bus,
            clock,
        }
    }

    /// Rebuild a ledger from its recorded stream.
    ///
    /// Events are applied in sequence order; nothing is republished. The
    /// clock resumes after the newest recorded timestamp.
    pub fn rehydrate(
        ledger_id: LedgerId,
        owner: Address,
        store: S,
        bus: B,
        clock: C,
    ) -> Result<Self, ServiceError> {
        let history = store.load_stream(ledger_id)?;
        let ledger = replay(Ledger::new(ledger_id, owner), &history)?;
        if let Some(last) = history.iter().map(|e| e.timestamp).max() {
            clock.resume_after(last);
        }
        info!(
            ledger_id = %ledger_id,
            events = history.len(),
            posts = ledger.get_posts_count(),
            "ledger rehydrated"
        );

        Ok(Self {
            ledger: Mutex::new(ledger),
            store,
            bus,
            clock,
        })
    }

    pub fn register_user(&self, caller: &Caller, username: &str) -> Result<(), ServiceError> {
        let mut ledger = self.lock()?;
        let now = self.clock.now();
        let command = LedgerCommand::RegisterUser(RegisterUser {
            caller: *caller,
            username: username.to_string(),
        });
        self.commit(&mut ledger, command, now)?;
        info!(caller = %caller, username, "user registered");
        Ok(())
    }

    pub fn create_post(&self, caller: &Caller, content: &str) -> Result<PostId, ServiceError> {
        let mut ledger = self.lock()?;
        let now = self.clock.now();
        let post_id = ledger.next_post_id();
        let command = LedgerCommand::CreatePost(CreatePost {
            caller: *caller,
            content: content.to_string(),
            timestamp: now,
        });
        self.commit(&mut ledger, command, now)?;
        info!(caller = %caller, post_id = %post_id, timestamp = %now, "post created");
        Ok(post_id)
    }

    pub fn like_post(&self, caller: &Caller, post_id: PostId) -> Result<(), ServiceError> {
        let mut ledger = self.lock()?;
        let now = self.clock.now();
        let command = LedgerCommand::LikePost(LikePost {
            caller: *caller,
            post_id,
        });
        self.commit(&mut ledger, command, now)?;
        debug!(caller = %caller, post_id = %post_id, "post liked");
        Ok(())
    }

    pub fn add_comment(
        &self,
        caller: &Caller,
        post_id: PostId,
        content: &str,
    ) -> Result<CommentId, ServiceError> {
        let mut ledger = self.lock()?;
        let now = self.clock.now();
        let comment_id = ledger.next_comment_id(post_id)?;
        let command = LedgerCommand::AddComment(AddComment {
            caller: *caller,
            post_id,
            content: content.to_string(),
            timestamp: now,
        });
        self.commit(&mut ledger, command, now)?;
        info!(caller = %caller, post_id = %post_id, comment_id = %comment_id, "comment added");
        Ok(comment_id)
    }

    pub fn get_user_by_address(&self, address: &Address) -> Result<User, ServiceError> {
        Ok(self.lock()?.get_user_by_address(address))
    }

    pub fn get_posts_count(&self) -> Result<u64, ServiceError> {
        Ok(self.lock()?.get_posts_count())
    }

    pub fn get_post(&self, post_id: PostId) -> Result<Post, ServiceError> {
        Ok(self.lock()?.get_post(post_id)?.clone())
    }

    pub fn get_comment(
        &self,
        post_id: PostId,
        comment_id: CommentId,
    ) -> Result<Comment, ServiceError> {
        Ok(self.lock()?.get_comment(post_id, comment_id)?.clone())
    }

    /// Every comment on a post, oldest first.
    pub fn get_comments(&self, post_id: PostId) -> Result<Vec<Comment>, ServiceError> {
        Ok(self.lock()?.get_comments(post_id)?.to_vec())
    }

    pub fn get_all_posts(&self) -> Result<Vec<Post>, ServiceError> {
        Ok(self.lock()?.get_all_posts().to_vec())
    }

    pub fn comment_count(&self, post_id: PostId) -> Result<u64, ServiceError> {
        Ok(self.lock()?.comment_count(post_id))
    }

    pub fn owner(&self) -> Result<Address, ServiceError> {
        Ok(self.lock()?.owner())
    }

    /// A consistent copy of the whole ledger.
    pub fn snapshot(&self) -> Result<Ledger, ServiceError> {
        Ok(self.lock()?.clone())
    }

    /// Receive every event committed from now on, in commit order.
    pub fn subscribe(&self) -> Subscription<SocialEnvelope> {
        self.bus.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn lock(&self) -> Result<MutexGuard<'_, Ledger>, ServiceError> {
        self.ledger.lock().map_err(|_| ServiceError::Poisoned)
    }

    fn commit(
        &self,
        ledger: &mut Ledger,
        command: LedgerCommand,
        now: Timestamp,
    ) -> Result<Vec<StoredEvent>, ServiceError> {
        // 1) Decide (no mutation)
        let decided = ledger.handle(&command).map_err(|e| {
            debug!(error = %e, command = ?command, "command rejected");
            ServiceError::Domain(e)
        })?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 2) Record (append-only, optimistic against the in-memory version)
        let ledger_id = *ledger.id();
        let uncommitted = decided
            .iter()
            .map(|ev| UncommittedEvent::from_typed(ledger_id, Uuid::now_v7(), now, ev))
            .collect::<Result<Vec<_>, _>>()?;
        let committed = self
            .store
            .append(uncommitted, ExpectedVersion::Exact(ledger.version()))?;

        // 3) Apply
        for ev in &decided {
            ledger.apply(ev);
        }

        // 4) Publish committed events (after append + apply)
        for (stored, ev) in committed.iter().zip(decided) {
            let envelope = EventEnvelope::new(
                stored.event_id,
                stored.ledger_id,
                stored.event_type.clone(),
                stored.sequence_number,
                stored.timestamp,
                ev,
            );
            self.bus.publish(envelope).map_err(|e| {
                warn!(
                    sequence_number = stored.sequence_number,
                    event_type = %stored.event_type,
                    "event recorded but not published: {e:?}"
                );
                ServiceError::Publish(format!("{e:?}"))
            })?;
        }

        Ok(committed)
    }
}

impl<S, B> LedgerService<S, B, Arc<dyn Clock>>
where
    S: EventStore,
    B: EventBus<SocialEnvelope>,
{
    /// Open the ledger named by `config`, replaying whatever the store holds
    /// with the configured clock.
    pub fn open(config: &LedgerConfig, store: S, bus: B) -> Result<Self, ServiceError> {
        let clock = config.clock.build();
        Self::rehydrate(config.ledger_id, config.owner, store, bus, clock)
    }
}

fn replay(mut ledger: Ledger, history: &[StoredEvent]) -> Result<Ledger, ServiceError> {
    let ledger_id = *ledger.id();
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|e| e.sequence_number);

    for (idx, stored) in sorted.iter().enumerate() {
        if stored.ledger_id != ledger_id {
            return Err(ServiceError::Replay(format!(
                "stream contains event for another ledger at index {idx}"
            )));
        }
        let expected = ledger.version() + 1;
        if stored.sequence_number != expected {
            return Err(ServiceError::Replay(format!(
                "sequence gap: expected {expected}, found {}",
                stored.sequence_number
            )));
        }
        let envelope = stored
            .decode::<SocialEvent>()
            .map_err(|e| ServiceError::Replay(e.to_string()))?;
        let target = match envelope.payload() {
            SocialEvent::PostLiked(e) => Some(e.post_id),
            SocialEvent::CommentAdded(e) => Some(e.post_id),
            _ => None,
        };
        if let Some(post_id) = target.filter(|id| ledger.get_post(*id).is_err()) {
            return Err(ServiceError::Replay(format!(
                "event #{} references missing post {post_id}",
                stored.sequence_number
            )));
        }
        ledger.apply(envelope.payload());
    }

    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_events::InMemoryEventBus;

    use crate::clock::{FixedClock, LogicalClock};
    use crate::event_store::InMemoryEventStore;

    type TestService =
        LedgerService<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<SocialEnvelope>>, LogicalClock>;

    fn caller(n: u8) -> Caller {
        Caller::authenticated(Address::from_bytes([n; Address::LEN]))
    }

    fn service() -> TestService {
        LedgerService::new(
            LedgerId::new(),
            Address::ZERO,
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryEventBus::new()),
            LogicalClock::new(),
        )
    }

    #[test]
    fn failed_call_records_and_publishes_nothing() {
        let svc = service();
        let sub = svc.subscribe();

        let err = svc.create_post(&caller(1), "hi").unwrap_err();

        assert_eq!(err.domain(), Some(&DomainError::NotRegistered));
        assert!(sub.try_recv().is_err());
        let ledger_id = *svc.snapshot().unwrap().id();
        assert!(svc.store().load_stream(ledger_id).unwrap().is_empty());
    }

    #[test]
    fn timestamps_come_from_the_clock() {
        let svc = LedgerService::new(
            LedgerId::new(),
            Address::ZERO,
            InMemoryEventStore::new(),
            InMemoryEventBus::<SocialEnvelope>::new(),
            FixedClock(Timestamp(1_700_000_000)),
        );
        svc.register_user(&caller(1), "alice").unwrap();
        let post_id = svc.create_post(&caller(1), "hello").unwrap();

        assert_eq!(svc.get_post(post_id).unwrap().timestamp, Timestamp(1_700_000_000));
    }

    #[test]
    fn returned_ids_are_positional() {
        let svc = service();
        svc.register_user(&caller(1), "alice").unwrap();

        assert_eq!(svc.create_post(&caller(1), "a").unwrap(), PostId(0));
        assert_eq!(svc.create_post(&caller(1), "b").unwrap(), PostId(1));
        assert_eq!(svc.add_comment(&caller(1), PostId(1), "x").unwrap(), CommentId(0));
        assert_eq!(svc.add_comment(&caller(1), PostId(1), "y").unwrap(), CommentId(1));
        assert_eq!(svc.add_comment(&caller(1), PostId(0), "z").unwrap(), CommentId(0));
        assert_eq!(svc.comment_count(PostId(1)).unwrap(), 2);
    }

    #[test]
    fn replay_rejects_sequence_gaps() {
        let store = InMemoryEventStore::new();
        let ledger_id = LedgerId::new();
        let ev = SocialEvent::UserRegistered(agora_social::UserRegistered {
            address: caller(1).address(),
            username: "alice".to_string(),
        });
        let mut stored = store
            .append(
                vec![
                    UncommittedEvent::from_typed(ledger_id, Uuid::now_v7(), Timestamp(1), &ev)
                        .unwrap(),
                ],
                ExpectedVersion::Exact(0),
            )
            .unwrap();
        stored[0].sequence_number = 2;

        let err = replay(Ledger::new(ledger_id, Address::ZERO), &stored).unwrap_err();
        assert!(matches!(err, ServiceError::Replay(msg) if msg.contains("sequence gap")));
    }

    #[test]
    fn rehydrate_resumes_a_fresh_clock_after_history() {
        let store = Arc::new(InMemoryEventStore::new());
        let ledger_id = LedgerId::new();
        let first = LedgerService::new(
            ledger_id,
            Address::ZERO,
            store.clone(),
            InMemoryEventBus::<SocialEnvelope>::new(),
            LogicalClock::new(),
        );
        first.register_user(&caller(1), "alice").unwrap();
        first.create_post(&caller(1), "one").unwrap();
        first.create_post(&caller(1), "two").unwrap();
        drop(first);

        let reopened = LedgerService::rehydrate(
            ledger_id,
            Address::ZERO,
            store,
            InMemoryEventBus::<SocialEnvelope>::new(),
            LogicalClock::new(),
        )
        .unwrap();
        let post_id = reopened.create_post(&caller(1), "three").unwrap();

        let stamps: Vec<Timestamp> = reopened
            .get_all_posts()
            .unwrap()
            .iter()
            .map(|p| p.timestamp)
            .collect();
        assert_eq!(post_id, PostId(2));
        assert_eq!(stamps, vec![Timestamp(2), Timestamp(3), Timestamp(4)]);
    }

    #[test]
    fn replay_rejects_events_for_missing_posts() {
        let store = InMemoryEventStore::new();
        let ledger_id = LedgerId::new();
        let like = SocialEvent::PostLiked(agora_social::PostLiked {
            liker: caller(1).address(),
            post_id: PostId(0),
        });
        let stored = store
            .append(
                vec![
                    UncommittedEvent::from_typed(ledger_id, Uuid::now_v7(), Timestamp(1), &like)
                        .unwrap(),
                ],
                ExpectedVersion::Exact(0),
            )
            .unwrap();

        let err = replay(Ledger::new(ledger_id, Address::ZERO), &stored).unwrap_err();
        assert!(matches!(err, ServiceError::Replay(msg) if msg.contains("missing post")));
    }

    #[test]
    fn replay_rejects_undecodable_payloads() {
        let ledger_id = LedgerId::new();
        let store = InMemoryEventStore::new();
        let stored = store
            .append(
                vec![UncommittedEvent {
                    event_id: Uuid::now_v7(),
                    ledger_id,
                    event_type: "social.user.registered".to_string(),
                    event_version: 1,
                    timestamp: Timestamp(1),
                    payload: serde_json::json!({ "unexpected": true }),
                }],
                ExpectedVersion::Exact(0),
            )
            .unwrap();

        let err = replay(Ledger::new(ledger_id, Address::ZERO), &stored).unwrap_err();
        assert!(matches!(err, ServiceError::Replay(_)));
    }
}
