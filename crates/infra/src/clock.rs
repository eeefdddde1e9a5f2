//! Time sources.
//!
//! The ledger never takes a timestamp from call arguments. The service reads
//! one of these inside its critical section, so timestamps are non-decreasing
//! in commit order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use agora_core::Timestamp;

/// Source of monotonic logical time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// Never issue a reading at or below `last` again (for clocks that can).
    ///
    /// Called after replay with the newest recorded timestamp.
    fn resume_after(&self, last: Timestamp);
}

impl<C> Clock for Arc<C>
where
    C: Clock + ?Sized,
{
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn resume_after(&self, last: Timestamp) {
        (**self).resume_after(last)
    }
}

impl<C> Clock for Box<C>
where
    C: Clock + ?Sized,
{
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn resume_after(&self, last: Timestamp) {
        (**self).resume_after(last)
    }
}

/// Counter clock: every reading is one greater than the previous (1, 2, 3, ...).
#[derive(Debug)]
pub struct LogicalClock {
    last: AtomicU64,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::starting_after(Timestamp::ZERO)
    }

    /// Resume after `last`, e.g. the newest timestamp found during replay.
    pub fn starting_after(last: Timestamp) -> Self {
        Self {
            last: AtomicU64::new(last.value()),
        }
    }
}

impl Default for LogicalClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.last.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn resume_after(&self, last: Timestamp) {
        self.last.fetch_max(last.value(), Ordering::SeqCst);
    }
}

/// Unix-seconds clock that never goes backwards.
///
/// If the wall clock steps back, the last issued value is repeated until the
/// wall clock catches up.
#[derive(Debug)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::starting_after(Timestamp::ZERO)
    }

    pub fn starting_after(last: Timestamp) -> Self {
        Self {
            last: AtomicU64::new(last.value()),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = u64::try_from(Utc::now().timestamp()).unwrap_or(0);
        let prev = self.last.fetch_max(wall, Ordering::SeqCst);
        Timestamp(prev.max(wall))
    }

    fn resume_after(&self, last: Timestamp) {
        self.last.fetch_max(last.value(), Ordering::SeqCst);
    }
}

/// Clock pinned to one value. For tests.
#[derive(Debug, Copy, Clone)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }

    // Pinned on purpose; tests choose the value.
    fn resume_after(&self, _last: Timestamp) {}
}
