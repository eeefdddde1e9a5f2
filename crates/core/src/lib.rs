//! `agora-core` — domain foundation building blocks for the social ledger.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod caller;
pub mod error;
pub mod id;
pub mod time;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use caller::Caller;
pub use error::{DomainError, DomainResult};
pub use id::{Address, CommentId, LedgerId, PostId};
pub use time::Timestamp;
