//! Entities owned by the ledger.
//!
//! None of these hold back-references: a post does not list its comments and
//! a user does not list its posts. Reverse lookups go through the ledger.

use serde::{Deserialize, Serialize};

use agora_core::{Address, Timestamp};

/// A registered participant.
///
/// `User::default()` is the "soft miss" record returned for unknown
/// addresses: empty username, zero address, `is_registered == false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub address: Address,
    pub is_registered: bool,
}

/// A post in the ledger's post sequence.
///
/// `author`, `content` and `timestamp` never change after creation; the two
/// counters only ever go up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub author: Address,
    pub content: String,
    pub timestamp: Timestamp,
    pub likes: u64,
    pub comments_count: u64,
}

impl Post {
    pub(crate) fn new(author: Address, content: String, timestamp: Timestamp) -> Self {
        Self {
            author,
            content,
            timestamp,
            likes: 0,
            comments_count: 0,
        }
    }
}

/// An immutable comment attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub commenter: Address,
    pub content: String,
    pub timestamp: Timestamp,
}
