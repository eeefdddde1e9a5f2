//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every variant is a precondition failure detected before any state change,
/// so a returned error always means "nothing happened".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The caller already has a user record.
    #[error("user already registered")]
    AlreadyRegistered,

    /// The caller has no user record.
    #[error("user not registered")]
    NotRegistered,

    /// The post index is out of range.
    #[error("post does not exist")]
    PostNotFound,

    /// The comment index is out of range for its post.
    #[error("comment does not exist")]
    CommentNotFound,

    /// An address failed to parse at the call boundary.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A stale version was observed (optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
