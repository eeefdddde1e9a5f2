//! Social ledger domain module (users, posts, likes, comments; event-sourced).
//!
//! This crate contains the ledger's state machine, implemented purely as
//! deterministic domain logic (no IO, no locking, no clock).

pub mod ledger;
pub mod model;

pub use ledger::{
    AddComment, CommentAdded, CreatePost, Ledger, LedgerCommand, LikePost, PostCreated, PostLiked,
    RegisterUser, SocialEvent, UserRegistered,
};
pub use model::{Comment, Post, User};
