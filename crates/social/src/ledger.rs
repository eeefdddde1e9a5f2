use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use agora_core::{
    Address, Aggregate, AggregateRoot, Caller, CommentId, DomainError, DomainResult, LedgerId,
    PostId, Timestamp,
};
use agora_events::Event;

use crate::model::{Comment, Post, User};

/// Aggregate root: the social ledger.
///
/// Holds every user, post and comment. Posts live in one append-only
/// sequence; each post's comments live in their own append-only sequence at
/// the same index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    id: LedgerId,
    owner: Address,
    users: HashMap<Address, User>,
    posts: Vec<Post>,
    comments: Vec<Vec<Comment>>,
    version: u64,
}

impl Ledger {
    /// Create an empty ledger. `owner` is the identity that created it.
    pub fn new(id: LedgerId, owner: Address) -> Self {
        Self {
            id,
            owner,
            users: HashMap::new(),
            posts: Vec::new(),
            comments: Vec::new(),
            version: 0,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.users.get(address).is_some_and(|u| u.is_registered)
    }

    /// Soft lookup: unknown addresses yield `User::default()`.
    pub fn get_user_by_address(&self, address: &Address) -> User {
        self.users.get(address).cloned().unwrap_or_default()
    }

    pub fn users_count(&self) -> u64 {
        self.users.len() as u64
    }

    pub fn get_posts_count(&self) -> u64 {
        self.posts.len() as u64
    }

    pub fn get_post(&self, post_id: PostId) -> DomainResult<&Post> {
        post_id
            .index()
            .and_then(|i| self.posts.get(i))
            .ok_or(DomainError::PostNotFound)
    }

    pub fn get_all_posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn get_comment(&self, post_id: PostId, comment_id: CommentId) -> DomainResult<&Comment> {
        let comments = self.get_comments(post_id)?;
        comment_id
            .index()
            .and_then(|i| comments.get(i))
            .ok_or(DomainError::CommentNotFound)
    }

    /// All comments on a post, in insertion order.
    pub fn get_comments(&self, post_id: PostId) -> DomainResult<&[Comment]> {
        post_id
            .index()
            .and_then(|i| self.comments.get(i))
            .map(Vec::as_slice)
            .ok_or(DomainError::PostNotFound)
    }

    /// Per-post comment counter; unknown posts count as 0.
    pub fn comment_count(&self, post_id: PostId) -> u64 {
        self.get_comments(post_id).map_or(0, |c| c.len() as u64)
    }

    /// Id the next successful `CreatePost` will receive.
    pub fn next_post_id(&self) -> PostId {
        PostId(self.get_posts_count())
    }

    /// Id the next successful `AddComment` on `post_id` will receive.
    pub fn next_comment_id(&self, post_id: PostId) -> DomainResult<CommentId> {
        self.get_post(post_id).map(|p| CommentId(p.comments_count))
    }
}

impl AggregateRoot for Ledger {
    type Id = LedgerId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterUser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUser {
    pub caller: Caller,
    pub username: String,
}

/// Command: CreatePost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePost {
    pub caller: Caller,
    pub content: String,
    /// Issued by the host time source, never by the caller.
    pub timestamp: Timestamp,
}

/// Command: LikePost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePost {
    pub caller: Caller,
    pub post_id: PostId,
}

/// Command: AddComment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddComment {
    pub caller: Caller,
    pub post_id: PostId,
    pub content: String,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCommand {
    RegisterUser(RegisterUser),
    CreatePost(CreatePost),
    LikePost(LikePost),
    AddComment(AddComment),
}

/// Event: UserRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub address: Address,
    pub username: String,
}

/// Event: PostCreated.
///
/// The post's id is its position in the stream of `PostCreated` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCreated {
    pub author: Address,
    pub content: String,
    pub timestamp: Timestamp,
}

/// Event: PostLiked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostLiked {
    pub liker: Address,
    pub post_id: PostId,
}

/// Event: CommentAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentAdded {
    pub commenter: Address,
    pub post_id: PostId,
    pub content: String,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocialEvent {
    UserRegistered(UserRegistered),
    PostCreated(PostCreated),
    PostLiked(PostLiked),
    CommentAdded(CommentAdded),
}

impl Event for SocialEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SocialEvent::UserRegistered(_) => "social.user.registered",
            SocialEvent::PostCreated(_) => "social.post.created",
            SocialEvent::PostLiked(_) => "social.post.liked",
            SocialEvent::CommentAdded(_) => "social.comment.added",
        }
    }

    fn version(&self) -> u32 {
        1
    }
}

impl Aggregate for Ledger {
    type Command = LedgerCommand;
    type Event = SocialEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SocialEvent::UserRegistered(e) => {
                self.users.insert(
                    e.address,
                    User {
                        username: e.username.clone(),
                        address: e.address,
                        is_registered: true,
                    },
                );
            }
            SocialEvent::PostCreated(e) => {
                self.posts
                    .push(Post::new(e.author, e.content.clone(), e.timestamp));
                self.comments.push(Vec::new());
            }
            SocialEvent::PostLiked(e) => {
                if let Some(post) = e.post_id.index().and_then(|i| self.posts.get_mut(i)) {
                    post.likes += 1;
                }
            }
            SocialEvent::CommentAdded(e) => {
                let slot = e
                    .post_id
                    .index()
                    .and_then(|i| self.posts.get_mut(i).zip(self.comments.get_mut(i)));
                if let Some((post, comments)) = slot {
                    comments.push(Comment {
                        commenter: e.commenter,
                        content: e.content.clone(),
                        timestamp: e.timestamp,
                    });
                    post.comments_count += 1;
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LedgerCommand::RegisterUser(cmd) => self.handle_register(cmd),
            LedgerCommand::CreatePost(cmd) => self.handle_create_post(cmd),
            LedgerCommand::LikePost(cmd) => self.handle_like(cmd),
            LedgerCommand::AddComment(cmd) => self.handle_comment(cmd),
        }
    }
}

impl Ledger {
    fn ensure_registered(&self, caller: &Caller) -> Result<(), DomainError> {
        if !self.is_registered(&caller.address()) {
            return Err(DomainError::NotRegistered);
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterUser) -> Result<Vec<SocialEvent>, DomainError> {
        if self.is_registered(&cmd.caller.address()) {
            return Err(DomainError::AlreadyRegistered);
        }

        Ok(vec![SocialEvent::UserRegistered(UserRegistered {
            address: cmd.caller.address(),
            username: cmd.username.clone(),
        })])
    }

    fn handle_create_post(&self, cmd: &CreatePost) -> Result<Vec<SocialEvent>, DomainError> {
        self.ensure_registered(&cmd.caller)?;

        Ok(vec![SocialEvent::PostCreated(PostCreated {
            author: cmd.caller.address(),
            content: cmd.content.clone(),
            timestamp: cmd.timestamp,
        })])
    }

    // Post existence is checked before registration.
    fn handle_like(&self, cmd: &LikePost) -> Result<Vec<SocialEvent>, DomainError> {
        self.get_post(cmd.post_id)?;
        self.ensure_registered(&cmd.caller)?;

        Ok(vec![SocialEvent::PostLiked(PostLiked {
            liker: cmd.caller.address(),
            post_id: cmd.post_id,
        })])
    }

    fn handle_comment(&self, cmd: &AddComment) -> Result<Vec<SocialEvent>, DomainError> {
        self.get_post(cmd.post_id)?;
        self.ensure_registered(&cmd.caller)?;

        Ok(vec![SocialEvent::CommentAdded(CommentAdded {
            commenter: cmd.caller.address(),
            post_id: cmd.post_id,
            content: cmd.content.clone(),
            timestamp: cmd.timestamp,
        })])
    }
}
