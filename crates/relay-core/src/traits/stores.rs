//! Store traits (ports) - the interface between the messaging pipeline and storage
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation: Redis for staging, Postgres for archival and
//! membership lookups.

use async_trait::async_trait;

use crate::entities::{Message, Reactions, TargetKind};
use crate::error::DomainError;
use crate::value_objects::MessageId;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Staging Store
// ============================================================================

/// Fast, expiring store holding messages that are not archived yet
#[async_trait]
pub trait StagingStore: Send + Sync {
    /// Write a freshly created message with the staging TTL
    async fn stage(&self, message: &Message) -> RepoResult<()>;

    /// Read a staged message
    ///
    /// Returns `Ok(None)` if the message is not staged and
    /// `DomainError::CorruptRecord` if the stored record cannot be decoded.
    async fn load(&self, id: MessageId) -> RepoResult<Option<Message>>;

    /// Overwrite a staged message and refresh its TTL
    ///
    /// Only succeeds while the record is still staged; returns `false` if it
    /// has been removed in the meantime.
    async fn replace(&self, message: &Message) -> RepoResult<bool>;

    /// IDs of every message currently staged
    async fn staged_ids(&self) -> RepoResult<Vec<MessageId>>;

    /// Delete a staged message. Deleting an absent message is not an error.
    async fn remove(&self, id: MessageId) -> RepoResult<()>;

    /// Delete a staged message only if its stored record still equals `message`
    ///
    /// Returns `false`, leaving the record in place, when it was overwritten
    /// after `message` was read or is no longer staged.
    async fn remove_if_unchanged(&self, message: &Message) -> RepoResult<bool>;

    /// Restart the record TTL of a message that could not be archived yet
    ///
    /// Returns `false` if the message is no longer staged.
    async fn retain(&self, id: MessageId) -> RepoResult<bool>;
}

// ============================================================================
// Archival Store
// ============================================================================

/// Durable store of record for messages
#[async_trait]
pub trait MessageArchive: Send + Sync {
    /// Insert a message, or refresh its reactions if the ID already exists
    async fn upsert(&self, message: &Message) -> RepoResult<()>;

    /// Find an archived message by ID
    async fn find_by_id(&self, id: MessageId) -> RepoResult<Option<Message>>;

    /// Replace the reaction set of an archived message; `false` if no such row
    async fn update_reactions(&self, id: MessageId, reactions: &Reactions) -> RepoResult<bool>;

    /// Messages addressed to a target, oldest first
    async fn find_by_target(&self, kind: TargetKind, target_id: &str) -> RepoResult<Vec<Message>>;

    /// Direct messages exchanged between two users in either direction, oldest first
    async fn find_between_users(&self, user_a: &str, user_b: &str) -> RepoResult<Vec<Message>>;

    /// Messages a user authored (any target) plus direct messages addressed to them, oldest first
    async fn find_for_user(&self, user_id: &str) -> RepoResult<Vec<Message>>;
}

// ============================================================================
// Membership
// ============================================================================

/// Resolves who belongs to a group or channel
#[async_trait]
pub trait MembershipResolver: Send + Sync {
    /// User IDs of every member of the target
    async fn list_members(&self, kind: TargetKind, target_id: &str) -> RepoResult<Vec<String>>;
}
