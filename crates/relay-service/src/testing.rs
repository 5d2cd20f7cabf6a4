//! In-memory store implementations for tests
//!
//! Enabled for this crate's own tests and, through the `testing` feature, for
//! downstream crates that need a working pipeline without Redis or Postgres.
//! Each store can be told to fail so error paths can be exercised.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use relay_core::{
    DomainError, MembershipResolver, Message, MessageArchive, MessageId, Reactions, RepoResult,
    StagingStore, TargetKind,
};

use crate::services::ServiceContext;

fn oldest_first(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    messages
}

// ============================================================================
// Staging
// ============================================================================

/// Staging store backed by a `HashMap`; records never expire on their own
#[derive(Debug, Default)]
pub struct MemoryStagingStore {
    records: Mutex<HashMap<MessageId, Message>>,
    retains: Mutex<HashMap<MessageId, usize>>,
    fail_writes: AtomicBool,
}

impl MemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a record directly, bypassing `stage`
    pub fn insert(&self, message: Message) {
        self.records.lock().insert(message.id, message);
    }

    pub fn get(&self, id: MessageId) -> Option<Message> {
        self.records.lock().get(&id).cloned()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.records.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// How many times `retain` was called for a message
    pub fn retain_count(&self, id: MessageId) -> usize {
        self.retains.lock().get(&id).copied().unwrap_or(0)
    }

    /// Make `stage` and `replace` fail until switched off again
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> RepoResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DomainError::CacheError("staging store unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StagingStore for MemoryStagingStore {
    async fn stage(&self, message: &Message) -> RepoResult<()> {
        self.check_writable()?;
        self.insert(message.clone());
        Ok(())
    }

    async fn load(&self, id: MessageId) -> RepoResult<Option<Message>> {
        Ok(self.get(id))
    }

    async fn replace(&self, message: &Message) -> RepoResult<bool> {
        self.check_writable()?;
        let mut records = self.records.lock();
        match records.get_mut(&message.id) {
            Some(slot) => {
                *slot = message.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn staged_ids(&self) -> RepoResult<Vec<MessageId>> {
        let mut ids: Vec<_> = self.records.lock().keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn remove(&self, id: MessageId) -> RepoResult<()> {
        self.records.lock().remove(&id);
        Ok(())
    }

    async fn remove_if_unchanged(&self, message: &Message) -> RepoResult<bool> {
        let mut records = self.records.lock();
        if records.get(&message.id) != Some(message) {
            return Ok(false);
        }
        records.remove(&message.id);
        Ok(true)
    }

    async fn retain(&self, id: MessageId) -> RepoResult<bool> {
        *self.retains.lock().entry(id).or_default() += 1;
        Ok(self.contains(id))
    }
}

// ============================================================================
// Archive
// ============================================================================

/// Archive backed by a `HashMap` keyed on message ID
#[derive(Debug, Default)]
pub struct MemoryArchive {
    rows: Mutex<HashMap<MessageId, Message>>,
    failing: Mutex<HashSet<MessageId>>,
    upserts: AtomicUsize,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a row directly, bypassing `upsert`
    pub fn insert(&self, message: Message) {
        self.rows.lock().insert(message.id, message);
    }

    pub fn get(&self, id: MessageId) -> Option<Message> {
        self.rows.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// Number of `upsert` calls that succeeded
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    /// Make `upsert` fail for one message
    pub fn fail_upserts_for(&self, id: MessageId) {
        self.failing.lock().insert(id);
    }

    pub fn clear_failures(&self) {
        self.failing.lock().clear();
    }

    fn select(&self, keep: impl Fn(&Message) -> bool) -> Vec<Message> {
        let rows = self.rows.lock();
        oldest_first(rows.values().filter(|m| keep(m)).cloned().collect())
    }
}

#[async_trait]
impl MessageArchive for MemoryArchive {
    async fn upsert(&self, message: &Message) -> RepoResult<()> {
        if self.failing.lock().contains(&message.id) {
            return Err(DomainError::DatabaseError("archive unavailable".into()));
        }
        let mut rows = self.rows.lock();
        match rows.get_mut(&message.id) {
            Some(existing) => existing.reactions = message.reactions.clone(),
            None => {
                rows.insert(message.id, message.clone());
            }
        }
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_by_id(&self, id: MessageId) -> RepoResult<Option<Message>> {
        Ok(self.get(id))
    }

    async fn update_reactions(&self, id: MessageId, reactions: &Reactions) -> RepoResult<bool> {
        let mut rows = self.rows.lock();
        let Some(row) = rows.get_mut(&id) else {
            return Ok(false);
        };
        row.reactions = reactions.clone();
        Ok(true)
    }

    async fn find_by_target(&self, kind: TargetKind, target_id: &str) -> RepoResult<Vec<Message>> {
        Ok(self.select(|m| m.target_type == kind && m.target_id == target_id))
    }

    async fn find_between_users(&self, user_a: &str, user_b: &str) -> RepoResult<Vec<Message>> {
        Ok(self.select(|m| {
            m.target_type == TargetKind::User
                && ((m.author_id == user_a && m.target_id == user_b)
                    || (m.author_id == user_b && m.target_id == user_a))
        }))
    }

    async fn find_for_user(&self, user_id: &str) -> RepoResult<Vec<Message>> {
        Ok(self.select(|m| m.involves_user(user_id)))
    }
}

// ============================================================================
// Membership
// ============================================================================

/// Fixed membership table
#[derive(Debug, Default)]
pub struct StaticMembership {
    members: HashMap<(TargetKind, String), Vec<String>>,
    failing: bool,
}

impl StaticMembership {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_members<I, S>(mut self, kind: TargetKind, target_id: &str, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members.insert(
            (kind, target_id.to_string()),
            members.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// A resolver whose every lookup fails
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl MembershipResolver for StaticMembership {
    async fn list_members(&self, kind: TargetKind, target_id: &str) -> RepoResult<Vec<String>> {
        if self.failing {
            return Err(DomainError::MembershipError("membership service unavailable".into()));
        }
        Ok(self
            .members
            .get(&(kind, target_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Bundle
// ============================================================================

/// The three in-memory stores, kept around so tests can inspect them
#[derive(Debug, Clone)]
pub struct TestBackends {
    pub staging: Arc<MemoryStagingStore>,
    pub archive: Arc<MemoryArchive>,
    pub membership: Arc<StaticMembership>,
}

impl Default for TestBackends {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBackends {
    pub fn new() -> Self {
        Self::with_membership(StaticMembership::new())
    }

    pub fn with_membership(membership: StaticMembership) -> Self {
        Self {
            staging: Arc::new(MemoryStagingStore::new()),
            archive: Arc::new(MemoryArchive::new()),
            membership: Arc::new(membership),
        }
    }

    /// A service context wired to these stores
    pub fn context(&self, archive_after: Duration) -> ServiceContext {
        ServiceContext::new(
            self.staging.clone(),
            self.archive.clone(),
            self.membership.clone(),
            archive_after,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_staging_replace_requires_presence() {
        let store = MemoryStagingStore::new();
        let message = Message::new("alice", TargetKind::User, "bob", "hi");

        assert!(!store.replace(&message).await.unwrap());
        store.stage(&message).await.unwrap();
        assert!(store.replace(&message).await.unwrap());
        store.remove(message.id).await.unwrap();
        store.remove(message.id).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_memory_staging_remove_if_unchanged() {
        let store = MemoryStagingStore::new();
        let message = Message::new("alice", TargetKind::User, "bob", "hi");
        store.stage(&message).await.unwrap();

        let mut updated = message.clone();
        updated.reactions.add("👍", "bob");
        store.replace(&updated).await.unwrap();

        assert!(!store.remove_if_unchanged(&message).await.unwrap());
        assert!(store.contains(message.id));
        assert!(store.remove_if_unchanged(&updated).await.unwrap());
        assert!(!store.remove_if_unchanged(&updated).await.unwrap());
        assert!(!store.retain(message.id).await.unwrap());
        assert_eq!(store.retain_count(message.id), 1);
    }

    #[tokio::test]
    async fn test_memory_archive_upsert_keeps_first_body() {
        let archive = MemoryArchive::new();
        let mut message = Message::new("alice", TargetKind::User, "bob", "hi");
        archive.upsert(&message).await.unwrap();

        message.content = "edited".into();
        message.reactions.add("👍", "bob");
        archive.upsert(&message).await.unwrap();

        let stored = archive.get(message.id).unwrap();
        assert_eq!(stored.content, "hi");
        assert!(stored.reactions.contains("👍", "bob"));
        assert_eq!(archive.upsert_count(), 2);
        assert_eq!(archive.len(), 1);
    }

    #[tokio::test]
    async fn test_static_membership() {
        let members = StaticMembership::new().with_members(TargetKind::Group, "g1", ["a", "b"]);
        assert_eq!(
            members.list_members(TargetKind::Group, "g1").await.unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(members
            .list_members(TargetKind::Channel, "g1")
            .await
            .unwrap()
            .is_empty());
        assert!(StaticMembership::failing()
            .list_members(TargetKind::Group, "g1")
            .await
            .is_err());
    }
}
