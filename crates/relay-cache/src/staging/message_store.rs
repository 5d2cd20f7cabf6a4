//! Redis implementation of the staging store.
//!
//! Each staged message occupies two keys written atomically:
//!
//! - `message:<id>`: the JSON record, expiring after `record_ttl`
//! - `message:<id>:deadline`: an empty marker expiring after `archive_after`
//!
//! The marker's expiry notification fires while the record still exists, which
//! lets the expiry listener archive it. The record's longer TTL is the grace
//! window in which the periodic sweep can still find it.

use async_trait::async_trait;
use std::time::Duration;

use relay_core::{DomainError, Message, MessageId, RepoResult, StagingStore};

use crate::pool::{RedisPoolError, SharedRedisPool};

/// Key namespace shared by records and deadline markers
pub const MESSAGE_KEY_PREFIX: &str = "message:";

const DEADLINE_SUFFIX: &str = ":deadline";

/// Deletes the record and its marker only while the record equals ARGV[1]
const REMOVE_IF_UNCHANGED: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('DEL', KEYS[1], KEYS[2])
    return 1
end
return 0
";

/// Redis key holding a staged record
pub fn record_key(id: MessageId) -> String {
    format!("{MESSAGE_KEY_PREFIX}{id}")
}

/// Redis key whose expiry marks the archival threshold of a record
pub fn deadline_key(id: MessageId) -> String {
    format!("{MESSAGE_KEY_PREFIX}{id}{DEADLINE_SUFFIX}")
}

/// Extract the message ID from a record key; `None` for deadline markers and foreign keys
pub fn parse_record_key(key: &str) -> Option<MessageId> {
    let rest = key.strip_prefix(MESSAGE_KEY_PREFIX)?;
    if rest.contains(':') {
        return None;
    }
    MessageId::parse(rest).ok()
}

/// Timing and scan settings
#[derive(Debug, Clone)]
pub struct StagingSettings {
    /// Lifetime of the record itself
    pub record_ttl: Duration,
    /// Lifetime of the deadline marker
    pub archive_after: Duration,
    /// COUNT hint for SCAN
    pub scan_count: usize,
}

impl Default for StagingSettings {
    fn default() -> Self {
        Self {
            record_ttl: Duration::from_secs(300),
            archive_after: Duration::from_secs(180),
            scan_count: 100,
        }
    }
}

impl From<&relay_common::MessagingConfig> for StagingSettings {
    fn from(config: &relay_common::MessagingConfig) -> Self {
        Self {
            record_ttl: config.staging_ttl(),
            archive_after: config.archive_after(),
            scan_count: config.scan_batch_size,
        }
    }
}

fn map_cache_error(e: RedisPoolError) -> DomainError {
    DomainError::CacheError(e.to_string())
}

/// Staging store keeping messages in Redis until they are archived
#[derive(Clone)]
pub struct RedisStagingStore {
    pool: SharedRedisPool,
    settings: StagingSettings,
}

impl RedisStagingStore {
    /// Create a new RedisStagingStore
    pub fn new(pool: SharedRedisPool, settings: StagingSettings) -> Self {
        Self { pool, settings }
    }

    /// Settings this store was created with
    pub fn settings(&self) -> &StagingSettings {
        &self.settings
    }

    fn record_ttl_secs(&self) -> u64 {
        self.settings.record_ttl.as_secs().max(1)
    }
}

impl std::fmt::Debug for RedisStagingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStagingStore")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StagingStore for RedisStagingStore {
    #[tracing::instrument(skip(self, message), fields(message_id = %message.id))]
    async fn stage(&self, message: &Message) -> RepoResult<()> {
        let record = serde_json::to_string(message)
            .map_err(|e| DomainError::InternalError(format!("encode message: {e}")))?;
        let mut conn = self.pool.get().await.map_err(map_cache_error)?;

        redis::pipe()
            .atomic()
            .set_ex(record_key(message.id), record, self.record_ttl_secs())
            .ignore()
            .set_ex(
                deadline_key(message.id),
                "",
                self.settings.archive_after.as_secs().max(1),
            )
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| map_cache_error(e.into()))?;

        Ok(())
    }

    async fn load(&self, id: MessageId) -> RepoResult<Option<Message>> {
        let key = record_key(id);
        match self.pool.get_value::<Message>(&key).await {
            Ok(message) => Ok(message),
            Err(RedisPoolError::Serialization(e)) => Err(DomainError::CorruptRecord {
                key,
                reason: e.to_string(),
            }),
            Err(e) => Err(map_cache_error(e)),
        }
    }

    #[tracing::instrument(skip(self, message), fields(message_id = %message.id))]
    async fn replace(&self, message: &Message) -> RepoResult<bool> {
        self.pool
            .set_existing(&record_key(message.id), message, self.record_ttl_secs())
            .await
            .map_err(map_cache_error)
    }

    async fn staged_ids(&self) -> RepoResult<Vec<MessageId>> {
        let keys = self
            .pool
            .scan_keys(&format!("{MESSAGE_KEY_PREFIX}*"), self.settings.scan_count)
            .await
            .map_err(map_cache_error)?;

        Ok(keys.iter().filter_map(|key| parse_record_key(key)).collect())
    }

    async fn remove(&self, id: MessageId) -> RepoResult<()> {
        let record = record_key(id);
        let deadline = deadline_key(id);
        self.pool
            .delete_many(&[record.as_str(), deadline.as_str()])
            .await
            .map_err(map_cache_error)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, message), fields(message_id = %message.id))]
    async fn remove_if_unchanged(&self, message: &Message) -> RepoResult<bool> {
        let expected = serde_json::to_string(message)
            .map_err(|e| DomainError::InternalError(format!("encode message: {e}")))?;
        let mut conn = self.pool.get().await.map_err(map_cache_error)?;

        let removed: i32 = redis::Script::new(REMOVE_IF_UNCHANGED)
            .key(record_key(message.id))
            .key(deadline_key(message.id))
            .arg(expected)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_cache_error(e.into()))?;

        Ok(removed == 1)
    }

    async fn retain(&self, id: MessageId) -> RepoResult<bool> {
        self.pool
            .expire(&record_key(id), self.record_ttl_secs())
            .await
            .map_err(map_cache_error)
    }
}
