//! # relay-cache
//!
//! Redis layer for the message relay.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Staging Store**: Not-yet-archived messages under `message:<id>`, each
//!   paired with a `message:<id>:deadline` key that expires at the archival threshold
//! - **Keyspace Subscriber**: Key expiry notifications fanned out over a broadcast channel
//!
//! ## Example
//!
//! ```ignore
//! use relay_cache::{create_shared_pool, RedisPoolConfig, RedisStagingStore, StagingSettings};
//! use relay_core::StagingStore;
//!
//! let pool = create_shared_pool(RedisPoolConfig::default())?;
//! let staging = RedisStagingStore::new(pool, StagingSettings::default());
//!
//! staging.stage(&message).await?;
//! let pending = staging.staged_ids().await?;
//! ```

pub mod keyspace;
pub mod pool;
pub mod staging;

// Re-export pool types
pub use pool::{
    create_shared_pool, RedisPool, RedisPoolConfig, RedisPoolError, RedisResult, SharedRedisPool,
};

// Re-export staging types
pub use staging::{
    deadline_key, parse_record_key, record_key, RedisStagingStore, StagingSettings,
    MESSAGE_KEY_PREFIX,
};

// Re-export keyspace types
pub use keyspace::{
    enable_expiry_notifications, expired_channel, ExpiredKey, KeyspaceSubscriber,
    SubscriberConfig, SubscriberError, SubscriberResult,
};
