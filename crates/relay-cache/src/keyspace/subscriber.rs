//! Key expiry subscriber.
//!
//! Listens on `__keyevent@<db>__:expired` and re-broadcasts each expired key
//! name to in-process receivers.

use futures_util::{Stream, StreamExt};
use redis::aio::PubSub;
use redis::{Client, Msg};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::pool::{RedisPool, RedisResult};
use crate::staging::MESSAGE_KEY_PREFIX;

/// Error type for subscriber operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result type for subscriber operations
pub type SubscriberResult<T> = Result<T, SubscriberError>;

/// Name of a key that Redis expired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredKey(pub String);

impl ExpiredKey {
    /// Whether the key belongs to the message staging namespace
    pub fn is_message_key(&self) -> bool {
        self.0.starts_with(MESSAGE_KEY_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Keyevent channel carrying expiry notifications for a database
pub fn expired_channel(db: i64) -> String {
    format!("__keyevent@{db}__:expired")
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Redis connection URL; the database index selects the keyevent channel
    pub redis_url: String,
    /// Channel buffer size for broadcast
    pub broadcast_buffer: usize,
    /// Delay between reconnection attempts
    pub reconnect_delay: Duration,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            broadcast_buffer: 1024,
            reconnect_delay: Duration::from_millis(1000),
        }
    }
}

/// Live subscription to key expiry events
///
/// The first subscription happens inside [`KeyspaceSubscriber::connect`], so a
/// misconfigured or unreachable Redis is reported to the caller. Later
/// disconnects are retried in the background until `shutdown` is cancelled.
pub struct KeyspaceSubscriber {
    channel: String,
    broadcast_tx: broadcast::Sender<ExpiredKey>,
    shutdown: CancellationToken,
}

impl KeyspaceSubscriber {
    /// Subscribe and start forwarding events in the background
    pub async fn connect(
        config: SubscriberConfig,
        shutdown: CancellationToken,
    ) -> SubscriberResult<Self> {
        let client = Client::open(config.redis_url.as_str())?;
        let channel = expired_channel(client.get_connection_info().redis.db);
        let pubsub = open_pubsub(&client, &channel).await?;

        tracing::info!(channel = %channel, "Subscribed to key expiry events");

        let (broadcast_tx, _) = broadcast::channel(config.broadcast_buffer);
        tokio::spawn(listener_loop(
            client,
            channel.clone(),
            pubsub,
            broadcast_tx.clone(),
            config.reconnect_delay,
            shutdown.clone(),
        ));

        Ok(Self {
            channel,
            broadcast_tx,
            shutdown,
        })
    }

    /// Get a receiver for expired keys
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<ExpiredKey> {
        self.broadcast_tx.subscribe()
    }

    /// The keyevent channel being listened to
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Stop the background listener
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for KeyspaceSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyspaceSubscriber")
            .field("channel", &self.channel)
            .field("receivers", &self.broadcast_tx.receiver_count())
            .finish()
    }
}

async fn open_pubsub(client: &Client, channel: &str) -> SubscriberResult<PubSub> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    Ok(pubsub)
}

async fn listener_loop(
    client: Client,
    channel: String,
    mut pubsub: PubSub,
    broadcast_tx: broadcast::Sender<ExpiredKey>,
    reconnect_delay: Duration,
    shutdown: CancellationToken,
) {
    loop {
        if forward_events(pubsub.into_on_message(), &broadcast_tx, &shutdown).await {
            tracing::info!(channel = %channel, "Key expiry subscriber shutting down");
            return;
        }

        tracing::warn!(channel = %channel, "Key expiry stream ended, reconnecting");
        pubsub = loop {
            tokio::select! {
                () = shutdown.cancelled() => return,
                () = tokio::time::sleep(reconnect_delay) => {}
            }
            match open_pubsub(&client, &channel).await {
                Ok(pubsub) => break pubsub,
                Err(e) => tracing::error!(error = %e, "Key expiry resubscribe failed"),
            }
        };
        tracing::info!(channel = %channel, "Key expiry subscriber reconnected");
    }
}

/// Forward messages until the stream ends (`false`) or shutdown is requested (`true`)
async fn forward_events(
    stream: impl Stream<Item = Msg>,
    broadcast_tx: &broadcast::Sender<ExpiredKey>,
    shutdown: &CancellationToken,
) -> bool {
    let mut stream = std::pin::pin!(stream);
    loop {
        tokio::select! {
            () = shutdown.cancelled() => return true,
            msg = stream.next() => {
                let Some(msg) = msg else {
                    return false;
                };
                match msg.get_payload::<String>() {
                    // No receivers is fine: nobody is interested yet
                    Ok(key) => {
                        tracing::trace!(key = %key, "Key expired");
                        let _ = broadcast_tx.send(ExpiredKey(key));
                    }
                    Err(e) => tracing::debug!(error = %e, "Ignoring undecodable expiry event"),
                }
            }
        }
    }
}

/// Make sure Redis publishes expiry events, keeping any flags already set
///
/// Returns the flags now in effect.
pub async fn enable_expiry_notifications(pool: &RedisPool) -> RedisResult<String> {
    let current = pool
        .config_get("notify-keyspace-events")
        .await?
        .unwrap_or_default();

    match merge_keyspace_flags(&current) {
        Some(flags) => {
            pool.config_set("notify-keyspace-events", &flags).await?;
            tracing::info!(flags = %flags, "Enabled key expiry notifications");
            Ok(flags)
        }
        None => Ok(current),
    }
}

/// Flags to set so that keyevent expiry notifications are on; `None` if they already are
fn merge_keyspace_flags(current: &str) -> Option<String> {
    let has_keyevent = current.contains('E');
    let has_expired = current.contains('x') || current.contains('A');
    if has_keyevent && has_expired {
        return None;
    }

    let mut flags = current.to_string();
    if !has_keyevent {
        flags.push('E');
    }
    if !has_expired {
        flags.push('x');
    }
    Some(flags)
}
