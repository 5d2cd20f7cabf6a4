//! Redis keyspace notifications
//!
//! Redis only publishes expiry events when `notify-keyspace-events` contains
//! `E` (keyevent channel) and `x` (expired events), or `A` which includes `x`.

mod subscriber;

pub use subscriber::{
    enable_expiry_notifications, expired_channel, ExpiredKey, KeyspaceSubscriber,
    SubscriberConfig, SubscriberError, SubscriberResult,
};
