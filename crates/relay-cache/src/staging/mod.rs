//! Message staging store backed by Redis

mod message_store;

pub use message_store::{
    deadline_key, parse_record_key, record_key, RedisStagingStore, StagingSettings,
    MESSAGE_KEY_PREFIX,
};
