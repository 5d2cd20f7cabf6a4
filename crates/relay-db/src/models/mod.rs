//! Database row models

mod message;

pub use message::MessageModel;
