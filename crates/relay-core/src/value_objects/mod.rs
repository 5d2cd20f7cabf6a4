//! Value objects - immutable, identity-less domain types

mod message_id;

pub use message_id::{MessageId, MessageIdParseError};
