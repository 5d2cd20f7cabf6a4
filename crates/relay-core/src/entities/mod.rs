//! Domain entities - core business objects

mod message;
mod reactions;

pub use message::{Message, TargetKind, TargetKindParseError, MAX_CONTENT_LENGTH};
pub use reactions::Reactions;
