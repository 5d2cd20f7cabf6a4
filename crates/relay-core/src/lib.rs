//! # relay-core
//!
//! Domain layer for the message relay: the `Message` entity and its reaction set,
//! domain errors, and the ports implemented by the staging store, the archival
//! store and the membership collaborator.
//! This crate has zero dependencies on infrastructure (database, cache, web framework).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{Message, Reactions, TargetKind, TargetKindParseError, MAX_CONTENT_LENGTH};
pub use error::DomainError;
pub use traits::{MembershipResolver, MessageArchive, RepoResult, StagingStore};
pub use value_objects::{MessageId, MessageIdParseError};
