//! Repository implementations
//!
//! PostgreSQL implementations of the ports defined in relay-core.

mod error;
mod membership;
mod message;

pub use membership::PgMembershipRepository;
pub use message::PgMessageRepository;
