//! # relay-db
//!
//! Database layer implementing the archival and membership ports with PostgreSQL via SQLx.
//!
//! ## Overview
//!
//! - Connection pool management
//! - Row models with SQLx `FromRow` derives and entity mappers
//! - `PgMessageRepository`: the durable store of record for messages
//! - `PgMembershipRepository`: group and channel membership lookups
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_db::{create_pool, DatabaseConfig, PgMessageRepository};
//! use relay_core::MessageArchive;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&DatabaseConfig::from_env()).await?;
//!     let archive = PgMessageRepository::new(pool);
//!     let history = archive.find_between_users("alice", "bob").await?;
//!     Ok(())
//! }
//! ```
//!
//! The schema (`messages`, `group_memberships`, `channel_members`) is owned by
//! the platform's migration tooling, not by this crate.

pub mod mappers;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, DatabaseConfig, PgPool};
pub use repositories::{PgMembershipRepository, PgMessageRepository};
