//! Ports implemented by the infrastructure crates

mod stores;

pub use stores::{MembershipResolver, MessageArchive, RepoResult, StagingStore};
