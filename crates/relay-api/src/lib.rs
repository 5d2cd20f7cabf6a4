//! # relay-api
//!
//! REST API over the message archive: history queries, the caller's direct
//! conversations, reactions, and health probes.

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;
pub mod state;

pub use server::{create_app, run};
pub use state::AppState;
