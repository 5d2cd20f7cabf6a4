//! Connection management
//!
//! Handles individual WebSocket connections and the registry of who is online.

mod connection;
mod registry;

pub use connection::{Connection, ConnectionId};
pub use registry::ConnectionRegistry;
