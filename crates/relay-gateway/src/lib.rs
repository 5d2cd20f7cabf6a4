//! # relay-gateway
//!
//! WebSocket gateway for real-time message delivery.
//!
//! Each authenticated socket is registered under its user identity. Inbound
//! messages are staged through `relay-service`, fanned out to connected
//! recipients, and acknowledged to the author. The archival workers run
//! alongside the server for its whole lifetime.

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::{create_app, run, GatewayState};
