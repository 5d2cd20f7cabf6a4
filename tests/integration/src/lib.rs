//! Integration test utilities for the relay
//!
//! This crate provides helpers for running end-to-end tests against
//! the REST API and WebSocket gateway. Servers run on ephemeral ports
//! over in-memory stores unless a test opts into live backends.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
