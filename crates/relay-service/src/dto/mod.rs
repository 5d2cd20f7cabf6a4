//! Data transfer objects
//!
//! - Request DTOs with validation for inbound frames and API inputs
//! - The response envelope shared by the WebSocket and REST surfaces

pub mod requests;
pub mod responses;

pub use requests::{AddReactionRequest, HistoryQuery, SendMessageRequest};
pub use responses::{Envelope, HealthChecks, HealthResponse, ReadinessResponse};
