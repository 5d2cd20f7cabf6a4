//! Response DTOs
//!
//! Every reply the relay sends, over the socket or over HTTP, is wrapped in an
//! [`Envelope`] carrying a numeric status code and a short description.

use chrono::{DateTime, Utc};
use relay_core::Message;
use serde::{Deserialize, Serialize};

// ============================================================================
// Envelope
// ============================================================================

/// Acknowledgement sent to the author after staging succeeded
pub const MESSAGE_SENT: &str = "Message sent";
/// Delivery notice sent to each recipient
pub const MESSAGE_RECEIVED: &str = "New message received";
/// Staging failed; the message was not accepted
pub const SEND_FAILED: &str = "Failed to send message";
/// The inbound frame could not be parsed or failed validation
pub const INVALID_MESSAGE: &str = "Invalid message";

/// Uniform reply wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T = Message> {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Successful reply carrying a payload
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            code: 200,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    /// Error reply with a status code and detail text
    pub fn error(code: u16, message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
            error: Some(error.into()),
        }
    }

    /// Successful reply with no payload
    pub fn notice(message: impl Into<String>) -> Self {
        Self {
            code: 200,
            message: message.into(),
            data: None,
            error: None,
        }
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl Envelope<Message> {
    /// Acknowledgement to the author
    pub fn sent(message: Message) -> Self {
        Self::ok(MESSAGE_SENT, message)
    }

    /// Delivery to a recipient
    pub fn delivered(message: Message) -> Self {
        Self::ok(MESSAGE_RECEIVED, message)
    }

    /// Staging failed
    pub fn send_failed(error: impl Into<String>) -> Self {
        Self::error(500, SEND_FAILED, error)
    }

    /// Malformed or invalid inbound frame
    pub fn invalid(error: impl Into<String>) -> Self {
        Self::error(400, INVALID_MESSAGE, error)
    }
}

// ============================================================================
// Health Responses
// ============================================================================

/// Basic health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub checks: HealthChecks,
}

/// Health of each backing store
#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub database: String,
    pub redis: String,
}

fn label(healthy: bool) -> String {
    if healthy { "healthy" } else { "unhealthy" }.to_string()
}

impl ReadinessResponse {
    pub fn ready(database_healthy: bool, redis_healthy: bool) -> Self {
        let all_healthy = database_healthy && redis_healthy;
        Self {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            timestamp: Utc::now(),
            checks: HealthChecks {
                database: label(database_healthy),
                redis: label(redis_healthy),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }
}
