//! Request DTOs for the WebSocket and REST surfaces
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.

use relay_core::{MessageId, TargetKind};
use serde::Deserialize;
use validator::Validate;

// ============================================================================
// Message Requests
// ============================================================================

/// Inbound frame asking the relay to deliver a message
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 128, message = "target_id must be 1-128 characters"))]
    pub target_id: String,

    pub target_type: TargetKind,

    #[serde(default)]
    #[validate(length(max = 4000, message = "content must be at most 4000 characters"))]
    pub content: String,

    /// Opaque structured payload stored alongside the text
    #[serde(default)]
    pub attachments: Option<serde_json::Value>,
}

/// Add a reaction to a staged or archived message
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddReactionRequest {
    pub message_id: MessageId,

    #[validate(length(min = 1, max = 64, message = "reaction must be 1-64 characters"))]
    pub reaction: String,
}

// ============================================================================
// History Requests
// ============================================================================

/// Query string for archived history
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct HistoryQuery {
    #[validate(length(min = 1, max = 128, message = "target_id must be 1-128 characters"))]
    pub target_id: String,

    pub target_type: TargetKind,
}
