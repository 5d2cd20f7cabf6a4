//! Wire frames
//!
//! Inbound send requests are JSON text frames; every outbound frame is an
//! encoded `Envelope`.

use relay_service::services::describe_validation_errors;
use relay_service::{Envelope, SendMessageRequest};
use thiserror::Error;
use validator::Validate;

/// Why an inbound frame was rejected
#[derive(Debug, Error)]
pub enum FrameError {
    /// Not JSON, or JSON of the wrong shape
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Well-formed but fails field validation
    #[error("{0}")]
    Invalid(String),

    /// Binary frames are not part of the protocol
    #[error("binary frames are not supported")]
    Binary,
}

/// Parse and validate an inbound text frame
pub fn decode_send_request(text: &str) -> Result<SendMessageRequest, FrameError> {
    let request: SendMessageRequest = serde_json::from_str(text)?;
    request
        .validate()
        .map_err(|e| FrameError::Invalid(describe_validation_errors(&e)))?;

    if request.content.trim().is_empty()
        && request.attachments.as_ref().is_none_or(serde_json::Value::is_null)
    {
        return Err(FrameError::Invalid(
            "message needs content or attachments".to_string(),
        ));
    }

    Ok(request)
}

/// Serialize an outbound envelope
pub fn encode_envelope(envelope: &Envelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}
