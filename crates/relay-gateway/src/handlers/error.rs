//! Handler error types

use crate::protocol::FrameError;
use relay_service::{Envelope, ServiceError};
use thiserror::Error;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The frame could not be decoded or validated
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Staging the message failed
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl HandlerError {
    /// Whether the client is at fault
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Frame(_) => true,
            Self::Service(e) => e.is_client_error(),
        }
    }

    /// Envelope reporting this error to the author
    pub fn to_envelope(&self) -> Envelope {
        if self.is_client_error() {
            Envelope::invalid(self.to_string())
        } else {
            Envelope::send_failed(self.to_string())
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
