//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::MessageId;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Content too long: max {max} characters")]
    ContentTooLong { max: usize },

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Corrupt staging record {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Membership lookup failed: {0}")]
    MembershipError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::MessageNotFound(_) => "UNKNOWN_MESSAGE",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidTarget(_) => "INVALID_TARGET",
            Self::ContentTooLong { .. } => "CONTENT_TOO_LONG",
            Self::CorruptRecord { .. } => "CORRUPT_RECORD",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::CacheError(_) => "CACHE_ERROR",
            Self::MembershipError(_) => "MEMBERSHIP_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::MessageNotFound(_))
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::InvalidTarget(_) | Self::ContentTooLong { .. }
        )
    }

    /// Check if this error came from a backing store rather than the caller
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            Self::CorruptRecord { .. }
                | Self::DatabaseError(_)
                | Self::CacheError(_)
                | Self::MembershipError(_)
                | Self::InternalError(_)
        )
    }
}
