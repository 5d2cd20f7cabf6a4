//! # relay-service
//!
//! Application layer: the messaging pipeline that stages messages in the cache
//! and later moves them to the database, the DTOs exchanged with clients, and the
//! background workers that drive archival.

pub mod dto;
pub mod services;
pub mod workers;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use dto::{
    AddReactionRequest, Envelope, HealthResponse, HistoryQuery, ReadinessResponse,
    SendMessageRequest,
};
pub use services::{
    describe_validation_errors, MessagingService, ServiceContext, ServiceContextBuilder,
    ServiceError, ServiceResult, TransferReport,
};
pub use workers::{ExpiryListener, ExpirySweeper};
