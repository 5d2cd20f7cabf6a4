//! Business logic services
//!
//! Each service borrows the `ServiceContext` for the duration of a call.

mod context;
mod error;
mod messaging;

pub use context::{ServiceContext, ServiceContextBuilder, DEFAULT_ARCHIVE_AFTER};
pub use error::{describe_validation_errors, ServiceError, ServiceResult};
pub use messaging::{MessagingService, TransferReport};
