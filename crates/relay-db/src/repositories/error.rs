//! Error handling utilities for repositories

use relay_core::{DomainError, Message};
use sqlx::Error as SqlxError;

use crate::models::MessageModel;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Map a batch of rows, failing on the first row that cannot be converted
pub fn into_messages(rows: Vec<MessageModel>) -> Result<Vec<Message>, DomainError> {
    rows.into_iter().map(Message::try_from).collect()
}
