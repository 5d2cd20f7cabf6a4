//! Message database model

use chrono::{DateTime, Utc};
use relay_core::Reactions;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for messages table
#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: Uuid,
    pub author_id: String,
    pub target_id: String,
    pub target_type: String,
    pub content: String,
    pub attachments: Option<serde_json::Value>,
    pub reactions: Json<Reactions>,
    pub created_at: DateTime<Utc>,
}
