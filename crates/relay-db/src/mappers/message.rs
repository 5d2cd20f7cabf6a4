//! Message entity <-> model mapper

use relay_core::{DomainError, Message, MessageId, TargetKind};

use crate::models::MessageModel;

/// Convert MessageModel to Message entity
///
/// Fails if the row carries a target type this service does not know about.
impl TryFrom<MessageModel> for Message {
    type Error = DomainError;

    fn try_from(model: MessageModel) -> Result<Self, Self::Error> {
        let target_type = model
            .target_type
            .parse::<TargetKind>()
            .map_err(|e| DomainError::DatabaseError(format!("message {}: {e}", model.id)))?;

        Ok(Message {
            id: MessageId::from_uuid(model.id),
            author_id: model.author_id,
            target_id: model.target_id,
            target_type,
            content: model.content,
            attachments: model.attachments,
            reactions: model.reactions.0,
            created_at: model.created_at,
        })
    }
}
