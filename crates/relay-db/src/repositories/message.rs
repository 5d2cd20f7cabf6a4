//! PostgreSQL implementation of MessageArchive

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::instrument;

use relay_core::{Message, MessageArchive, MessageId, Reactions, RepoResult, TargetKind};

use crate::models::MessageModel;

use super::error::{into_messages, map_db_error};

const SELECT_COLUMNS: &str =
    "SELECT id, author_id, target_id, target_type, content, attachments, reactions, created_at FROM messages";

/// PostgreSQL implementation of MessageArchive
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Create a new PgMessageRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_many(&self, sql: &str, binds: &[&str]) -> RepoResult<Vec<Message>> {
        let mut query = sqlx::query_as::<_, MessageModel>(sql);
        for value in binds {
            query = query.bind(*value);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(map_db_error)?;
        into_messages(rows)
    }
}

#[async_trait]
impl MessageArchive for PgMessageRepository {
    // A re-migrated record (crash between archive and staging delete, or a
    // reaction applied after the first copy) only ever changes reactions.
    #[instrument(skip(self, message), fields(message_id = %message.id))]
    async fn upsert(&self, message: &Message) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, author_id, target_id, target_type, content, attachments, reactions, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET reactions = EXCLUDED.reactions
            "#,
        )
        .bind(message.id.into_inner())
        .bind(&message.author_id)
        .bind(&message.target_id)
        .bind(message.target_type.as_str())
        .bind(&message.content)
        .bind(message.attachments.as_ref())
        .bind(Json(&message.reactions))
        .bind(message.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: MessageId) -> RepoResult<Option<Message>> {
        let row = sqlx::query_as::<_, MessageModel>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        row.map(Message::try_from).transpose()
    }

    #[instrument(skip(self, reactions))]
    async fn update_reactions(&self, id: MessageId, reactions: &Reactions) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET reactions = $2
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .bind(Json(reactions))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn find_by_target(&self, kind: TargetKind, target_id: &str) -> RepoResult<Vec<Message>> {
        self.fetch_many(
            &format!(
                "{SELECT_COLUMNS} WHERE target_type = $1 AND target_id = $2 ORDER BY created_at ASC"
            ),
            &[kind.as_str(), target_id],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn find_between_users(&self, user_a: &str, user_b: &str) -> RepoResult<Vec<Message>> {
        self.fetch_many(
            &format!(
                "{SELECT_COLUMNS} \
                 WHERE target_type = 'user' \
                   AND ((author_id = $1 AND target_id = $2) OR (author_id = $2 AND target_id = $1)) \
                 ORDER BY created_at ASC"
            ),
            &[user_a, user_b],
        )
        .await
    }

    #[instrument(skip(self))]
    async fn find_for_user(&self, user_id: &str) -> RepoResult<Vec<Message>> {
        self.fetch_many(
            &format!(
                "{SELECT_COLUMNS} \
                 WHERE author_id = $1 OR (target_type = 'user' AND target_id = $1) \
                 ORDER BY created_at ASC"
            ),
            &[user_id],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgMessageRepository>();
    }

    #[test]
    fn test_select_columns_match_model() {
        for column in [
            "id", "author_id", "target_id", "target_type", "content", "attachments", "reactions",
            "created_at",
        ] {
            assert!(SELECT_COLUMNS.contains(column), "missing {column}");
        }
    }
}
