//! PostgreSQL implementation of MembershipResolver

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use relay_core::{DomainError, MembershipResolver, RepoResult, TargetKind};

use super::error::map_db_error;

/// Reads group and channel rosters
#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    /// Create a new PgMembershipRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipResolver for PgMembershipRepository {
    #[instrument(skip(self))]
    async fn list_members(&self, kind: TargetKind, target_id: &str) -> RepoResult<Vec<String>> {
        let sql = match kind {
            TargetKind::Group => "SELECT user_id FROM group_memberships WHERE group_id = $1",
            TargetKind::Channel => "SELECT user_id FROM channel_members WHERE channel_id = $1",
            TargetKind::User => {
                return Err(DomainError::InvalidTarget(
                    "direct messages have no membership".to_string(),
                ))
            }
        };

        sqlx::query_scalar::<_, String>(sql)
            .bind(target_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }
}
