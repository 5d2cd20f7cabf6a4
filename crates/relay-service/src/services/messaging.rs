//! Messaging service
//!
//! Owns the boundary between the staging store and the archive:
//! - `send_message` validates and stages a new message
//! - `add_reaction` mutates reactions wherever the message currently lives
//! - `transfer_expired_messages` moves aged messages to the archive
//! - history reads go to the archive only

use chrono::{DateTime, Utc};
use relay_core::{Message, MessageId, TargetKind};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use crate::dto::SendMessageRequest;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Upserts tried for one record before a pass gives up on a record that keeps changing
const MAX_ARCHIVE_ATTEMPTS: usize = 3;

/// Outcome of one pass over the staging store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    /// Staged records examined
    pub scanned: usize,
    /// Records written to the archive and removed from staging
    pub archived: usize,
    /// Records still younger than the threshold
    pub pending: usize,
    /// Records left in place because a read or archive write failed, or
    /// because they kept changing while being archived
    pub failed: usize,
}

impl TransferReport {
    /// Whether the pass changed nothing and hit no errors
    pub fn is_idle(&self) -> bool {
        self.archived == 0 && self.failed == 0
    }
}

/// Messaging service
pub struct MessagingService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessagingService<'a> {
    /// Create a new MessagingService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Assign an ID and timestamp to an inbound message and stage it
    ///
    /// Delivery is the caller's job, and must only happen once this returns `Ok`.
    #[instrument(skip(self, request), fields(target_type = %request.target_type))]
    pub async fn send_message(
        &self,
        author_id: &str,
        request: SendMessageRequest,
    ) -> ServiceResult<Message> {
        request.validate()?;

        let mut message = Message::new(
            author_id,
            request.target_type,
            request.target_id,
            request.content,
        );
        if let Some(attachments) = request.attachments {
            message = message.with_attachments(attachments);
        }
        message.validate()?;

        self.ctx.staging().stage(&message).await?;

        info!(message_id = %message.id, target_id = %message.target_id, "Message staged");
        Ok(message)
    }

    /// Record that `user_id` reacted to a message with `symbol`
    ///
    /// Repeating a reaction is a no-op. Staged messages are updated in place
    /// (refreshing their TTL); once a message has been archived the archived row
    /// is updated instead.
    #[instrument(skip(self))]
    pub async fn add_reaction(
        &self,
        message_id: MessageId,
        symbol: &str,
        user_id: &str,
    ) -> ServiceResult<()> {
        if symbol.trim().is_empty() {
            return Err(ServiceError::validation("reaction is required"));
        }

        if let Some(mut message) = self.ctx.staging().load(message_id).await? {
            if !message.reactions.add(symbol, user_id) {
                debug!("Reaction already present");
                return Ok(());
            }
            if self.ctx.staging().replace(&message).await? {
                debug!("Reaction added to staged message");
                return Ok(());
            }
            // Archived between our read and write; the archive holds it now
            debug!("Message left staging mid-update, retrying against archive");
        }

        let mut message = self
            .ctx
            .archive()
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Message", message_id.to_string()))?;

        if !message.reactions.add(symbol, user_id) {
            debug!("Reaction already present");
            return Ok(());
        }
        if !self
            .ctx
            .archive()
            .update_reactions(message_id, &message.reactions)
            .await?
        {
            return Err(ServiceError::not_found("Message", message_id.to_string()));
        }

        debug!("Reaction added to archived message");
        Ok(())
    }

    /// Move every staged message older than the archival threshold to the archive
    pub async fn transfer_expired_messages(&self) -> ServiceResult<TransferReport> {
        self.transfer_expired_messages_at(Utc::now()).await
    }

    /// Same as [`Self::transfer_expired_messages`], measuring ages against `now`
    ///
    /// A record is archived before it is removed from staging, so a crash in
    /// between leaves it in both places; the next pass re-archives it, which the
    /// archive's upsert absorbs. Removal only happens if the staged record is
    /// still the one that was archived, so a reaction written in between is
    /// archived too. Records that cannot be read or archived stay staged, with
    /// their TTL restarted, for the next pass.
    #[instrument(skip(self))]
    pub async fn transfer_expired_messages_at(
        &self,
        now: DateTime<Utc>,
    ) -> ServiceResult<TransferReport> {
        let threshold = self.ctx.archive_after();
        let ids = self.ctx.staging().staged_ids().await?;

        let mut report = TransferReport {
            scanned: ids.len(),
            ..TransferReport::default()
        };

        for id in ids {
            let message = match self.ctx.staging().load(id).await {
                Ok(Some(message)) => message,
                // Moved by a concurrent pass or expired
                Ok(None) => continue,
                Err(e) => {
                    warn!(message_id = %id, error = %e, "Skipping unreadable staged message");
                    report.failed += 1;
                    continue;
                }
            };

            // A timestamp ahead of `now` counts as age zero
            let old_enough = message
                .age_at(now)
                .to_std()
                .is_ok_and(|age| age >= threshold);
            if !old_enough {
                report.pending += 1;
                continue;
            }

            if self.archive_staged(message).await {
                report.archived += 1;
            } else {
                report.failed += 1;
            }
        }

        if report.is_idle() {
            debug!(scanned = report.scanned, pending = report.pending, "Nothing to archive");
        } else {
            info!(
                scanned = report.scanned,
                archived = report.archived,
                pending = report.pending,
                failed = report.failed,
                "Transferred expired messages"
            );
        }

        Ok(report)
    }

    /// Archive one staged record and unstage it; `false` if it stays staged
    async fn archive_staged(&self, mut message: Message) -> bool {
        let id = message.id;

        for _ in 0..MAX_ARCHIVE_ATTEMPTS {
            if let Err(e) = self.ctx.archive().upsert(&message).await {
                error!(message_id = %id, error = %e, "Failed to archive message");
                self.keep_staged(id).await;
                return false;
            }

            match self.ctx.staging().remove_if_unchanged(&message).await {
                Ok(true) => return true,
                Ok(false) => {}
                Err(e) => {
                    // Archived already; the next pass will upsert it again and retry the delete
                    warn!(message_id = %id, error = %e, "Archived message could not be unstaged");
                    return true;
                }
            }

            message = match self.ctx.staging().load(id).await {
                Ok(Some(updated)) => {
                    debug!(message_id = %id, "Staged message changed, archiving again");
                    updated
                }
                // Unstaged by a concurrent pass
                Ok(None) => return true,
                Err(e) => {
                    warn!(message_id = %id, error = %e, "Changed message could not be re-read");
                    self.keep_staged(id).await;
                    return false;
                }
            };
        }

        warn!(
            message_id = %id,
            attempts = MAX_ARCHIVE_ATTEMPTS,
            "Staged message kept changing, leaving it for the next pass"
        );
        self.keep_staged(id).await;
        false
    }

    /// Restart the staging TTL of a record the pass could not archive
    async fn keep_staged(&self, id: MessageId) {
        match self.ctx.staging().retain(id).await {
            Ok(true) => debug!(message_id = %id, "Staging TTL restarted"),
            Ok(false) => warn!(message_id = %id, "Message left staging before it was archived"),
            Err(e) => warn!(message_id = %id, error = %e, "Failed to restart staging TTL"),
        }
    }

    // === History ===

    /// Archived messages posted to a channel, oldest first
    #[instrument(skip(self))]
    pub async fn get_channel_history(&self, channel_id: &str) -> ServiceResult<Vec<Message>> {
        Ok(self
            .ctx
            .archive()
            .find_by_target(TargetKind::Channel, channel_id)
            .await?)
    }

    /// Archived messages posted to a group, oldest first
    #[instrument(skip(self))]
    pub async fn get_group_history(&self, group_id: &str) -> ServiceResult<Vec<Message>> {
        Ok(self
            .ctx
            .archive()
            .find_by_target(TargetKind::Group, group_id)
            .await?)
    }

    /// Archived direct messages between two users, oldest first
    #[instrument(skip(self))]
    pub async fn get_messages_between_users(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> ServiceResult<Vec<Message>> {
        Ok(self.ctx.archive().find_between_users(user_a, user_b).await?)
    }

    /// Archived messages the user authored, plus direct messages addressed to them, oldest first
    #[instrument(skip(self))]
    pub async fn get_user_conversations(&self, user_id: &str) -> ServiceResult<Vec<Message>> {
        Ok(self.ctx.archive().find_for_user(user_id).await?)
    }

    /// History for a target as seen by `viewer_id`
    ///
    /// For a user target this is the direct conversation between the viewer and
    /// that user; for groups and channels it is everything posted there.
    pub async fn get_history(
        &self,
        viewer_id: &str,
        target_type: TargetKind,
        target_id: &str,
    ) -> ServiceResult<Vec<Message>> {
        match target_type {
            TargetKind::User => self.get_messages_between_users(viewer_id, target_id).await,
            TargetKind::Group => self.get_group_history(target_id).await,
            TargetKind::Channel => self.get_channel_history(target_id).await,
        }
    }
}
