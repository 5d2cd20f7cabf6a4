//! Message fan-out to live connections

use crate::connection::{Connection, ConnectionRegistry};
use relay_core::{MembershipResolver, Message, TargetKind};
use relay_service::Envelope;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, instrument, warn};

/// Per-message delivery outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipients resolved, excluding the author
    pub recipients: usize,
    /// Recipients whose queue accepted the message
    pub delivered: usize,
    /// Recipients with no live connection
    pub offline: usize,
    /// Recipients whose queue was full or closed
    pub failed: usize,
    /// Whether the membership lookup for a group or channel failed
    pub membership_failed: bool,
}

/// Delivers staged messages to connected recipients and acknowledges the author
///
/// Live delivery is best effort: an offline or stalled recipient never affects
/// anyone else, and the author is acknowledged regardless.
pub struct FanOutDispatcher {
    registry: Arc<ConnectionRegistry>,
    membership: Arc<dyn MembershipResolver>,
}

impl FanOutDispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>, membership: Arc<dyn MembershipResolver>) -> Self {
        Self {
            registry,
            membership,
        }
    }

    /// Deliver `message` to its recipients, then acknowledge it to `sender`
    ///
    /// Only call this for a message that has already been staged.
    #[instrument(skip_all, fields(message_id = %message.id, target_type = %message.target_type))]
    pub async fn dispatch(&self, message: &Message, sender: &Connection) -> DeliveryReport {
        let report = self.deliver(message, sender.user_id()).await;

        if sender.send(Envelope::sent(message.clone())).await.is_err() {
            debug!(user_id = %sender.user_id(), "Author disconnected before acknowledgement");
        }

        debug!(
            recipients = report.recipients,
            delivered = report.delivered,
            offline = report.offline,
            failed = report.failed,
            "Message dispatched"
        );
        report
    }

    /// Push `message` to every resolved recipient other than `author_id`
    pub async fn deliver(&self, message: &Message, author_id: &str) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        let candidates = match message.target_type {
            TargetKind::User => vec![message.target_id.clone()],
            kind @ (TargetKind::Group | TargetKind::Channel) => {
                match self.membership.list_members(kind, &message.target_id).await {
                    Ok(members) => members,
                    Err(e) => {
                        warn!(
                            target_id = %message.target_id,
                            error = %e,
                            "Failed to resolve members"
                        );
                        report.membership_failed = true;
                        Vec::new()
                    }
                }
            }
        };

        let mut seen = HashSet::new();
        for user_id in &candidates {
            if user_id == author_id || !seen.insert(user_id.as_str()) {
                continue;
            }
            report.recipients += 1;

            let Some(connection) = self.registry.lookup(user_id) else {
                report.offline += 1;
                continue;
            };

            match connection.try_send(Envelope::delivered(message.clone())) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(user_id = %user_id, "Recipient queue full, dropping delivery");
                    report.failed += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(user_id = %user_id, "Recipient connection closed");
                    report.failed += 1;
                }
            }
        }

        report
    }
}

impl std::fmt::Debug for FanOutDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutDispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
