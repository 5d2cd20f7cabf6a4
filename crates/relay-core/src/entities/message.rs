//! Message entity - a unit of conversation addressed to a user, group or channel

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::Reactions;
use crate::error::DomainError;
use crate::value_objects::MessageId;

/// Maximum content length in characters
pub const MAX_CONTENT_LENGTH: usize = 4000;

/// Where a message is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Direct message to a single user
    User,
    /// Every member of a group
    Group,
    /// Every member of a channel
    Channel,
}

impl TargetKind {
    /// Wire/storage representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Channel => "channel",
        }
    }

    /// Whether delivery requires resolving a membership set
    #[inline]
    pub const fn is_multicast(self) -> bool {
        matches!(self, Self::Group | Self::Channel)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing a TargetKind from string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown target type: {0}")]
pub struct TargetKindParseError(pub String);

impl std::str::FromStr for TargetKind {
    type Err = TargetKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "group" => Ok(Self::Group),
            "channel" => Ok(Self::Channel),
            other => Err(TargetKindParseError(other.to_string())),
        }
    }
}

/// Message entity
///
/// This is also the staging record format: the JSON form of this struct is what
/// sits in the staging store until the message is archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author_id: String,
    pub target_id: String,
    pub target_type: TargetKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<serde_json::Value>,
    #[serde(default)]
    pub reactions: Reactions,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a new message with a fresh ID and the current server time
    pub fn new(
        author_id: impl Into<String>,
        target_type: TargetKind,
        target_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            author_id: author_id.into(),
            target_id: target_id.into(),
            target_type,
            content: content.into(),
            attachments: None,
            reactions: Reactions::default(),
            created_at: Utc::now(),
        }
    }

    /// Attach an opaque structured payload
    pub fn with_attachments(mut self, attachments: serde_json::Value) -> Self {
        self.attachments = Some(attachments).filter(|v| !v.is_null());
        self
    }

    /// Check the addressing and content rules
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.author_id.trim().is_empty() {
            return Err(DomainError::ValidationError("author_id is required".to_string()));
        }
        if self.target_id.trim().is_empty() {
            return Err(DomainError::InvalidTarget(format!(
                "{} target requires a target_id",
                self.target_type
            )));
        }
        if self.content.chars().count() > MAX_CONTENT_LENGTH {
            return Err(DomainError::ContentTooLong {
                max: MAX_CONTENT_LENGTH,
            });
        }
        if self.is_empty() {
            return Err(DomainError::ValidationError(
                "message needs content or attachments".to_string(),
            ));
        }
        Ok(())
    }

    /// Age of the message relative to `now`
    #[inline]
    pub fn age_at(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }

    /// Whether the message has no text and no attachments
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.attachments.is_none()
    }

    /// Whether `user_id` takes part in this message as author or direct recipient
    pub fn involves_user(&self, user_id: &str) -> bool {
        self.author_id == user_id
            || (self.target_type == TargetKind::User && self.target_id == user_id)
    }
}
