//! Test fixtures and data generators

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::Utc;
use relay_core::{Message, TargetKind};
use serde_json::{json, Value};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Secret shared by every test server and token
pub const TEST_JWT_SECRET: &str = "integration-test-secret-that-is-long-enough";

/// Archival threshold used by test servers
pub const TEST_ARCHIVE_AFTER: Duration = Duration::from_secs(180);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// A user id no other test uses
pub fn unique_user(prefix: &str) -> String {
    format!("{prefix}-{}", unique_suffix())
}

/// Send frame for a direct message
pub fn direct_frame(to: &str, content: &str) -> Value {
    json!({ "target_id": to, "target_type": "user", "content": content })
}

/// Send frame for a group or channel message
pub fn target_frame(kind: TargetKind, target_id: &str, content: &str) -> Value {
    json!({ "target_id": target_id, "target_type": kind.as_str(), "content": content })
}

/// An already archived message `age_secs` old
pub fn archived_message(
    author: &str,
    kind: TargetKind,
    target_id: &str,
    content: &str,
    age_secs: i64,
) -> Message {
    let mut message = Message::new(author, kind, target_id, content);
    message.created_at = Utc::now() - chrono::Duration::seconds(age_secs);
    message
}
