//! REST API and staging-to-archive pipeline tests
//!
//! Most tests run over in-memory stores. Tests named `test_live_*` need:
//! - Running PostgreSQL instance
//! - Running Redis instance
//! - Environment variables: DATABASE_URL, REDIS_URL, JWT_SECRET
//!
//! Run with: cargo test -p integration-tests --test api_tests

use chrono::Utc;
use integration_tests::{
    archived_message, assert_json, assert_status, check_test_env, direct_frame, next_envelope,
    send_frame, test_config, token_for, unique_user, TestGateway, TestServer, TEST_ARCHIVE_AFTER,
};
use relay_core::{Message, MessageId, TargetKind};
use relay_service::{Envelope, MessagingService};
use reqwest::StatusCode;
use serde_json::json;

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health").await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_health_ready() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health/ready").await.unwrap();
    let body: serde_json::Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = TestServer::start().await.unwrap();
    let response = server.get("/health").await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// ============================================================================
// History Tests
// ============================================================================

#[tokio::test]
async fn test_history_requires_auth() {
    let server = TestServer::start().await.unwrap();
    let response = server
        .get("/api/v1/messages/history?target_id=bob&target_type=user")
        .await
        .unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_history_is_ordered_oldest_first() {
    let server = TestServer::start().await.unwrap();
    let alice = unique_user("alice");
    let bob = unique_user("bob");

    server
        .backends
        .archive
        .insert(archived_message(&bob, TargetKind::User, &alice, "reply", 300));
    server
        .backends
        .archive
        .insert(archived_message(&alice, TargetKind::User, &bob, "opener", 600));

    let response = server
        .get_auth(
            &format!("/api/v1/messages/history?target_id={bob}&target_type=user"),
            &token_for(&alice),
        )
        .await
        .unwrap();
    let envelope: Envelope<Vec<Message>> = assert_json(response, StatusCode::OK).await.unwrap();

    let contents: Vec<_> = envelope
        .data
        .unwrap()
        .into_iter()
        .map(|m| m.content)
        .collect();
    assert_eq!(contents, vec!["opener", "reply"]);
}

// ============================================================================
// Reaction Tests
// ============================================================================

#[tokio::test]
async fn test_reaction_is_idempotent() {
    let server = TestServer::start().await.unwrap();
    let message = archived_message("alice", TargetKind::Group, "g1", "vote", 600);
    server.backends.archive.insert(message.clone());

    let token = token_for("bob");
    let body = json!({ "message_id": message.id, "reaction": "👍" });
    for _ in 0..2 {
        let response = server
            .post_auth("/api/v1/messages/reaction", &token, &body)
            .await
            .unwrap();
        assert_status(response, StatusCode::OK).await.unwrap();
    }

    let stored = server.backends.archive.get(message.id).unwrap();
    assert_eq!(stored.reactions.count("👍"), 1);
}

#[tokio::test]
async fn test_reaction_on_unknown_message() {
    let server = TestServer::start().await.unwrap();
    let body = json!({ "message_id": MessageId::generate(), "reaction": "👍" });

    let response = server
        .post_auth("/api/v1/messages/reaction", &token_for("bob"), &body)
        .await
        .unwrap();
    let envelope: Envelope<()> = assert_json(response, StatusCode::NOT_FOUND).await.unwrap();
    assert_eq!(envelope.code, 404);
}

// ============================================================================
// Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_sent_message_reaches_history_after_transfer() {
    let gateway = TestGateway::start().await.unwrap();
    let server = TestServer::start_with_backends(gateway.backends.clone())
        .await
        .unwrap();
    let alice = unique_user("alice");
    let bob = unique_user("bob");

    let mut alice_ws = gateway.connect(&alice).await.unwrap();
    send_frame(&mut alice_ws, &direct_frame(&bob, "archive me"))
        .await
        .unwrap();
    let sent = next_envelope::<Message>(&mut alice_ws)
        .await
        .unwrap()
        .data
        .unwrap();

    let history_path = format!("/api/v1/messages/history?target_id={alice}&target_type=user");

    // Still staged: the archive does not have it yet
    let response = server
        .get_auth(&history_path, &token_for(&bob))
        .await
        .unwrap();
    let envelope: Envelope<Vec<Message>> = assert_json(response, StatusCode::OK).await.unwrap();
    assert!(envelope.data.unwrap().is_empty());

    // A reaction while staged lands on the staged record
    let reaction = json!({ "message_id": sent.id, "reaction": "❤️" });
    let response = server
        .post_auth("/api/v1/messages/reaction", &token_for(&bob), &reaction)
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let later = Utc::now() + chrono::Duration::from_std(TEST_ARCHIVE_AFTER).unwrap();
    let report = MessagingService::new(gateway.state.service_context())
        .transfer_expired_messages_at(later + chrono::Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(report.archived, 1);
    assert!(!gateway.backends.staging.contains(sent.id));

    let response = server
        .get_auth(&history_path, &token_for(&bob))
        .await
        .unwrap();
    let envelope: Envelope<Vec<Message>> = assert_json(response, StatusCode::OK).await.unwrap();
    let history = envelope.data.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, sent.id);
    assert!(history[0].reactions.contains("❤️", &bob));
}

#[tokio::test]
async fn test_young_messages_are_not_transferred() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = unique_user("alice");

    let mut alice_ws = gateway.connect(&alice).await.unwrap();
    send_frame(&mut alice_ws, &direct_frame("bob", "too fresh"))
        .await
        .unwrap();
    next_envelope::<Message>(&mut alice_ws).await.unwrap();

    let report = MessagingService::new(gateway.state.service_context())
        .transfer_expired_messages()
        .await
        .unwrap();
    assert_eq!(report.archived, 0);
    assert_eq!(report.pending, 1);
    assert!(gateway.backends.archive.is_empty());
}

// ============================================================================
// Live Backend Tests
// ============================================================================

#[tokio::test]
async fn test_live_health_ready() {
    if !check_test_env() {
        return;
    }

    let config = test_config().unwrap();
    let server = TestServer::start_live(&config).await.unwrap();
    let response = server.get("/health/ready").await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_live_unknown_message_reaction() {
    if !check_test_env() {
        return;
    }

    let config = test_config().unwrap();
    let server = TestServer::start_live(&config).await.unwrap();
    let token = relay_common::JwtService::new(&config.jwt.secret, 900)
        .issue_access_token("live-tester")
        .unwrap();

    let body = json!({ "message_id": MessageId::generate(), "reaction": "👍" });
    let response = server
        .post_auth("/api/v1/messages/reaction", &token, &body)
        .await
        .unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();
}
