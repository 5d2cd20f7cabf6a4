//! WebSocket gateway tests
//!
//! Each test starts a gateway on an ephemeral port over in-memory stores.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use integration_tests::{
    direct_frame, expect_silence, next_envelope, send_frame, target_frame, token_for,
    unique_user, TestGateway,
};
use relay_core::{Message, TargetKind};
use relay_service::testing::StaticMembership;
use tokio_tungstenite::tungstenite;

const QUIET: Duration = Duration::from_millis(200);

// ============================================================================
// Direct Messages
// ============================================================================

#[tokio::test]
async fn test_direct_message_delivered_and_acknowledged() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = unique_user("alice");
    let bob = unique_user("bob");

    let mut alice_ws = gateway.connect(&alice).await.unwrap();
    let mut bob_ws = gateway.connect(&bob).await.unwrap();

    send_frame(&mut alice_ws, &direct_frame(&bob, "hello bob"))
        .await
        .unwrap();

    let delivered = next_envelope::<Message>(&mut bob_ws).await.unwrap();
    assert_eq!(delivered.code, 200);
    assert_eq!(delivered.message, "New message received");
    let message = delivered.data.unwrap();
    assert_eq!(message.author_id, alice);
    assert_eq!(message.target_id, bob);
    assert_eq!(message.content, "hello bob");

    let ack = next_envelope::<Message>(&mut alice_ws).await.unwrap();
    assert_eq!(ack.code, 200);
    assert_eq!(ack.message, "Message sent");
    assert_eq!(ack.data.unwrap().id, message.id);

    assert!(gateway.backends.staging.contains(message.id));
}

#[tokio::test]
async fn test_offline_recipient_message_is_still_staged() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = unique_user("alice");
    let mut alice_ws = gateway.connect(&alice).await.unwrap();

    send_frame(&mut alice_ws, &direct_frame("nobody-online", "are you there?"))
        .await
        .unwrap();

    let ack = next_envelope::<Message>(&mut alice_ws).await.unwrap();
    assert_eq!(ack.code, 200);
    assert!(gateway.backends.staging.contains(ack.data.unwrap().id));
    assert_eq!(gateway.backends.staging.len(), 1);
}

#[tokio::test]
async fn test_message_to_disconnected_user_is_not_delivered() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = unique_user("alice");
    let bob = unique_user("bob");

    let mut alice_ws = gateway.connect(&alice).await.unwrap();
    let mut bob_ws = gateway.connect(&bob).await.unwrap();

    bob_ws.close(None).await.unwrap();
    gateway
        .wait_for(|state| state.registry().lookup(&bob).is_none())
        .await
        .unwrap();

    send_frame(&mut alice_ws, &direct_frame(&bob, "missed you"))
        .await
        .unwrap();

    let ack = next_envelope::<Message>(&mut alice_ws).await.unwrap();
    assert_eq!(ack.code, 200);
    assert_eq!(gateway.state.registry().connection_count(), 1);
}

// ============================================================================
// Group and Channel Fan-Out
// ============================================================================

#[tokio::test]
async fn test_group_fan_out_reaches_members_except_author() {
    let alice = unique_user("alice");
    let bob = unique_user("bob");
    let carol = unique_user("carol");
    let membership = StaticMembership::new().with_members(
        TargetKind::Group,
        "g1",
        [alice.as_str(), bob.as_str(), carol.as_str()],
    );
    let gateway = TestGateway::start_with_membership(membership).await.unwrap();

    let mut alice_ws = gateway.connect(&alice).await.unwrap();
    let mut bob_ws = gateway.connect(&bob).await.unwrap();
    let mut carol_ws = gateway.connect(&carol).await.unwrap();

    send_frame(&mut alice_ws, &target_frame(TargetKind::Group, "g1", "hi team"))
        .await
        .unwrap();

    for ws in [&mut bob_ws, &mut carol_ws] {
        let delivered = next_envelope::<Message>(ws).await.unwrap();
        assert_eq!(delivered.message, "New message received");
        assert_eq!(delivered.data.unwrap().content, "hi team");
    }

    let ack = next_envelope::<Message>(&mut alice_ws).await.unwrap();
    assert_eq!(ack.message, "Message sent");
    expect_silence(&mut alice_ws, QUIET).await.unwrap();
}

#[tokio::test]
async fn test_channel_fan_out_skips_non_members() {
    let alice = unique_user("alice");
    let bob = unique_user("bob");
    let outsider = unique_user("outsider");
    let membership = StaticMembership::new().with_members(
        TargetKind::Channel,
        "news",
        [alice.as_str(), bob.as_str()],
    );
    let gateway = TestGateway::start_with_membership(membership).await.unwrap();

    let mut alice_ws = gateway.connect(&alice).await.unwrap();
    let mut bob_ws = gateway.connect(&bob).await.unwrap();
    let mut outsider_ws = gateway.connect(&outsider).await.unwrap();

    send_frame(
        &mut alice_ws,
        &target_frame(TargetKind::Channel, "news", "release shipped"),
    )
    .await
    .unwrap();

    let delivered = next_envelope::<Message>(&mut bob_ws).await.unwrap();
    assert_eq!(delivered.data.unwrap().content, "release shipped");
    next_envelope::<Message>(&mut alice_ws).await.unwrap();
    expect_silence(&mut outsider_ws, QUIET).await.unwrap();
}

// ============================================================================
// Connection Lifecycle
// ============================================================================

#[tokio::test]
async fn test_reconnect_routes_to_newest_socket() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = unique_user("alice");
    let bob = unique_user("bob");

    let mut alice_ws = gateway.connect(&alice).await.unwrap();
    let mut old_bob = gateway.connect(&bob).await.unwrap();
    let mut new_bob = gateway.connect(&bob).await.unwrap();
    let newest = gateway.state.registry().lookup(&bob).unwrap().id();

    // Closing the replaced socket must not evict the live one
    old_bob.close(None).await.unwrap();
    tokio::time::sleep(QUIET).await;
    assert_eq!(gateway.state.registry().lookup(&bob).unwrap().id(), newest);

    send_frame(&mut alice_ws, &direct_frame(&bob, "which one?"))
        .await
        .unwrap();

    let delivered = next_envelope::<Message>(&mut new_bob).await.unwrap();
    assert_eq!(delivered.data.unwrap().content, "which one?");
}

#[tokio::test]
async fn test_bad_token_is_rejected_before_upgrade() {
    let gateway = TestGateway::start().await.unwrap();

    let result = tokio_tungstenite::connect_async(gateway.ws_url("not-a-token")).await;
    match result {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 401),
        other => panic!(
            "expected HTTP 401, got {:?}",
            other.map(|(_, response)| response.status())
        ),
    }
    assert_eq!(gateway.state.registry().connection_count(), 0);
}

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let gateway = TestGateway::start().await.unwrap();
    let url = format!("ws://{}/messages/ws", gateway.addr);

    let result = tokio_tungstenite::connect_async(url).await;
    assert!(matches!(result, Err(tungstenite::Error::Http(ref r)) if r.status() == 401));
}

// ============================================================================
// Invalid Frames
// ============================================================================

#[tokio::test]
async fn test_malformed_frame_gets_error_and_socket_stays_open() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = unique_user("alice");
    let mut alice_ws = gateway.connect(&alice).await.unwrap();

    send_frame(&mut alice_ws, &serde_json::json!({ "content": "no target" }))
        .await
        .unwrap();
    let error = next_envelope::<Message>(&mut alice_ws).await.unwrap();
    assert_eq!(error.code, 400);
    assert_eq!(error.message, "Invalid message");
    assert!(error.error.is_some());

    send_frame(&mut alice_ws, &direct_frame("bob", "second try"))
        .await
        .unwrap();
    let ack = next_envelope::<Message>(&mut alice_ws).await.unwrap();
    assert_eq!(ack.code, 200);
    assert_eq!(gateway.backends.staging.len(), 1);
}

#[tokio::test]
async fn test_empty_message_is_rejected() {
    let gateway = TestGateway::start().await.unwrap();
    let mut ws = gateway.connect(&unique_user("alice")).await.unwrap();

    send_frame(&mut ws, &direct_frame("bob", "")).await.unwrap();

    let error = next_envelope::<Message>(&mut ws).await.unwrap();
    assert_eq!(error.code, 400);
    assert!(gateway.backends.staging.is_empty());
}

#[tokio::test]
async fn test_binary_frame_is_rejected() {
    let gateway = TestGateway::start().await.unwrap();
    let mut ws = gateway.connect(&unique_user("alice")).await.unwrap();

    futures_util::SinkExt::send(&mut ws, tungstenite::Message::Binary(vec![1, 2, 3]))
        .await
        .unwrap();

    let error = next_envelope::<Message>(&mut ws).await.unwrap();
    assert_eq!(error.code, 400);
}

#[tokio::test]
async fn test_staging_failure_reports_send_failed() {
    let gateway = TestGateway::start().await.unwrap();
    let alice = unique_user("alice");
    let bob = unique_user("bob");
    let mut alice_ws = gateway.connect(&alice).await.unwrap();
    let mut bob_ws = gateway.connect(&bob).await.unwrap();

    gateway.backends.staging.fail_writes(true);
    send_frame(&mut alice_ws, &direct_frame(&bob, "lost"))
        .await
        .unwrap();

    let error = next_envelope::<Message>(&mut alice_ws).await.unwrap();
    assert_eq!(error.code, 500);
    assert_eq!(error.message, "Failed to send message");
    expect_silence(&mut bob_ws, QUIET).await.unwrap();
}

#[tokio::test]
async fn test_token_for_is_accepted_by_gateway() {
    let gateway = TestGateway::start().await.unwrap();
    let url = gateway.ws_url(&token_for("dora"));

    let (_ws, response) = tokio_tungstenite::connect_async(url).await.unwrap();
    assert_eq!(response.status(), 101);
}
