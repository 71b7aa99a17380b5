use crate::fixtures::test_app::TestApp;
use serde_json::json;

#[tokio::test]
async fn complementary_speakers_are_paired() {
    let app = TestApp::spawn().await;
    let mut alice = app.ws().await;
    let mut bob = app.ws().await;

    alice
        .send(json!({
            "type": "find_match",
            "data": { "user_id": "alice", "language": "en" }
        }))
        .await;
    let started = alice.expect_event("matchmaking_started").await;
    assert_eq!(started["data"]["language"], "en");
    assert_eq!(started["data"]["preferred_language"], "hi");

    let stats = app.stats().await;
    assert_eq!(stats["queued_users"], 1);

    bob.send(json!({
        "type": "find_match",
        "data": { "user_id": "bob", "language": "hi" }
    }))
    .await;

    // The second caller matches immediately; both sides are seated.
    let bob_match = bob.expect_event("match_found").await;
    assert_eq!(bob_match["data"]["other_user"]["user_id"], "alice");
    assert_eq!(bob_match["data"]["other_user"]["language"], "en");

    let alice_match = alice.expect_event("match_found").await;
    assert_eq!(alice_match["data"]["other_user"]["user_id"], "bob");
    assert_eq!(
        alice_match["data"]["room_id"],
        bob_match["data"]["room_id"]
    );

    let stats = app.stats().await;
    assert_eq!(stats["queued_users"], 0);
    assert_eq!(stats["active_rooms"], 1);
}

#[tokio::test]
async fn same_language_speakers_wait_in_separate_slots() {
    let app = TestApp::spawn().await;
    let mut alice = app.ws().await;
    let mut bob = app.ws().await;

    for (ws, user) in [(&mut alice, "alice"), (&mut bob, "bob")] {
        ws.send(json!({
            "type": "find_match",
            "data": { "user_id": user, "language": "en" }
        }))
        .await;
        ws.expect_event("matchmaking_started").await;
    }

    let stats = app.stats().await;
    assert_eq!(stats["queued_users"], 2);
    assert_eq!(stats["rooms"], 0);
}

#[tokio::test]
async fn cancelled_search_does_not_pair() {
    let app = TestApp::spawn().await;
    let mut alice = app.ws().await;
    let mut bob = app.ws().await;

    alice
        .send(json!({
            "type": "find_match",
            "data": { "user_id": "alice", "language": "en" }
        }))
        .await;
    alice.expect_event("matchmaking_started").await;

    alice
        .send(json!({ "type": "cancel_match", "data": {} }))
        .await;
    alice.expect_event("matchmaking_cancelled").await;

    bob.send(json!({
        "type": "find_match",
        "data": { "user_id": "bob", "language": "hi" }
    }))
    .await;
    bob.expect_event("matchmaking_started").await;

    alice.expect_silence().await;
}

#[tokio::test]
async fn unsupported_language_is_rejected() {
    let app = TestApp::spawn().await;
    let mut alice = app.ws().await;

    alice
        .send(json!({
            "type": "find_match",
            "data": { "user_id": "alice", "language": "fr" }
        }))
        .await;
    let error = alice.expect_event("error").await;
    assert_eq!(error["data"]["code"], "INVALID_DATA");
}

#[tokio::test]
async fn disconnect_while_queued_clears_the_slot() {
    let app = TestApp::spawn().await;
    let mut alice = app.ws().await;

    alice
        .send(json!({
            "type": "find_match",
            "data": { "user_id": "alice", "language": "en" }
        }))
        .await;
    alice.expect_event("matchmaking_started").await;
    assert_eq!(app.stats().await["queued_users"], 1);

    alice.close().await;

    // Disconnect cleanup races the assertion; poll briefly.
    for _ in 0..50 {
        if app.stats().await["queued_users"] == 0 {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    panic!("queue slot survived disconnect");
}
