use crate::fixtures::test_app::TestApp;
use serde_json::{Value, json};

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let app = TestApp::spawn().await;

    let resp = app.get("/health").await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn stats_start_empty() {
    let app = TestApp::spawn().await;

    let stats = app.stats().await;
    assert_eq!(stats["rooms"], 0);
    assert_eq!(stats["active_rooms"], 0);
    assert_eq!(stats["queued_users"], 0);
    assert_eq!(stats["completed_calls"], 0);
}

#[tokio::test]
async fn two_joins_activate_a_room() {
    let app = TestApp::spawn().await;
    let mut alice = app.ws().await;
    let mut bob = app.ws().await;

    alice
        .send(json!({
            "type": "join_room",
            "data": { "user_id": "alice", "language": "en" }
        }))
        .await;
    let joined = alice.expect_event("room_joined").await;
    assert_eq!(joined["data"]["status"], "waiting");
    assert_eq!(joined["data"]["participants"].as_array().unwrap().len(), 1);
    let room_id = joined["data"]["room_id"].as_str().unwrap().to_string();

    bob.send(json!({
        "type": "join_room",
        "data": { "user_id": "bob", "room_id": room_id, "language": "hi" }
    }))
    .await;
    let joined = bob.expect_event("room_joined").await;
    assert_eq!(joined["data"]["status"], "active");
    assert_eq!(joined["data"]["participants"].as_array().unwrap().len(), 2);

    let notified = alice.expect_event("user_joined").await;
    assert_eq!(notified["data"]["user_id"], "bob");
    assert_eq!(notified["data"]["language"], "hi");

    let stats = app.stats().await;
    assert_eq!(stats["rooms"], 1);
    assert_eq!(stats["active_rooms"], 1);
    assert_eq!(stats["completed_calls"], 1);
}

#[tokio::test]
async fn third_join_is_rejected_room_full() {
    let app = TestApp::spawn().await;
    let mut alice = app.ws().await;
    let mut bob = app.ws().await;
    let mut carol = app.ws().await;

    alice
        .send(json!({
            "type": "join_room",
            "data": { "user_id": "alice", "language": "en" }
        }))
        .await;
    let room_id = alice.expect_event("room_joined").await["data"]["room_id"]
        .as_str()
        .unwrap()
        .to_string();

    bob.send(json!({
        "type": "join_room",
        "data": { "user_id": "bob", "room_id": room_id, "language": "hi" }
    }))
    .await;
    bob.expect_event("room_joined").await;
    alice.expect_event("user_joined").await;

    carol
        .send(json!({
            "type": "join_room",
            "data": { "user_id": "carol", "room_id": room_id, "language": "en" }
        }))
        .await;
    let error = carol.expect_event("error").await;
    assert_eq!(error["data"]["code"], "ROOM_FULL");

    // The rejection touched nothing.
    alice.expect_silence().await;
    bob.expect_silence().await;
}

#[tokio::test]
async fn joining_an_unknown_room_errors() {
    let app = TestApp::spawn().await;
    let mut alice = app.ws().await;

    alice
        .send(json!({
            "type": "join_room",
            "data": {
                "user_id": "alice",
                "room_id": "00000000-0000-0000-0000-000000000000",
                "language": "en"
            }
        }))
        .await;
    let error = alice.expect_event("error").await;
    assert_eq!(error["data"]["code"], "ROOM_NOT_FOUND");
}

#[tokio::test]
async fn malformed_message_reports_invalid_data() {
    let app = TestApp::spawn().await;
    let mut alice = app.ws().await;

    alice.send(json!({ "type": "no_such_intent" })).await;
    let error = alice.expect_event("error").await;
    assert_eq!(error["data"]["code"], "INVALID_DATA");

    // The session survives the bad message.
    alice.expect_silence().await;
}

#[tokio::test]
async fn leaving_notifies_the_peer_and_reverts_to_waiting() {
    let app = TestApp::spawn().await;
    let mut alice = app.ws().await;
    let mut bob = app.ws().await;

    alice
        .send(json!({
            "type": "join_room",
            "data": { "user_id": "alice", "language": "en" }
        }))
        .await;
    let room_id = alice.expect_event("room_joined").await["data"]["room_id"]
        .as_str()
        .unwrap()
        .to_string();

    bob.send(json!({
        "type": "join_room",
        "data": { "user_id": "bob", "room_id": room_id, "language": "hi" }
    }))
    .await;
    bob.expect_event("room_joined").await;
    alice.expect_event("user_joined").await;

    bob.send(json!({
        "type": "leave_room",
        "data": { "room_id": room_id }
    }))
    .await;
    let left = bob.expect_event("room_left").await;
    assert_eq!(left["data"]["room_id"].as_str().unwrap(), room_id);

    let notified = alice.expect_event("user_left").await;
    assert_eq!(notified["data"]["user_id"], "bob");

    let stats = app.stats().await;
    assert_eq!(stats["rooms"], 1);
    assert_eq!(stats["active_rooms"], 0);
}

#[tokio::test]
async fn disconnect_notifies_the_peer() {
    let app = TestApp::spawn().await;
    let mut alice = app.ws().await;
    let mut bob = app.ws().await;

    alice
        .send(json!({
            "type": "join_room",
            "data": { "user_id": "alice", "language": "en" }
        }))
        .await;
    let room_id = alice.expect_event("room_joined").await["data"]["room_id"]
        .as_str()
        .unwrap()
        .to_string();

    bob.send(json!({
        "type": "join_room",
        "data": { "user_id": "bob", "room_id": room_id, "language": "hi" }
    }))
    .await;
    bob.expect_event("room_joined").await;
    alice.expect_event("user_joined").await;

    bob.close().await;

    let notified = alice.expect_event("user_left").await;
    assert_eq!(notified["data"]["user_id"], "bob");
}
