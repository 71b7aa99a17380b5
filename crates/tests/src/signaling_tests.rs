use crate::fixtures::test_app::TestApp;
use crate::fixtures::test_app::WsClient;
use serde_json::{Value, json};

async fn active_pair(app: &TestApp) -> (WsClient, WsClient, String) {
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

    (alice, bob, room_id)
}

#[tokio::test]
async fn offer_and_candidates_reach_the_peer_in_order() {
    let app = TestApp::spawn().await;
    let (mut alice, mut bob, room_id) = active_pair(&app).await;

    let sdp = json!({ "type": "offer", "sdp": "v=0\r\no=- 46117 2 IN IP4 127.0.0.1" });
    alice
        .send(json!({
            "type": "offer",
            "data": { "room_id": room_id, "payload": sdp }
        }))
        .await;
    alice
        .send(json!({
            "type": "ice_candidate",
            "data": {
                "room_id": room_id,
                "payload": { "candidate": "candidate:1 1 UDP 2122252543 192.0.2.1 54321 typ host" }
            }
        }))
        .await;

    let offer = bob.expect_event("offer").await;
    assert_eq!(offer["data"]["from_user_id"], "alice");
    assert_eq!(offer["data"]["payload"], sdp);

    let candidate = bob.expect_event("ice_candidate").await;
    assert_eq!(candidate["data"]["from_user_id"], "alice");
    assert!(
        candidate["data"]["payload"]["candidate"]
            .as_str()
            .unwrap()
            .starts_with("candidate:")
    );

    // Nothing echoes back to the sender.
    alice.expect_silence().await;
}

#[tokio::test]
async fn targeted_answer_reaches_only_the_target() {
    let app = TestApp::spawn().await;
    let (mut alice, mut bob, room_id) = active_pair(&app).await;

    bob.send(json!({
        "type": "answer",
        "data": {
            "room_id": room_id,
            "target_user_id": "alice",
            "payload": { "type": "answer", "sdp": "v=0" }
        }
    }))
    .await;

    let answer = alice.expect_event("answer").await;
    assert_eq!(answer["data"]["from_user_id"], "bob");

    bob.expect_silence().await;
}

#[tokio::test]
async fn relay_into_an_unknown_room_errors() {
    let app = TestApp::spawn().await;
    let mut alice = app.ws().await;

    alice
        .send(json!({
            "type": "join_room",
            "data": { "user_id": "alice", "language": "en" }
        }))
        .await;
    alice.expect_event("room_joined").await;

    alice
        .send(json!({
            "type": "offer",
            "data": {
                "room_id": "00000000-0000-0000-0000-000000000000",
                "payload": { "sdp": "v=0" }
            }
        }))
        .await;
    let error = alice.expect_event("error").await;
    assert_eq!(error["data"]["code"], "ROOM_NOT_FOUND");
}

#[tokio::test]
async fn unknown_target_is_silently_dropped() {
    let app = TestApp::spawn().await;
    let (mut alice, mut bob, room_id) = active_pair(&app).await;

    alice
        .send(json!({
            "type": "offer",
            "data": {
                "room_id": room_id,
                "target_user_id": "nobody",
                "payload": { "sdp": "v=0" }
            }
        }))
        .await;

    alice.expect_silence().await;
    bob.expect_silence().await;
}

#[tokio::test]
async fn matched_users_can_signal_immediately() {
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

    bob.send(json!({
        "type": "find_match",
        "data": { "user_id": "bob", "language": "hi" }
    }))
    .await;
    let matched = bob.expect_event("match_found").await;
    alice.expect_event("match_found").await;
    let room_id = matched["data"]["room_id"].as_str().unwrap().to_string();

    alice
        .send(json!({
            "type": "offer",
            "data": { "room_id": room_id, "payload": { "sdp": "v=0" } }
        }))
        .await;
    let offer: Value = bob.expect_event("offer").await;
    assert_eq!(offer["data"]["from_user_id"], "alice");
}
