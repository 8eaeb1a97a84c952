//! Realtime dispatch tests.
//!
//! A channel stands in for the socket writer. Lifecycle tests go through
//! `open_session`/`close_session`; dispatch tests register sessions straight
//! on the gateway and drive frames through `handle_event`.

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use messenger_server::domain::{User, UserRepository};
use messenger_server::presentation::websocket::{
    authenticate_connection, close_session, handle_event, open_session, ServerEvent, SessionState,
};

use crate::common::{TestApp, TestUser};

struct Client {
    state: SessionState,
    rx: UnboundedReceiver<ServerEvent>,
}

fn connect(app: &TestApp, user: &TestUser, session_id: &str, rooms: Vec<i64>) -> Client {
    let (tx, rx) = unbounded_channel();
    let user_id: i64 = user.id.parse().unwrap();
    app.state
        .gateway
        .register_session(session_id.to_string(), user_id, rooms, tx);
    Client {
        state: SessionState::new(session_id.to_string(), user_id),
        rx,
    }
}

/// Drain everything queued for a client as JSON frames
fn drain(client: &mut Client) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(event) = client.rx.try_recv() {
        frames.push(serde_json::to_value(event).unwrap());
    }
    frames
}

fn names(frames: &[Value]) -> Vec<&str> {
    frames.iter().map(|f| f["event"].as_str().unwrap()).collect()
}

async fn stored_user(app: &TestApp, user: &TestUser) -> User {
    app.state
        .repos
        .users
        .find_by_id(user.id.parse().unwrap())
        .await
        .unwrap()
        .unwrap()
}

/// Connect through the full open sequence
async fn open(app: &TestApp, user: &TestUser) -> Client {
    let (tx, rx) = unbounded_channel();
    let state = open_session(&app.state, &stored_user(app, user).await, tx)
        .await
        .unwrap();
    Client { state, rx }
}

async fn pair(app: &TestApp) -> (TestUser, TestUser, i64) {
    let ana = app.register().await;
    let bia = app.register().await;
    let chat_id = app.individual_chat(&ana, &bia).await;
    (ana, bia, chat_id.parse().unwrap())
}

#[tokio::test]
async fn test_send_message_reaches_every_room_session() {
    let app = TestApp::new();
    let (ana, bia, chat_id) = pair(&app).await;
    let mut ana_client = connect(&app, &ana, "s-ana", vec![chat_id]);
    let mut bia_client = connect(&app, &bia, "s-bia", vec![chat_id]);

    let frame = json!({
        "event": "send-message",
        "data": { "chatId": chat_id.to_string(), "content": "hello over the wire" }
    });
    handle_event(&app.state, &mut ana_client.state, &frame.to_string()).await;

    let received = drain(&mut bia_client);
    assert_eq!(names(&received), vec!["new-message"]);
    assert_eq!(received[0]["data"]["content"], "hello over the wire");
    assert_eq!(received[0]["data"]["sender"]["id"], ana.id.as_str());

    // The sender's own session sees it too
    assert_eq!(names(&drain(&mut ana_client)), vec!["new-message"]);
}

#[tokio::test]
async fn test_typing_skips_the_typist() {
    let app = TestApp::new();
    let (ana, bia, chat_id) = pair(&app).await;
    let mut ana_client = connect(&app, &ana, "s-ana", vec![chat_id]);
    let mut ana_phone = connect(&app, &ana, "s-ana-phone", vec![chat_id]);
    let mut bia_client = connect(&app, &bia, "s-bia", vec![chat_id]);

    let frame = json!({ "event": "typing", "data": { "chat_id": chat_id.to_string() } });
    handle_event(&app.state, &mut ana_client.state, &frame.to_string()).await;

    let received = drain(&mut bia_client);
    assert_eq!(names(&received), vec!["user-typing"]);
    assert_eq!(received[0]["data"]["user_id"], ana.id.as_str());
    assert!(drain(&mut ana_client).is_empty());
    assert!(drain(&mut ana_phone).is_empty());
}

#[tokio::test]
async fn test_outsider_typing_is_refused() {
    let app = TestApp::new();
    let (_, bia, chat_id) = pair(&app).await;
    let eve = app.register().await;
    let mut eve_client = connect(&app, &eve, "s-eve", vec![]);
    let mut bia_client = connect(&app, &bia, "s-bia", vec![chat_id]);

    let frame = json!({ "event": "typing", "data": { "chat_id": chat_id.to_string() } });
    handle_event(&app.state, &mut eve_client.state, &frame.to_string()).await;

    let errors = drain(&mut eve_client);
    assert_eq!(names(&errors), vec!["error"]);
    assert_eq!(errors[0]["data"]["event"], "typing");
    assert_eq!(errors[0]["data"]["code"], 10004);
    assert!(drain(&mut bia_client).is_empty());
}

#[tokio::test]
async fn test_malformed_and_unknown_frames_report_errors() {
    let app = TestApp::new();
    let (ana, _, _) = pair(&app).await;
    let mut client = connect(&app, &ana, "s-ana", vec![]);

    handle_event(&app.state, &mut client.state, "not json").await;
    handle_event(&app.state, &mut client.state, r#"{"event":"dance","data":{}}"#).await;

    let errors = drain(&mut client);
    assert_eq!(names(&errors), vec!["error", "error"]);
    assert_eq!(errors[0]["data"]["code"], 10002);
    assert!(errors[0]["data"].get("event").is_none());
    assert_eq!(errors[1]["data"]["event"], "dance");
}

#[tokio::test]
async fn test_mark_as_read_notifies_the_other_side() {
    let app = TestApp::new();
    let (ana, bia, chat_id) = pair(&app).await;
    app.send_text(&ana, &chat_id.to_string(), "read me").await;

    let mut ana_client = connect(&app, &ana, "s-ana", vec![chat_id]);
    let mut bia_client = connect(&app, &bia, "s-bia", vec![chat_id]);

    let frame = json!({ "event": "mark-as-read", "data": { "chatId": chat_id.to_string() } });
    handle_event(&app.state, &mut bia_client.state, &frame.to_string()).await;

    let received = drain(&mut ana_client);
    assert_eq!(names(&received), vec!["messages-read"]);
    assert_eq!(received[0]["data"]["user_id"], bia.id.as_str());
    assert_eq!(received[0]["data"]["modified_count"], 1);
    assert!(drain(&mut bia_client).is_empty());
}

#[tokio::test]
async fn test_call_signal_is_relayed_with_payload() {
    let app = TestApp::new();
    let (ana, bia, chat_id) = pair(&app).await;
    let mut ana_client = connect(&app, &ana, "s-ana", vec![chat_id]);
    let mut bia_client = connect(&app, &bia, "s-bia", vec![chat_id]);

    let frame = json!({
        "event": "call-user",
        "data": { "chat_id": chat_id.to_string(), "sdp": "v=0", "video": true }
    });
    handle_event(&app.state, &mut ana_client.state, &frame.to_string()).await;

    let received = drain(&mut bia_client);
    assert_eq!(names(&received), vec!["incoming-call"]);
    assert_eq!(received[0]["data"]["from_user_id"], ana.id.as_str());
    assert_eq!(received[0]["data"]["sdp"], "v=0");
    assert_eq!(received[0]["data"]["video"], true);
}

#[tokio::test]
async fn test_heartbeat_and_refresh_subscriptions() {
    let app = TestApp::new();
    let (ana, bia, chat_id) = pair(&app).await;
    let mut client = connect(&app, &ana, "s-ana", vec![]);

    handle_event(&app.state, &mut client.state, r#"{"event":"heartbeat"}"#).await;
    handle_event(&app.state, &mut client.state, r#"{"event":"refresh-subscriptions"}"#).await;

    let frames = drain(&mut client);
    assert_eq!(names(&frames), vec!["heartbeat-ack", "subscriptions-refreshed"]);
    assert_eq!(frames[1]["data"]["chat_ids"], json!([chat_id.to_string()]));

    // Now subscribed, so room traffic arrives
    app.send_text(&bia, &chat_id.to_string(), "you're in").await;
    assert_eq!(names(&drain(&mut client)), vec!["new-message"]);
}

#[tokio::test]
async fn test_http_mutations_fan_out_to_the_room() {
    let app = TestApp::new();
    let (ana, bia, chat_id) = pair(&app).await;
    let mut bia_client = connect(&app, &bia, "s-bia", vec![chat_id]);

    let message = app.send_text(&ana, &chat_id.to_string(), "oops").await;
    let path = format!("/api/v1/messages/{}", message["id"].as_str().unwrap());
    app.server
        .patch(&path)
        .authorization_bearer(&ana.token)
        .json(&json!({ "content": "fixed" }))
        .await
        .assert_status_ok();
    app.server
        .delete(&path)
        .authorization_bearer(&ana.token)
        .await
        .assert_status_ok();

    let frames = drain(&mut bia_client);
    assert_eq!(
        names(&frames),
        vec!["new-message", "message-updated", "message-deleted"]
    );
    assert_eq!(frames[2]["data"]["message_id"], message["id"]);
}

#[tokio::test]
async fn test_added_participant_joins_the_room() {
    let app = TestApp::new();
    let admin = app.register().await;
    let member = app.register().await;
    let newcomer = app.register().await;

    let chat: Value = app
        .server
        .post("/api/v1/chats/group")
        .authorization_bearer(&admin.token)
        .json(&json!({ "name": "Crew", "participant_ids": [member.id] }))
        .await
        .json();
    let chat_id = chat["id"].as_str().unwrap().to_string();
    let mut newcomer_client = connect(&app, &newcomer, "s-new", vec![]);

    app.server
        .post(&format!("/api/v1/chats/{}/participants", chat_id))
        .authorization_bearer(&admin.token)
        .json(&json!({ "user_id": newcomer.id }))
        .await
        .assert_status_ok();
    app.send_text(&member, &chat_id, "welcome!").await;

    assert_eq!(names(&drain(&mut newcomer_client)), vec!["new-message"]);
}

#[tokio::test]
async fn test_handshake_requires_a_valid_token() {
    let app = TestApp::new();
    let ana = app.register().await;

    for token in [None, Some(""), Some("not-a-jwt")] {
        let err = authenticate_connection(&app.state, token).await.unwrap_err();
        assert_eq!(err.status_and_code(), (StatusCode::UNAUTHORIZED, 10003));
    }

    let user = authenticate_connection(&app.state, Some(&ana.token))
        .await
        .unwrap();
    assert_eq!(user.id.to_string(), ana.id);
}

#[tokio::test]
async fn test_connect_marks_online_and_announces() {
    let app = TestApp::new();
    let (ana, bia, chat_id) = pair(&app).await;
    let mut bia_client = open(&app, &bia).await;
    drain(&mut bia_client);

    let mut ana_client = open(&app, &ana).await;

    assert!(stored_user(&app, &ana).await.is_online);

    let greeting = drain(&mut ana_client);
    assert_eq!(names(&greeting), vec!["ready"]);
    assert_eq!(greeting[0]["data"]["session_id"], ana_client.state.session_id.as_str());
    assert_eq!(greeting[0]["data"]["chat_ids"], json!([chat_id.to_string()]));

    let announced = drain(&mut bia_client);
    assert_eq!(names(&announced), vec!["user-online"]);
    assert_eq!(announced[0]["data"]["user_id"], ana.id.as_str());
    assert_eq!(announced[0]["data"]["is_online"], true);

    // The new session is in the chat's room
    app.send_text(&bia, &chat_id.to_string(), "you're up").await;
    assert_eq!(names(&drain(&mut ana_client)), vec!["new-message"]);
}

#[tokio::test]
async fn test_offline_only_after_last_session_closes() {
    let app = TestApp::new();
    let (ana, bia, _) = pair(&app).await;
    let mut bia_client = open(&app, &bia).await;
    let web = open(&app, &ana).await;
    let phone = open(&app, &ana).await;
    drain(&mut bia_client);

    close_session(&app.state, &web.state).await;
    assert!(stored_user(&app, &ana).await.is_online);
    assert!(drain(&mut bia_client).is_empty());

    close_session(&app.state, &phone.state).await;
    let stored = stored_user(&app, &ana).await;
    assert!(!stored.is_online);

    let announced = drain(&mut bia_client);
    assert_eq!(names(&announced), vec!["user-offline"]);
    assert_eq!(announced[0]["data"]["user_id"], ana.id.as_str());
    assert_eq!(announced[0]["data"]["is_online"], false);
    let last_seen: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(announced[0]["data"]["last_seen"].clone()).unwrap();
    assert_eq!(last_seen, stored.last_seen);

    // Closing twice is harmless
    close_session(&app.state, &phone.state).await;
    assert_eq!(app.state.gateway.session_count(), 1);
}

#[tokio::test]
async fn test_send_message_into_deactivated_chat_is_refused() {
    let app = TestApp::new();
    let (ana, bia, chat_id) = pair(&app).await;
    let mut ana_client = connect(&app, &ana, "s-ana", vec![chat_id]);

    app.server
        .delete(&format!("/api/v1/chats/{}", chat_id))
        .authorization_bearer(&bia.token)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let frame = json!({
        "event": "send-message",
        "data": { "chatId": chat_id.to_string(), "content": "anyone?" }
    });
    handle_event(&app.state, &mut ana_client.state, &frame.to_string()).await;

    let errors = drain(&mut ana_client);
    assert_eq!(names(&errors), vec!["error"]);
    assert_eq!(errors[0]["data"]["event"], "send-message");
    assert_eq!(errors[0]["data"]["code"], 10004);
}
