//! Chat Registry API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{TestApp, TestUser};

async fn create_group(app: &TestApp, admin: &TestUser, members: &[&TestUser]) -> Value {
    let ids: Vec<&str> = members.iter().map(|m| m.id.as_str()).collect();
    let response = app
        .server
        .post("/api/v1/chats/group")
        .authorization_bearer(&admin.token)
        .json(&json!({ "name": "Weekend plans", "participant_ids": ids }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

#[tokio::test]
async fn test_individual_chat_is_created_once() {
    let app = TestApp::new();
    let ana = app.register().await;
    let bia = app.register().await;

    let first = app
        .server
        .post("/api/v1/chats/individual")
        .authorization_bearer(&ana.token)
        .json(&json!({ "participant_id": bia.id }))
        .await;
    first.assert_status(StatusCode::CREATED);
    let first: Value = first.json();
    assert_eq!(first["type"], "individual");
    assert_eq!(first["participants"].as_array().unwrap().len(), 2);

    // Same pair from the other side returns the existing chat
    let second = app
        .server
        .post("/api/v1/chats/individual")
        .authorization_bearer(&bia.token)
        .json(&json!({ "participantId": ana.id }))
        .await;
    second.assert_status_ok();
    let second: Value = second.json();
    assert_eq!(second["id"], first["id"]);
}

#[tokio::test]
async fn test_individual_chat_with_self_rejected() {
    let app = TestApp::new();
    let ana = app.register().await;

    app.server
        .post("/api/v1/chats/individual")
        .authorization_bearer(&ana.token)
        .json(&json!({ "participant_id": ana.id }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_group_creator_is_admin() {
    let app = TestApp::new();
    let admin = app.register().await;
    let member = app.register().await;

    let chat = create_group(&app, &admin, &[&member]).await;

    assert_eq!(chat["type"], "group");
    assert_eq!(chat["name"], "Weekend plans");
    let participants = chat["participants"].as_array().unwrap();
    assert_eq!(participants.len(), 2);
    assert_eq!(participants[0]["user_id"], admin.id.as_str());
    assert_eq!(participants[0]["role"], "admin");
    assert_eq!(participants[1]["role"], "member");
}

#[tokio::test]
async fn test_group_with_unknown_participant_not_found() {
    let app = TestApp::new();
    let admin = app.register().await;

    app.server
        .post("/api/v1/chats/group")
        .authorization_bearer(&admin.token)
        .json(&json!({ "name": "Ghosts", "participant_ids": ["424242"] }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_only_admin_manages_membership() {
    let app = TestApp::new();
    let admin = app.register().await;
    let member = app.register().await;
    let newcomer = app.register().await;

    let chat = create_group(&app, &admin, &[&member]).await;
    let chat_id = chat["id"].as_str().unwrap();
    let participants = format!("/api/v1/chats/{}/participants", chat_id);

    app.server
        .post(&participants)
        .authorization_bearer(&member.token)
        .json(&json!({ "user_id": newcomer.id }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let updated: Value = app
        .server
        .post(&participants)
        .authorization_bearer(&admin.token)
        .json(&json!({ "user_id": newcomer.id }))
        .await
        .json();
    assert_eq!(updated["participants"].as_array().unwrap().len(), 3);

    app.server
        .post(&participants)
        .authorization_bearer(&admin.token)
        .json(&json!({ "user_id": newcomer.id }))
        .await
        .assert_status(StatusCode::CONFLICT);

    // A member may leave on their own
    let left: Value = app
        .server
        .delete(&format!("{}/{}", participants, newcomer.id))
        .authorization_bearer(&newcomer.token)
        .await
        .json();
    assert_eq!(left["participants"].as_array().unwrap().len(), 2);

    app.server
        .delete(&format!("{}/{}", participants, admin.id))
        .authorization_bearer(&member.token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_group_metadata() {
    let app = TestApp::new();
    let admin = app.register().await;
    let member = app.register().await;

    let chat = create_group(&app, &admin, &[&member]).await;
    let path = format!("/api/v1/chats/{}", chat["id"].as_str().unwrap());

    let updated: Value = app
        .server
        .patch(&path)
        .authorization_bearer(&admin.token)
        .json(&json!({ "name": "Renamed", "description": "New plans" }))
        .await
        .json();
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["description"], "New plans");

    app.server
        .patch(&path)
        .authorization_bearer(&member.token)
        .json(&json!({ "name": "Hijacked" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_outsider_cannot_read_chat() {
    let app = TestApp::new();
    let ana = app.register().await;
    let bia = app.register().await;
    let eve = app.register().await;

    let chat_id = app.individual_chat(&ana, &bia).await;

    app.server
        .get(&format!("/api/v1/chats/{}", chat_id))
        .authorization_bearer(&eve.token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deactivated_chat_leaves_listing() {
    let app = TestApp::new();
    let ana = app.register().await;
    let bia = app.register().await;
    let cal = app.register().await;

    let kept = app.individual_chat(&ana, &bia).await;
    let dropped = app.individual_chat(&ana, &cal).await;

    let listed: Vec<Value> = app
        .server
        .get("/api/v1/chats")
        .authorization_bearer(&ana.token)
        .await
        .json();
    assert_eq!(listed.len(), 2);

    app.server
        .delete(&format!("/api/v1/chats/{}", dropped))
        .authorization_bearer(&cal.token)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let listed: Vec<Value> = app
        .server
        .get("/api/v1/chats")
        .authorization_bearer(&ana.token)
        .await
        .json();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], kept.as_str());
    assert_eq!(listed[0]["unread_count"], 0);
}
