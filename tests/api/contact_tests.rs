//! Contact Book API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::TestApp;

#[tokio::test]
async fn test_add_contact_by_virtual_number() {
    let app = TestApp::new();
    let owner = app.register().await;
    let target = app.register().await;

    let response = app
        .server
        .post("/api/v1/contacts")
        .authorization_bearer(&owner.token)
        .json(&json!({ "virtual_number": target.virtual_number }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["name"], target.name.as_str());
    assert_eq!(body["is_blocked"], false);
    assert_eq!(body["user"]["id"], target.id.as_str());
}

#[tokio::test]
async fn test_add_contact_by_user_id_with_custom_name() {
    let app = TestApp::new();
    let owner = app.register().await;
    let target = app.register().await;

    let body: Value = app
        .server
        .post("/api/v1/contacts")
        .authorization_bearer(&owner.token)
        .json(&json!({ "user_id": target.id, "name": "Work buddy" }))
        .await
        .json();

    assert_eq!(body["name"], "Work buddy");
}

#[tokio::test]
async fn test_add_contact_rejects_self_and_duplicates() {
    let app = TestApp::new();
    let owner = app.register().await;
    let target = app.register().await;

    app.server
        .post("/api/v1/contacts")
        .authorization_bearer(&owner.token)
        .json(&json!({ "virtual_number": owner.virtual_number }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/api/v1/contacts")
        .authorization_bearer(&owner.token)
        .json(&json!({ "virtual_number": target.virtual_number }))
        .await
        .assert_status(StatusCode::CREATED);

    app.server
        .post("/api/v1/contacts")
        .authorization_bearer(&owner.token)
        .json(&json!({ "user_id": target.id }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_add_contact_unknown_number_not_found() {
    let app = TestApp::new();
    let owner = app.register().await;

    app.server
        .post("/api/v1/contacts")
        .authorization_bearer(&owner.token)
        .json(&json!({ "virtual_number": "+5511000000000" }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_block_filter_and_search() {
    let app = TestApp::new();
    let owner = app.register().await;
    let alice = app.register().await;
    let bob = app.register().await;

    let alice_contact: Value = app
        .server
        .post("/api/v1/contacts")
        .authorization_bearer(&owner.token)
        .json(&json!({ "user_id": alice.id, "name": "Alice Liddell" }))
        .await
        .json();
    app.server
        .post("/api/v1/contacts")
        .authorization_bearer(&owner.token)
        .json(&json!({ "user_id": bob.id, "name": "Alicia Bob" }))
        .await
        .assert_status(StatusCode::CREATED);

    let contact_id = alice_contact["id"].as_str().unwrap();
    let blocked: Value = app
        .server
        .post(&format!("/api/v1/contacts/{}/block", contact_id))
        .authorization_bearer(&owner.token)
        .await
        .json();
    assert_eq!(blocked["is_blocked"], true);

    let all: Vec<Value> = app
        .server
        .get("/api/v1/contacts")
        .authorization_bearer(&owner.token)
        .await
        .json();
    assert_eq!(all.len(), 2);

    let only_blocked: Vec<Value> = app
        .server
        .get("/api/v1/contacts")
        .add_query_param("blocked", "true")
        .authorization_bearer(&owner.token)
        .await
        .json();
    assert_eq!(only_blocked.len(), 1);
    assert_eq!(only_blocked[0]["id"], contact_id);

    // Blocked contacts never show up in search
    let found: Vec<Value> = app
        .server
        .get("/api/v1/contacts/search")
        .add_query_param("q", "ali")
        .authorization_bearer(&owner.token)
        .await
        .json();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Alicia Bob");

    app.server
        .post(&format!("/api/v1/contacts/{}/unblock", contact_id))
        .authorization_bearer(&owner.token)
        .await
        .assert_status_ok();

    let found: Vec<Value> = app
        .server
        .get("/api/v1/contacts/search")
        .add_query_param("q", "ali")
        .authorization_bearer(&owner.token)
        .await
        .json();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn test_search_term_too_short() {
    let app = TestApp::new();
    let owner = app.register().await;

    app.server
        .get("/api/v1/contacts/search")
        .add_query_param("q", "a")
        .authorization_bearer(&owner.token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rename_and_remove_contact() {
    let app = TestApp::new();
    let owner = app.register().await;
    let target = app.register().await;

    let contact: Value = app
        .server
        .post("/api/v1/contacts")
        .authorization_bearer(&owner.token)
        .json(&json!({ "user_id": target.id }))
        .await
        .json();
    let path = format!("/api/v1/contacts/{}", contact["id"].as_str().unwrap());

    let renamed: Value = app
        .server
        .patch(&path)
        .authorization_bearer(&owner.token)
        .json(&json!({ "name": "Mom" }))
        .await
        .json();
    assert_eq!(renamed["name"], "Mom");

    app.server
        .delete(&path)
        .authorization_bearer(&owner.token)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let remaining: Vec<Value> = app
        .server
        .get("/api/v1/contacts")
        .authorization_bearer(&owner.token)
        .await
        .json();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_cannot_touch_someone_elses_contact() {
    let app = TestApp::new();
    let owner = app.register().await;
    let intruder = app.register().await;
    let target = app.register().await;

    let contact: Value = app
        .server
        .post("/api/v1/contacts")
        .authorization_bearer(&owner.token)
        .json(&json!({ "user_id": target.id }))
        .await
        .json();

    app.server
        .delete(&format!("/api/v1/contacts/{}", contact["id"].as_str().unwrap()))
        .authorization_bearer(&intruder.token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}
