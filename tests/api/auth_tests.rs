//! Authentication and Identity API Tests

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::{unique, TestApp, TEST_PASSWORD};

#[tokio::test]
async fn test_register_returns_token_and_profile() {
    let app = TestApp::new();
    let email = unique("ana@example.com");

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "name": "Ana", "email": email, "password": TEST_PASSWORD }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert!(!body["token"].as_str().unwrap().is_empty());
    assert_eq!(body["user"]["name"], "Ana");
    assert_eq!(body["user"]["email"], email.as_str());
    assert_eq!(body["user"]["is_online"], false);
    assert!(body["user"].get("password_hash").is_none());

    let number = body["user"]["virtual_number"].as_str().unwrap();
    assert_eq!(number.len(), 14);
    assert!(number.starts_with("+55"));
}

#[tokio::test]
async fn test_register_with_invalid_email_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "name": "Ana", "email": "not-an-email", "password": TEST_PASSWORD }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_with_short_password_fails() {
    let app = TestApp::new();

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "name": "Ana", "email": unique("ana@example.com"), "password": "123" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_with_duplicate_email_fails() {
    let app = TestApp::new();
    let user = app.register().await;

    let response = app
        .server
        .post("/api/v1/auth/register")
        .json(&json!({ "name": "Other", "email": user.email, "password": TEST_PASSWORD }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_login_with_valid_credentials() {
    let app = TestApp::new();
    let user = app.register().await;

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": user.email, "password": TEST_PASSWORD }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"]["id"], user.id.as_str());
}

#[tokio::test]
async fn test_login_with_wrong_password_fails() {
    let app = TestApp::new();
    let user = app.register().await;

    let response = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({ "email": user.email, "password": "wrong-password" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = TestApp::new();

    app.server
        .get("/api/v1/users/me")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let response = app
        .server
        .get("/api/v1/users/me")
        .authorization_bearer("not-a-jwt")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["code"], 10003);
}

#[tokio::test]
async fn test_get_and_update_own_profile() {
    let app = TestApp::new();
    let user = app.register().await;

    let me: Value = app
        .server
        .get("/api/v1/users/me")
        .authorization_bearer(&user.token)
        .await
        .json();
    assert_eq!(me["id"], user.id.as_str());
    assert_eq!(me["virtual_number"], user.virtual_number.as_str());

    let response = app
        .server
        .patch("/api/v1/users/me")
        .authorization_bearer(&user.token)
        .json(&json!({ "name": "  Renamed  ", "status_text": "Busy" }))
        .await;
    response.assert_status_ok();
    let updated: Value = response.json();
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["status_text"], "Busy");
    assert_eq!(updated["virtual_number"], user.virtual_number.as_str());
}

#[tokio::test]
async fn test_search_users_excludes_requester() {
    let app = TestApp::new();
    let me = app.register_as("Zephyrine", &unique("z1@example.com")).await;
    let other = app.register_as("Zephyrine", &unique("z2@example.com")).await;

    let results: Vec<Value> = app
        .server
        .get("/api/v1/users/search")
        .add_query_param("q", "zephyr")
        .authorization_bearer(&me.token)
        .await
        .json();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["id"], other.id.as_str());
    assert!(results[0].get("email").is_none());
}

#[tokio::test]
async fn test_get_user_by_id() {
    let app = TestApp::new();
    let me = app.register().await;
    let other = app.register().await;

    let response = app
        .server
        .get(&format!("/api/v1/users/{}", other.id))
        .authorization_bearer(&me.token)
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["virtual_number"], other.virtual_number.as_str());

    app.server
        .get("/api/v1/users/123456789")
        .authorization_bearer(&me.token)
        .await
        .assert_status_not_found();
}
