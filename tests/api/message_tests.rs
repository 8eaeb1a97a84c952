//! Message Store API Tests

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use crate::common::TestApp;

#[tokio::test]
async fn test_send_and_list_messages() {
    let app = TestApp::new();
    let ana = app.register().await;
    let bia = app.register().await;
    let chat_id = app.individual_chat(&ana, &bia).await;

    let first = app.send_text(&ana, &chat_id, "  hello  ").await;
    assert_eq!(first["content"], "hello");
    assert_eq!(first["type"], "text");
    assert_eq!(first["sender"]["id"], ana.id.as_str());
    assert_eq!(first["is_deleted"], false);

    app.send_text(&bia, &chat_id, "hi there").await;
    app.send_text(&ana, &chat_id, "how are you?").await;

    let page: Value = app
        .server
        .get(&format!("/api/v1/chats/{}/messages", chat_id))
        .add_query_param("limit", 2)
        .authorization_bearer(&bia.token)
        .await
        .json();

    assert_eq!(page["total"], 3);
    assert_eq!(page["page"], 1);
    let contents: Vec<&str> = page["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["hi there", "how are you?"]);

    // Chat listing carries the newest message as preview
    let chats: Vec<Value> = app
        .server
        .get("/api/v1/chats")
        .authorization_bearer(&bia.token)
        .await
        .json();
    assert_eq!(chats[0]["last_message"]["content"], "how are you?");
}

#[tokio::test]
async fn test_send_rejects_empty_and_outsiders() {
    let app = TestApp::new();
    let ana = app.register().await;
    let bia = app.register().await;
    let eve = app.register().await;
    let chat_id = app.individual_chat(&ana, &bia).await;

    app.server
        .post("/api/v1/messages")
        .authorization_bearer(&ana.token)
        .json(&json!({ "chat_id": chat_id, "content": "   " }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/api/v1/messages")
        .authorization_bearer(&eve.token)
        .json(&json!({ "chatId": chat_id, "content": "let me in" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .get(&format!("/api/v1/chats/{}/messages", chat_id))
        .authorization_bearer(&eve.token)
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_page_far_past_the_end_is_empty() {
    let app = TestApp::new();
    let ana = app.register().await;
    let bia = app.register().await;
    let chat_id = app.individual_chat(&ana, &bia).await;
    app.send_text(&ana, &chat_id, "hello").await;

    let response = app
        .server
        .get(&format!("/api/v1/chats/{}/messages", chat_id))
        .add_query_param("page", i64::MAX)
        .add_query_param("limit", 100)
        .authorization_bearer(&bia.token)
        .await;
    response.assert_status_ok();

    let page: Value = response.json();
    assert_eq!(page["total"], 1);
    assert!(page["messages"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_send_into_deactivated_chat_is_refused() {
    let app = TestApp::new();
    let ana = app.register().await;
    let bia = app.register().await;
    let chat_id = app.individual_chat(&ana, &bia).await;
    app.send_text(&ana, &chat_id, "goodbye").await;

    app.server
        .delete(&format!("/api/v1/chats/{}", chat_id))
        .authorization_bearer(&bia.token)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let response = app
        .server
        .post("/api/v1/messages")
        .authorization_bearer(&ana.token)
        .json(&json!({ "chat_id": chat_id, "content": "still there?" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["code"], 10004);

    // History stays readable
    let page: Value = app
        .server
        .get(&format!("/api/v1/chats/{}/messages", chat_id))
        .authorization_bearer(&ana.token)
        .await
        .json();
    assert_eq!(page["total"], 1);
    assert_eq!(page["messages"][0]["content"], "goodbye");
}

#[tokio::test]
async fn test_reply_carries_preview() {
    let app = TestApp::new();
    let ana = app.register().await;
    let bia = app.register().await;
    let chat_id = app.individual_chat(&ana, &bia).await;

    let original = app.send_text(&ana, &chat_id, "lunch?").await;

    let reply: Value = app
        .server
        .post("/api/v1/messages")
        .authorization_bearer(&bia.token)
        .json(&json!({
            "chat_id": chat_id,
            "content": "sure",
            "reply_to": original["id"],
        }))
        .await
        .json();

    assert_eq!(reply["reply_to"]["id"], original["id"]);
    assert_eq!(reply["reply_to"]["content"], "lunch?");
    assert_eq!(reply["reply_to"]["sender_name"], ana.name.as_str());
}

#[tokio::test]
async fn test_unread_counts_and_mark_read() {
    let app = TestApp::new();
    let ana = app.register().await;
    let bia = app.register().await;
    let chat_id = app.individual_chat(&ana, &bia).await;

    let first = app.send_text(&ana, &chat_id, "one").await;
    app.send_text(&ana, &chat_id, "two").await;
    app.send_text(&ana, &chat_id, "three").await;

    let unread_path = format!("/api/v1/chats/{}/unread-count", chat_id);
    let count: Value = app
        .server
        .get(&unread_path)
        .authorization_bearer(&bia.token)
        .await
        .json();
    assert_eq!(count["unread_count"], 3);

    // The sender never has unread messages of their own
    let count: Value = app
        .server
        .get(&unread_path)
        .authorization_bearer(&ana.token)
        .await
        .json();
    assert_eq!(count["unread_count"], 0);

    let marked: Value = app
        .server
        .post(&format!("/api/v1/messages/{}/read", first["id"].as_str().unwrap()))
        .authorization_bearer(&bia.token)
        .await
        .json();
    assert_eq!(marked["modified_count"], 1);

    let unread: Vec<Value> = app
        .server
        .get("/api/v1/messages/unread")
        .authorization_bearer(&bia.token)
        .await
        .json();
    assert_eq!(unread.len(), 2);

    // No body marks everything else
    let marked: Value = app
        .server
        .post(&format!("/api/v1/chats/{}/read", chat_id))
        .authorization_bearer(&bia.token)
        .await
        .json();
    assert_eq!(marked["modified_count"], 2);

    let count: Value = app
        .server
        .get(&unread_path)
        .authorization_bearer(&bia.token)
        .await
        .json();
    assert_eq!(count["unread_count"], 0);

    // Reading twice changes nothing
    let marked: Value = app
        .server
        .post(&format!("/api/v1/chats/{}/read", chat_id))
        .authorization_bearer(&bia.token)
        .json(&json!({ "message_ids": [first["id"]] }))
        .await
        .json();
    assert_eq!(marked["modified_count"], 0);
}

#[tokio::test]
async fn test_edit_and_delete_own_message() {
    let app = TestApp::new();
    let ana = app.register().await;
    let bia = app.register().await;
    let chat_id = app.individual_chat(&ana, &bia).await;

    let message = app.send_text(&ana, &chat_id, "typo").await;
    let path = format!("/api/v1/messages/{}", message["id"].as_str().unwrap());

    app.server
        .patch(&path)
        .authorization_bearer(&bia.token)
        .json(&json!({ "content": "not yours" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let empty = app
        .server
        .patch(&path)
        .authorization_bearer(&ana.token)
        .json(&json!({ "content": "" }))
        .await;
    empty.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(empty.json::<Value>()["code"], 10007);

    let edited: Value = app
        .server
        .patch(&path)
        .authorization_bearer(&ana.token)
        .json(&json!({ "content": "fixed" }))
        .await
        .json();
    assert_eq!(edited["content"], "fixed");

    app.server
        .delete(&path)
        .authorization_bearer(&bia.token)
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let deleted: Value = app
        .server
        .delete(&path)
        .authorization_bearer(&ana.token)
        .await
        .json();
    assert_eq!(deleted["is_deleted"], true);
    assert_eq!(deleted["content"], "");
    assert!(deleted["deleted_at"].is_string());

    // Deleting again is a no-op, editing is refused
    app.server
        .delete(&path)
        .authorization_bearer(&ana.token)
        .await
        .assert_status_ok();
    app.server
        .patch(&path)
        .authorization_bearer(&ana.token)
        .json(&json!({ "content": "resurrect" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let page: Value = app
        .server
        .get(&format!("/api/v1/chats/{}/messages", chat_id))
        .authorization_bearer(&ana.token)
        .await
        .json();
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn test_send_attachment() {
    let app = TestApp::new();
    let ana = app.register().await;
    let bia = app.register().await;
    let chat_id = app.individual_chat(&ana, &bia).await;

    let form = MultipartForm::new().add_text("chat_id", chat_id.clone()).add_part(
        "file",
        Part::bytes(vec![0x89, b'P', b'N', b'G'])
            .file_name("photo.png")
            .mime_type("image/png"),
    );

    let response = app
        .server
        .post("/api/v1/messages/attachment")
        .authorization_bearer(&ana.token)
        .multipart(form)
        .await;

    response.assert_status(StatusCode::CREATED);
    let message: Value = response.json();
    assert_eq!(message["type"], "image");
    let url = message["content"].as_str().unwrap();
    assert!(url.starts_with("/uploads/media-"));
    assert!(url.ends_with(".png"));
}

#[tokio::test]
async fn test_attachment_with_disallowed_type_rejected() {
    let app = TestApp::new();
    let ana = app.register().await;
    let bia = app.register().await;
    let chat_id = app.individual_chat(&ana, &bia).await;

    let form = MultipartForm::new().add_text("chat_id", chat_id).add_part(
        "file",
        Part::bytes(b"#!/bin/sh".to_vec())
            .file_name("run.sh")
            .mime_type("text/x-shellscript"),
    );

    app.server
        .post("/api/v1/messages/attachment")
        .authorization_bearer(&ana.token)
        .multipart(form)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}
