//! Common Test Utilities
//!
//! Every test gets its own application over fresh in-memory storage.

use std::path::PathBuf;

use axum_test::TestServer;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::FirstName;
use fake::Fake;
use serde_json::{json, Value};

use messenger_server::config::Settings;
use messenger_server::startup::{build_router, AppState};

pub const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";
pub const TEST_PASSWORD: &str = "Sup3rSecret!";

/// Test application: the HTTP server plus a handle on the shared state
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    upload_dir: PathBuf,
}

impl TestApp {
    pub fn new() -> Self {
        let upload_dir =
            std::env::temp_dir().join(format!("messenger-test-{}", uuid::Uuid::new_v4()));

        let mut settings = Settings::in_memory(TEST_JWT_SECRET).unwrap();
        settings.uploads.dir = upload_dir.to_string_lossy().into_owned();

        let state = AppState::in_memory(settings);
        let server = TestServer::new(build_router(state.clone())).unwrap();

        Self {
            server,
            state,
            upload_dir,
        }
    }

    /// Register a user with a random name and email
    pub async fn register(&self) -> TestUser {
        let name: String = FirstName().fake();
        let email: String = SafeEmail().fake();
        self.register_as(&name, &unique(&email)).await
    }

    pub async fn register_as(&self, name: &str, email: &str) -> TestUser {
        let response = self
            .server
            .post("/api/v1/auth/register")
            .json(&json!({
                "name": name,
                "email": email,
                "password": TEST_PASSWORD,
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body: Value = response.json();
        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            virtual_number: body["user"]["virtual_number"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Open the individual chat between two users, returning its id
    pub async fn individual_chat(&self, a: &TestUser, b: &TestUser) -> String {
        let body: Value = self
            .server
            .post("/api/v1/chats/individual")
            .authorization_bearer(&a.token)
            .json(&json!({ "participant_id": b.id }))
            .await
            .json();
        body["id"].as_str().unwrap().to_string()
    }

    /// Send a text message, returning the message view
    pub async fn send_text(&self, from: &TestUser, chat_id: &str, content: &str) -> Value {
        let response = self
            .server
            .post("/api/v1/messages")
            .authorization_bearer(&from.token)
            .json(&json!({ "chat_id": chat_id, "content": content }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

/// Credentials and identifiers of a registered user
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub virtual_number: String,
    pub token: String,
}

/// Make a generated email unique across the run
pub fn unique(email: &str) -> String {
    format!("{}.{}", &uuid::Uuid::new_v4().simple().to_string()[..8], email)
}
