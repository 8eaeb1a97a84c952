//! Request DTOs
//!
//! Data structures for API request bodies and query strings.
//! Multi-word fields also accept their camelCase spelling.

use serde::Deserialize;
use validator::Validate;

use crate::domain::{ContactFilter, MessageType, ParticipantRole};

/// Registration request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "Password must be 6-128 characters"))]
    pub password: String,

    #[serde(default, alias = "avatarUrl", alias = "avatar")]
    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar_url: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Update own profile
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: Option<String>,

    #[serde(default, alias = "avatarUrl", alias = "avatar")]
    pub avatar_url: Option<String>,

    #[serde(default, alias = "statusText", alias = "status")]
    #[validate(length(max = 139, message = "Status must be at most 139 characters"))]
    pub status_text: Option<String>,
}

/// `?q=` search query shared by user and contact search
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Add a contact by virtual number or user id
#[derive(Debug, Deserialize, Validate)]
pub struct AddContactRequest {
    #[serde(alias = "virtualNumber", alias = "virtual_number", alias = "userId", alias = "user_id")]
    #[validate(length(min = 1, message = "A virtual number or user id is required"))]
    pub target: String,

    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: Option<String>,
}

/// `?blocked=` filter for contact listings; absent lists everything
#[derive(Debug, Default, Deserialize)]
pub struct ContactListQuery {
    pub blocked: Option<bool>,
}

impl ContactListQuery {
    pub fn filter(&self) -> ContactFilter {
        match self.blocked {
            None => ContactFilter::All,
            Some(true) => ContactFilter::Blocked,
            Some(false) => ContactFilter::Unblocked,
        }
    }
}

/// Rename a contact
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateContactRequest {
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: String,
}

/// Open (or fetch) an individual chat
#[derive(Debug, Deserialize, Validate)]
pub struct CreateIndividualChatRequest {
    #[serde(alias = "participantId")]
    #[validate(length(min = 1, message = "Participant id is required"))]
    pub participant_id: String,
}

/// Create a group chat
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupChatRequest {
    #[validate(length(min = 1, max = 100, message = "Group name must be 1-100 characters"))]
    pub name: String,

    #[serde(alias = "participantIds", alias = "participants")]
    #[validate(length(min = 1, message = "At least one other participant is required"))]
    pub participant_ids: Vec<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[serde(default, alias = "avatarUrl", alias = "avatar")]
    pub avatar_url: Option<String>,
}

/// Update group metadata
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateChatRequest {
    #[validate(length(max = 100, message = "Group name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,

    #[serde(default, alias = "avatarUrl", alias = "avatar")]
    pub avatar_url: Option<String>,
}

/// Add a participant to a group
#[derive(Debug, Deserialize, Validate)]
pub struct AddParticipantRequest {
    #[serde(alias = "userId")]
    #[validate(length(min = 1, message = "User id is required"))]
    pub user_id: String,

    #[serde(default)]
    pub role: Option<ParticipantRole>,
}

/// Send a text message
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[serde(alias = "chatId")]
    #[validate(length(min = 1, message = "Chat id is required"))]
    pub chat_id: String,

    pub content: String,

    #[serde(default, rename = "type")]
    pub message_type: Option<MessageType>,

    #[serde(default, alias = "replyTo", alias = "reply_to_id")]
    pub reply_to: Option<String>,
}

/// Pagination for message listings
#[derive(Debug, Deserialize)]
pub struct MessageListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Mark messages of a chat as read; no ids means every unread message
#[derive(Debug, Default, Deserialize)]
pub struct MarkReadRequest {
    #[serde(default, alias = "messageIds")]
    pub message_ids: Option<Vec<String>>,
}

/// Edit a text message
#[derive(Debug, Deserialize, Validate)]
pub struct EditMessageRequest {
    #[validate(length(min = 1, message = "Message content is required"))]
    pub content: String,
}
