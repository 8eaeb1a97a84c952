//! Response DTOs
//!
//! Data structures for API response bodies and realtime payloads.
//! Ids are rendered as decimal strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Chat, Contact, Message, MessageType, Participant, ParticipantRole, User};

/// Public view of an identity. Never carries email or credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub virtual_number: String,
    pub avatar_url: Option<String>,
    pub status_text: String,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            name: user.name.clone(),
            virtual_number: user.virtual_number.clone(),
            avatar_url: user.avatar_url.clone(),
            status_text: user.status_text.clone(),
            is_online: user.is_online,
            last_seen: user.last_seen,
        }
    }
}

/// The caller's own profile: the public summary plus email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserSummary,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for ProfileResponse {
    fn from(user: &User) -> Self {
        Self {
            user: UserSummary::from(user),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// Register / login response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub user: ProfileResponse,
}

/// Address book entry hydrated with the target's public summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactResponse {
    pub id: String,
    pub name: String,
    pub is_blocked: bool,
    pub user: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactResponse {
    pub fn new(contact: &Contact, target: &User) -> Self {
        Self {
            id: contact.id.to_string(),
            name: contact.name.clone(),
            is_blocked: contact.is_blocked,
            user: UserSummary::from(target),
            created_at: contact.created_at,
            updated_at: contact.updated_at,
        }
    }
}

/// Chat member with role and public summary (absent if the identity vanished).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub user_id: String,
    pub role: ParticipantRole,
    pub joined_at: DateTime<Utc>,
    pub user: Option<UserSummary>,
}

impl ParticipantResponse {
    pub fn new(participant: &Participant, user: Option<&User>) -> Self {
        Self {
            user_id: participant.user_id.to_string(),
            role: participant.role,
            joined_at: participant.joined_at,
            user: user.map(UserSummary::from),
        }
    }
}

/// Short form of a message used in chat listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePreview {
    pub id: String,
    pub sender_id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Message> for MessagePreview {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.to_string(),
            sender_id: message.sender_id.to_string(),
            content: message.visible_content().to_string(),
            message_type: message.message_type,
            is_deleted: message.is_deleted,
            created_at: message.created_at,
        }
    }
}

/// Hydrated chat view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub chat_type: crate::domain::ChatType,
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub participants: Vec<ParticipantResponse>,
    pub last_message: Option<MessagePreview>,
    /// Caller's unread count; only present in listings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<i64>,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatResponse {
    /// Build a view from a chat and whatever participant identities were resolved.
    pub fn new(chat: &Chat, users: &[User]) -> Self {
        let participants = chat
            .participants
            .iter()
            .map(|p| ParticipantResponse::new(p, users.iter().find(|u| u.id == p.user_id)))
            .collect();

        Self {
            id: chat.id.to_string(),
            chat_type: chat.chat_type,
            name: chat.name.clone(),
            description: chat.description.clone(),
            avatar_url: chat.avatar_url.clone(),
            participants,
            last_message: None,
            unread_count: None,
            is_active: chat.is_active,
            created_by: chat.created_by.to_string(),
            created_at: chat.created_at,
            updated_at: chat.updated_at,
        }
    }
}

/// Result of an individual-chat request.
#[derive(Debug, Clone)]
pub struct IndividualChatResult {
    pub chat: ChatResponse,
    /// False when an existing chat was returned
    pub created: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadReceiptResponse {
    pub user_id: String,
    pub read_at: DateTime<Utc>,
}

/// Sender details embedded in a message view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SenderSummary {
    pub id: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl SenderSummary {
    pub fn new(sender_id: i64, user: Option<&User>) -> Self {
        match user {
            Some(user) => Self {
                id: user.id.to_string(),
                name: user.name.clone(),
                avatar_url: user.avatar_url.clone(),
            },
            None => Self {
                id: sender_id.to_string(),
                name: "Unknown user".to_string(),
                avatar_url: None,
            },
        }
    }
}

/// Preview of the message being replied to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyPreview {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub sender_id: String,
    pub sender_name: String,
}

/// Hydrated message view. Deleted messages carry empty content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub sender: SenderSummary,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub reply_to: Option<ReplyPreview>,
    pub read_by: Vec<ReadReceiptResponse>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageResponse {
    /// `users` must contain the sender and the reply's sender when known.
    pub fn new(message: &Message, reply_to: Option<&Message>, users: &[User]) -> Self {
        let find = |id: i64| users.iter().find(|u| u.id == id);

        let reply_to = reply_to.map(|reply| ReplyPreview {
            id: reply.id.to_string(),
            content: reply.visible_content().to_string(),
            message_type: reply.message_type,
            sender_id: reply.sender_id.to_string(),
            sender_name: SenderSummary::new(reply.sender_id, find(reply.sender_id)).name,
        });

        Self {
            id: message.id.to_string(),
            chat_id: message.chat_id.to_string(),
            sender: SenderSummary::new(message.sender_id, find(message.sender_id)),
            content: message.visible_content().to_string(),
            message_type: message.message_type,
            reply_to,
            read_by: message
                .read_by
                .iter()
                .map(|r| ReadReceiptResponse {
                    user_id: r.user_id.to_string(),
                    read_at: r.read_at,
                })
                .collect(),
            is_deleted: message.is_deleted,
            deleted_at: message.deleted_at,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}

/// One page of a chat's history, oldest to newest.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagePageResponse {
    pub messages: Vec<MessageResponse>,
    pub page: i64,
    pub limit: i64,
    /// Non-deleted messages in the chat
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub chat_id: String,
    pub modified_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub chat_id: String,
    pub unread_count: i64,
}
