//! Message entity and repository trait.
//!
//! Maps to the `messages` and `message_reads` tables in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Maximum length of text content, in characters.
pub const MAX_TEXT_LENGTH: usize = 4000;

/// Message content kinds.
///
/// Every kind except `Text` carries a media URL as its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    Document,
}

impl MessageType {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "image" => Self::Image,
            "video" => Self::Video,
            "audio" => Self::Audio,
            "document" => Self::Document,
            _ => Self::Text,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Document => "document",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One reader's acknowledgement of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub user_id: i64,
    pub read_at: DateTime<Utc>,
}

/// Represents a message in a chat.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - chat_id: BIGINT NOT NULL REFERENCES chats(id)
/// - sender_id: BIGINT NOT NULL REFERENCES users(id)
/// - content: TEXT NOT NULL
/// - message_type: VARCHAR(16) NOT NULL DEFAULT 'text'
/// - reply_to_id: BIGINT NULL
/// - is_deleted: BOOLEAN NOT NULL DEFAULT FALSE
/// - deleted_at: TIMESTAMPTZ NULL
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL
///
/// Read receipts live in `message_reads (message_id, user_id, read_at)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Snowflake ID (primary key)
    pub id: i64,

    pub chat_id: i64,

    pub sender_id: i64,

    /// Text, or media URL for non-text kinds. Retained after deletion.
    pub content: String,

    #[serde(rename = "type")]
    pub message_type: MessageType,

    /// Message being replied to (same chat)
    pub reply_to_id: Option<i64>,

    /// Readers in acknowledgement order, one entry per reader
    pub read_by: Vec<ReadReceipt>,

    pub is_deleted: bool,

    pub deleted_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Whether `user_id` appears in the read-by list.
    pub fn is_read_by(&self, user_id: i64) -> bool {
        self.read_by.iter().any(|r| r.user_id == user_id)
    }

    /// Unread for `user_id`: not deleted, not sent by them, not acknowledged.
    pub fn is_unread_for(&self, user_id: i64) -> bool {
        !self.is_deleted && self.sender_id != user_id && !self.is_read_by(user_id)
    }

    /// Content as exposed on external read paths.
    pub fn visible_content(&self) -> &str {
        if self.is_deleted {
            ""
        } else {
            &self.content
        }
    }

    /// Append a receipt unless the reader is already present.
    /// Returns whether the list changed.
    pub fn add_reader(&mut self, user_id: i64, at: DateTime<Utc>) -> bool {
        if self.is_read_by(user_id) {
            return false;
        }
        self.read_by.push(ReadReceipt {
            user_id,
            read_at: at,
        });
        true
    }
}

impl Default for Message {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            chat_id: 0,
            sender_id: 0,
            content: String::new(),
            message_type: MessageType::default(),
            reply_to_id: None,
            read_by: Vec::new(),
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Repository trait for Message data access operations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    /// Find a message by id, deleted or not.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// Find every message whose id is in `ids`. Missing ids are skipped.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Message>, AppError>;

    /// Non-deleted messages of a chat, newest first, `offset`/`limit` applied.
    async fn find_page(
        &self,
        chat_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Message>, AppError>;

    /// Number of non-deleted messages in a chat.
    async fn count_by_chat(&self, chat_id: i64) -> Result<i64, AppError>;

    /// Append a read receipt. Returns false when the reader was already present.
    async fn add_reader(
        &self,
        message_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Append a receipt for `reader_id` to every non-deleted message of the chat
    /// (restricted to `ids` when given) that does not already carry one.
    /// Returns the number of messages modified.
    async fn mark_many_read(
        &self,
        chat_id: i64,
        reader_id: i64,
        ids: Option<&[i64]>,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError>;

    /// Set the deleted flag and timestamp.
    async fn soft_delete(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Replace the content and bump `updated_at`.
    async fn update_content(
        &self,
        id: i64,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Message, AppError>;

    /// Count non-deleted messages in a chat that are unread for `reader_id`.
    async fn count_unread(&self, chat_id: i64, reader_id: i64) -> Result<i64, AppError>;

    /// Unread messages for `reader_id` across the given chats, newest first.
    async fn find_unread_for_user(
        &self,
        reader_id: i64,
        chat_ids: &[i64],
    ) -> Result<Vec<Message>, AppError>;
}
