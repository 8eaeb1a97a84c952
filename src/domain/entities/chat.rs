//! Chat entity, participants, and repository trait.
//!
//! Maps to the `chats` and `chat_participants` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Kind of conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    /// Exactly two participants, no name
    Individual,
    /// Named, admin-managed conversation
    Group,
}

impl ChatType {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "group" => Self::Group,
            _ => Self::Individual,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Group => "group",
        }
    }
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Role of a participant within one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Admin,
    #[default]
    Member,
}

impl ParticipantRole {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "admin" => Self::Admin,
            _ => Self::Member,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }
}

/// An identity's membership record within a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: i64,
    pub role: ParticipantRole,
    pub joined_at: DateTime<Utc>,
}

impl Participant {
    pub fn new(user_id: i64, role: ParticipantRole, joined_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            role,
            joined_at,
        }
    }
}

/// A conversation container.
///
/// Participants are kept in join order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Snowflake ID (primary key)
    pub id: i64,

    #[serde(rename = "type")]
    pub chat_type: ChatType,

    /// Group name (None for individual chats)
    pub name: Option<String>,

    pub description: Option<String>,

    pub avatar_url: Option<String>,

    /// Ordered membership roll
    pub participants: Vec<Participant>,

    /// Most recent message pointer
    pub last_message_id: Option<i64>,

    /// Soft deactivation flag
    pub is_active: bool,

    /// Identity that created the chat
    pub created_by: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Build a new individual chat between two identities, both as members.
    pub fn individual(id: i64, creator: i64, other: i64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            chat_type: ChatType::Individual,
            name: None,
            description: None,
            avatar_url: None,
            participants: vec![
                Participant::new(creator, ParticipantRole::Member, now),
                Participant::new(other, ParticipantRole::Member, now),
            ],
            last_message_id: None,
            is_active: true,
            created_by: creator,
            created_at: now,
            updated_at: now,
        }
    }

    /// Look up a participant record.
    pub fn participant(&self, user_id: i64) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn is_participant(&self, user_id: i64) -> bool {
        self.participant(user_id).is_some()
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.participant(user_id)
            .map(|p| p.role == ParticipantRole::Admin)
            .unwrap_or(false)
    }

    pub fn is_group(&self) -> bool {
        self.chat_type == ChatType::Group
    }

    pub fn participant_ids(&self) -> Vec<i64> {
        self.participants.iter().map(|p| p.user_id).collect()
    }

    /// Unordered-pair key for an individual chat.
    pub fn direct_key(a: i64, b: i64) -> String {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        format!("{}:{}", lo, hi)
    }

    /// The key of this chat if it is individual.
    pub fn own_direct_key(&self) -> Option<String> {
        match (self.chat_type, self.participants.as_slice()) {
            (ChatType::Individual, [a, b]) => Some(Self::direct_key(a.user_id, b.user_id)),
            _ => None,
        }
    }
}

/// Group metadata changes. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ChatMetadataUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
}

impl ChatMetadataUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.avatar_url.is_none()
    }
}

/// Repository trait for Chat data access operations.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Insert a chat with its participants. A second active individual chat
    /// for the same pair yields `Conflict`.
    async fn create(&self, chat: &Chat) -> Result<Chat, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError>;

    /// Find the active individual chat for an unordered pair.
    async fn find_individual(&self, a: i64, b: i64) -> Result<Option<Chat>, AppError>;

    /// Active chats for a user, most recently updated first, ties by id ascending.
    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Chat>, AppError>;

    async fn is_participant(&self, chat_id: i64, user_id: i64) -> Result<bool, AppError>;

    /// Append a participant. Already present yields `Conflict`.
    async fn add_participant(
        &self,
        chat_id: i64,
        participant: &Participant,
    ) -> Result<Chat, AppError>;

    /// Remove a participant. Returns the chat afterwards, or `NotFound`.
    async fn remove_participant(&self, chat_id: i64, user_id: i64) -> Result<Chat, AppError>;

    async fn update_metadata(
        &self,
        chat_id: i64,
        update: &ChatMetadataUpdate,
        at: DateTime<Utc>,
    ) -> Result<Chat, AppError>;

    /// Set the last-message pointer and bump `updated_at`.
    async fn update_last_message(
        &self,
        chat_id: i64,
        message_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Set `is_active = false`.
    async fn deactivate(&self, chat_id: i64, at: DateTime<Utc>) -> Result<(), AppError>;
}
