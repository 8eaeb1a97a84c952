//! User entity and repository trait.
//!
//! Maps to the `users` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Status text given to freshly registered users.
pub const DEFAULT_STATUS_TEXT: &str = "Available";

/// Represents a registered identity.
///
/// Maps to the `users` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - name: VARCHAR(100) NOT NULL
/// - email: VARCHAR(255) NOT NULL UNIQUE (stored lower-cased)
/// - password_hash: VARCHAR(255) NOT NULL
/// - virtual_number: VARCHAR(16) NOT NULL UNIQUE
/// - avatar_url: TEXT NULL
/// - status_text: VARCHAR(140) NOT NULL
/// - is_online: BOOLEAN NOT NULL DEFAULT FALSE
/// - last_seen: TIMESTAMPTZ NOT NULL
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Display name
    pub name: String,

    /// Login email (unique, lower-cased)
    pub email: String,

    /// Argon2 password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Routable handle, e.g. `+5511912345678`
    pub virtual_number: String,

    /// URL to user's avatar image
    pub avatar_url: Option<String>,

    /// Free-form status line
    pub status_text: String,

    /// Whether at least one realtime session is live
    pub is_online: bool,

    /// Last connect/disconnect timestamp
    pub last_seen: DateTime<Utc>,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Case-insensitive substring match against name, email and virtual number.
    pub fn matches(&self, term_lower: &str) -> bool {
        self.name.to_lowercase().contains(term_lower)
            || self.email.contains(term_lower)
            || self.virtual_number.contains(term_lower)
    }
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            name: String::new(),
            email: String::new(),
            password_hash: String::new(),
            virtual_number: String::new(),
            avatar_url: None,
            status_text: DEFAULT_STATUS_TEXT.to_string(),
            is_online: false,
            last_seen: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Profile fields a user may change on their own account.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub status_text: Option<String>,
}

/// Repository trait for User data access operations.
///
/// Implementations of this trait handle the actual storage interactions.
/// The trait is defined in the domain layer to maintain dependency inversion.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Find every user whose id is in `ids`. Missing ids are skipped.
    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, AppError>;

    /// Find a user by their (already normalised) email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Find a user by virtual number.
    async fn find_by_virtual_number(&self, number: &str) -> Result<Option<User>, AppError>;

    /// Create a new user. Duplicate email or virtual number yields `Conflict`.
    async fn create(&self, user: &User) -> Result<User, AppError>;

    /// Apply a profile update and return the stored user.
    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<User, AppError>;

    /// Set the online flag and last-seen timestamp.
    async fn set_presence(&self, id: i64, online: bool, at: DateTime<Utc>)
        -> Result<(), AppError>;

    /// Check if an email address is already registered.
    async fn email_exists(&self, email: &str) -> Result<bool, AppError>;

    /// Check if a virtual number is already taken.
    async fn virtual_number_exists(&self, number: &str) -> Result<bool, AppError>;

    /// Case-insensitive search over name, email and virtual number,
    /// excluding `exclude_id`, ordered by name.
    async fn search(&self, term: &str, exclude_id: i64, limit: i64)
        -> Result<Vec<User>, AppError>;
}
