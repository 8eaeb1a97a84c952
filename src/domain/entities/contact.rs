//! Contact entity and repository trait.
//!
//! Maps to the `contacts` table. One row per (owner, target) pair.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// An address-book entry owned by one user and pointing at another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Owner of the address book
    pub owner_id: i64,

    /// Referenced identity
    pub target_id: i64,

    /// Name shown in the owner's address book
    pub name: String,

    /// Whether the owner has blocked the target
    pub is_blocked: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// Only the owner may modify an entry.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }
}

/// Which entries to return when listing an address book.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactFilter {
    All,
    Unblocked,
    Blocked,
}

impl ContactFilter {
    pub fn accepts(&self, contact: &Contact) -> bool {
        match self {
            Self::All => true,
            Self::Unblocked => !contact.is_blocked,
            Self::Blocked => contact.is_blocked,
        }
    }
}

/// Repository trait for Contact data access operations.
#[async_trait]
pub trait ContactRepository: Send + Sync {
    /// Find an entry by its id.
    async fn find_by_id(&self, id: i64) -> Result<Option<Contact>, AppError>;

    /// Find the entry for an (owner, target) pair.
    async fn find_by_pair(&self, owner_id: i64, target_id: i64)
        -> Result<Option<Contact>, AppError>;

    /// List an owner's entries ordered by name.
    async fn find_by_owner(
        &self,
        owner_id: i64,
        filter: ContactFilter,
    ) -> Result<Vec<Contact>, AppError>;

    /// Insert an entry. A duplicate (owner, target) pair yields `Conflict`.
    async fn create(&self, contact: &Contact) -> Result<Contact, AppError>;

    /// Persist name / blocked changes.
    async fn update(&self, contact: &Contact) -> Result<Contact, AppError>;

    /// Delete an entry. Returns whether a row was removed.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    /// Case-insensitive name search over unblocked entries, ordered by name.
    async fn search(&self, owner_id: i64, term: &str, limit: i64)
        -> Result<Vec<Contact>, AppError>;
}
