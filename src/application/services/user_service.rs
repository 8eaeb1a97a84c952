//! User Service
//!
//! Identity directory lookups, own-profile management and presence.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::application::dto::{ProfileResponse, UserSummary};
use crate::domain::{ProfileUpdate, UserRepository, VirtualNumber};
use crate::shared::error::AppError;

/// Maximum results returned by a directory search
pub const USER_SEARCH_LIMIT: i64 = 20;

/// User service trait
#[async_trait]
pub trait UserService: Send + Sync {
    /// The caller's own profile, including email
    async fn get_profile(&self, user_id: i64) -> Result<ProfileResponse, AppError>;

    /// Update name, avatar or status text
    async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> Result<ProfileResponse, AppError>;

    /// Public summary of any identity
    async fn get_user(&self, user_id: i64) -> Result<UserSummary, AppError>;

    /// Resolve a virtual number to a public summary
    async fn find_by_virtual_number(&self, number: &str) -> Result<UserSummary, AppError>;

    /// Substring search over name, email and virtual number
    async fn search(&self, requester_id: i64, term: &str) -> Result<Vec<UserSummary>, AppError>;

    /// Flip the online flag and record last-seen
    async fn set_presence(
        &self,
        user_id: i64,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

/// UserService implementation
pub struct UserServiceImpl {
    users: Arc<dyn UserRepository>,
}

impl UserServiceImpl {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

fn user_not_found(user_id: i64) -> AppError {
    AppError::NotFound(format!("User {} not found", user_id))
}

#[async_trait]
impl UserService for UserServiceImpl {
    async fn get_profile(&self, user_id: i64) -> Result<ProfileResponse, AppError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| user_not_found(user_id))?;

        Ok(ProfileResponse::from(&user))
    }

    async fn update_profile(
        &self,
        user_id: i64,
        mut update: ProfileUpdate,
    ) -> Result<ProfileResponse, AppError> {
        if let Some(name) = update.name.as_mut() {
            *name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::InvalidArgument("Name cannot be empty".into()));
            }
        }
        if let Some(status) = update.status_text.as_mut() {
            *status = status.trim().to_string();
        }

        let user = self.users.update_profile(user_id, &update).await?;
        tracing::debug!(user_id, "Profile updated");

        Ok(ProfileResponse::from(&user))
    }

    async fn get_user(&self, user_id: i64) -> Result<UserSummary, AppError> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|u| UserSummary::from(&u))
            .ok_or_else(|| user_not_found(user_id))
    }

    async fn find_by_virtual_number(&self, number: &str) -> Result<UserSummary, AppError> {
        let number = VirtualNumber::parse(number).ok_or_else(|| {
            AppError::InvalidArgument(format!("Invalid virtual number: {}", number))
        })?;

        self.users
            .find_by_virtual_number(number.as_str())
            .await?
            .map(|u| UserSummary::from(&u))
            .ok_or_else(|| AppError::NotFound(format!("No user with number {}", number)))
    }

    async fn search(&self, requester_id: i64, term: &str) -> Result<Vec<UserSummary>, AppError> {
        let term = term.trim();
        if term.is_empty() {
            return Err(AppError::InvalidArgument("Search term is required".into()));
        }

        let users = self
            .users
            .search(term, requester_id, USER_SEARCH_LIMIT)
            .await?;

        Ok(users.iter().map(UserSummary::from).collect())
    }

    async fn set_presence(
        &self,
        user_id: i64,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.users.set_presence(user_id, online, at).await
    }
}
