use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{ProfileUpdate, User, UserRepository};
use crate::shared::error::AppError;

/// In-process user store.
#[derive(Default)]
pub struct MemoryUserRepository {
    users: RwLock<HashMap<i64, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, AppError> {
        let users = self.users.read();
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_virtual_number(&self, number: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.virtual_number == number)
            .cloned())
    }

    async fn create(&self, user: &User) -> Result<User, AppError> {
        let mut users = self.users.write();
        if users
            .values()
            .any(|u| u.email == user.email || u.virtual_number == user.virtual_number)
        {
            return Err(AppError::Conflict(
                "User with this email or virtual number already exists".to_string(),
            ));
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<User, AppError> {
        let mut users = self.users.write();
        let user = users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(avatar) = &update.avatar_url {
            user.avatar_url = Some(avatar.clone());
        }
        if let Some(status) = &update.status_text {
            user.status_text = status.clone();
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn set_presence(
        &self,
        id: i64,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if let Some(user) = self.users.write().get_mut(&id) {
            user.is_online = online;
            user.last_seen = at;
        }
        Ok(())
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.users.read().values().any(|u| u.email == email))
    }

    async fn virtual_number_exists(&self, number: &str) -> Result<bool, AppError> {
        Ok(self
            .users
            .read()
            .values()
            .any(|u| u.virtual_number == number))
    }

    async fn search(
        &self,
        term: &str,
        exclude_id: i64,
        limit: i64,
    ) -> Result<Vec<User>, AppError> {
        let term = term.to_lowercase();
        let mut found: Vec<User> = self
            .users
            .read()
            .values()
            .filter(|u| u.id != exclude_id && u.matches(&term))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }
}
