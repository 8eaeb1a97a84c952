use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{Chat, ChatMetadataUpdate, ChatRepository, Participant};
use crate::shared::error::AppError;

/// In-process chat store.
///
/// The active-individual-pair rule is checked under the write lock, which
/// gives the same guarantee as the partial unique index in PostgreSQL.
#[derive(Default)]
pub struct MemoryChatRepository {
    chats: RwLock<HashMap<i64, Chat>>,
}

impl MemoryChatRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Chat not found".to_string())
}

#[async_trait]
impl ChatRepository for MemoryChatRepository {
    async fn create(&self, chat: &Chat) -> Result<Chat, AppError> {
        let mut chats = self.chats.write();
        if let Some(key) = chat.own_direct_key() {
            let taken = chats
                .values()
                .any(|c| c.is_active && c.own_direct_key().as_deref() == Some(key.as_str()));
            if taken {
                return Err(AppError::Conflict(
                    "An active chat already exists for this pair".to_string(),
                ));
            }
        }
        chats.insert(chat.id, chat.clone());
        Ok(chat.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError> {
        Ok(self.chats.read().get(&id).cloned())
    }

    async fn find_individual(&self, a: i64, b: i64) -> Result<Option<Chat>, AppError> {
        let key = Chat::direct_key(a, b);
        Ok(self
            .chats
            .read()
            .values()
            .find(|c| c.is_active && c.own_direct_key().as_deref() == Some(key.as_str()))
            .cloned())
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Chat>, AppError> {
        let mut found: Vec<Chat> = self
            .chats
            .read()
            .values()
            .filter(|c| c.is_active && c.is_participant(user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn is_participant(&self, chat_id: i64, user_id: i64) -> Result<bool, AppError> {
        Ok(self
            .chats
            .read()
            .get(&chat_id)
            .map(|c| c.is_participant(user_id))
            .unwrap_or(false))
    }

    async fn add_participant(
        &self,
        chat_id: i64,
        participant: &Participant,
    ) -> Result<Chat, AppError> {
        let mut chats = self.chats.write();
        let chat = chats.get_mut(&chat_id).ok_or_else(not_found)?;
        if chat.is_participant(participant.user_id) {
            return Err(AppError::Conflict(
                "User is already a participant".to_string(),
            ));
        }
        chat.participants.push(participant.clone());
        chat.updated_at = participant.joined_at;
        Ok(chat.clone())
    }

    async fn remove_participant(&self, chat_id: i64, user_id: i64) -> Result<Chat, AppError> {
        let mut chats = self.chats.write();
        let chat = chats.get_mut(&chat_id).ok_or_else(not_found)?;
        let before = chat.participants.len();
        chat.participants.retain(|p| p.user_id != user_id);
        if chat.participants.len() == before {
            return Err(AppError::NotFound(
                "User is not a participant in this chat".to_string(),
            ));
        }
        chat.updated_at = Utc::now();
        Ok(chat.clone())
    }

    async fn update_metadata(
        &self,
        chat_id: i64,
        update: &ChatMetadataUpdate,
        at: DateTime<Utc>,
    ) -> Result<Chat, AppError> {
        let mut chats = self.chats.write();
        let chat = chats.get_mut(&chat_id).ok_or_else(not_found)?;
        if let Some(name) = &update.name {
            chat.name = Some(name.clone());
        }
        if let Some(description) = &update.description {
            chat.description = Some(description.clone());
        }
        if let Some(avatar) = &update.avatar_url {
            chat.avatar_url = Some(avatar.clone());
        }
        chat.updated_at = at;
        Ok(chat.clone())
    }

    async fn update_last_message(
        &self,
        chat_id: i64,
        message_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if let Some(chat) = self.chats.write().get_mut(&chat_id) {
            chat.last_message_id = Some(message_id);
            chat.updated_at = at;
        }
        Ok(())
    }

    async fn deactivate(&self, chat_id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut chats = self.chats.write();
        let chat = chats.get_mut(&chat_id).ok_or_else(not_found)?;
        chat.is_active = false;
        chat.updated_at = at;
        Ok(())
    }
}
