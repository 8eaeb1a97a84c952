use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::{Message, MessageRepository};
use crate::shared::error::AppError;

/// In-process message store.
#[derive(Default)]
pub struct MemoryMessageRepository {
    messages: RwLock<HashMap<i64, Message>>,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Message not found".to_string())
}

/// Newest first, ties by id descending (matches the SQL ordering).
fn newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        self.messages.write().insert(message.id, message.clone());
        Ok(message.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        Ok(self.messages.read().get(&id).cloned())
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Message>, AppError> {
        let messages = self.messages.read();
        Ok(ids
            .iter()
            .filter_map(|id| messages.get(id).cloned())
            .collect())
    }

    async fn find_page(
        &self,
        chat_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let mut found: Vec<Message> = self
            .messages
            .read()
            .values()
            .filter(|m| m.chat_id == chat_id && !m.is_deleted)
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_by_chat(&self, chat_id: i64) -> Result<i64, AppError> {
        Ok(self
            .messages
            .read()
            .values()
            .filter(|m| m.chat_id == chat_id && !m.is_deleted)
            .count() as i64)
    }

    async fn add_reader(
        &self,
        message_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut messages = self.messages.write();
        let message = messages.get_mut(&message_id).ok_or_else(not_found)?;
        Ok(message.add_reader(user_id, at))
    }

    async fn mark_many_read(
        &self,
        chat_id: i64,
        reader_id: i64,
        ids: Option<&[i64]>,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut modified = 0;
        for message in self.messages.write().values_mut() {
            if message.chat_id != chat_id || message.is_deleted {
                continue;
            }
            if let Some(ids) = ids {
                if !ids.contains(&message.id) {
                    continue;
                }
            }
            if message.add_reader(reader_id, at) {
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn soft_delete(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut messages = self.messages.write();
        let message = messages.get_mut(&id).ok_or_else(not_found)?;
        message.is_deleted = true;
        message.deleted_at = Some(at);
        message.updated_at = at;
        Ok(())
    }

    async fn update_content(
        &self,
        id: i64,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Message, AppError> {
        let mut messages = self.messages.write();
        let message = messages.get_mut(&id).ok_or_else(not_found)?;
        message.content = content.to_string();
        message.updated_at = at;
        Ok(message.clone())
    }

    async fn count_unread(&self, chat_id: i64, reader_id: i64) -> Result<i64, AppError> {
        Ok(self
            .messages
            .read()
            .values()
            .filter(|m| m.chat_id == chat_id && m.is_unread_for(reader_id))
            .count() as i64)
    }

    async fn find_unread_for_user(
        &self,
        reader_id: i64,
        chat_ids: &[i64],
    ) -> Result<Vec<Message>, AppError> {
        let mut found: Vec<Message> = self
            .messages
            .read()
            .values()
            .filter(|m| chat_ids.contains(&m.chat_id) && m.is_unread_for(reader_id))
            .cloned()
            .collect();
        newest_first(&mut found);
        Ok(found)
    }
}
