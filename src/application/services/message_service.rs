//! Message Service
//!
//! Message store operations: send (text or attachment), paging, read
//! receipts, soft deletion, editing and unread accounting.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::ChatService;
use crate::application::dto::{
    MarkReadResponse, MessagePageResponse, MessageResponse, UnreadCountResponse,
};
use crate::domain::services::MembershipPolicy;
use crate::domain::{
    validate_upload, BlobStore, Message, MessageRepository, MessageType, UserRepository,
    MAX_TEXT_LENGTH,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Default page size for history listings
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Largest page a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// A message to be created
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: i64,
    pub content: String,
    pub message_type: MessageType,
    pub reply_to: Option<i64>,
}

/// An uploaded file to be sent as a message
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub chat_id: i64,
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub reply_to: Option<i64>,
}

/// A result tagged with the chat it belongs to, for room fan-out.
#[derive(Debug, Clone)]
pub struct InChat<T> {
    pub chat_id: i64,
    pub value: T,
}

/// Message service trait
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Create a message and advance the chat's last-message pointer
    async fn send(&self, sender_id: i64, message: NewMessage)
        -> Result<MessageResponse, AppError>;

    /// Store an attachment and send it as a media message
    async fn send_attachment(
        &self,
        sender_id: i64,
        attachment: NewAttachment,
    ) -> Result<MessageResponse, AppError>;

    /// One page of history, oldest to newest
    async fn list_page(
        &self,
        chat_id: i64,
        requester_id: i64,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<MessagePageResponse, AppError>;

    /// Add a read receipt to one message (idempotent)
    async fn mark_read(
        &self,
        message_id: i64,
        reader_id: i64,
    ) -> Result<InChat<MarkReadResponse>, AppError>;

    /// Add read receipts to the given (or all) messages of a chat
    async fn mark_many_read(
        &self,
        chat_id: i64,
        reader_id: i64,
        message_ids: Option<Vec<i64>>,
    ) -> Result<MarkReadResponse, AppError>;

    /// Sender-only soft delete
    async fn soft_delete(
        &self,
        message_id: i64,
        acting_id: i64,
    ) -> Result<InChat<MessageResponse>, AppError>;

    /// Sender-only edit of a text message
    async fn edit_content(
        &self,
        message_id: i64,
        acting_id: i64,
        content: &str,
    ) -> Result<InChat<MessageResponse>, AppError>;

    async fn count_unread(
        &self,
        chat_id: i64,
        reader_id: i64,
    ) -> Result<UnreadCountResponse, AppError>;

    /// Unread messages across the reader's active chats, newest first
    async fn find_unread_across_user(
        &self,
        reader_id: i64,
    ) -> Result<Vec<MessageResponse>, AppError>;
}

/// MessageService implementation
pub struct MessageServiceImpl {
    messages: Arc<dyn MessageRepository>,
    chats: Arc<dyn ChatService>,
    users: Arc<dyn UserRepository>,
    blobs: Arc<dyn BlobStore>,
    id_generator: Arc<SnowflakeGenerator>,
    max_file_size: usize,
}

impl MessageServiceImpl {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        chats: Arc<dyn ChatService>,
        users: Arc<dyn UserRepository>,
        blobs: Arc<dyn BlobStore>,
        id_generator: Arc<SnowflakeGenerator>,
        max_file_size: usize,
    ) -> Self {
        Self {
            messages,
            chats,
            users,
            blobs,
            id_generator,
            max_file_size,
        }
    }

    /// The user must participate in the chat.
    async fn ensure_member(&self, chat_id: i64, user_id: i64) -> Result<(), AppError> {
        if self.chats.is_participant(chat_id, user_id).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "You are not a participant in this chat".into(),
            ))
        }
    }

    /// Membership plus an active chat, required for new messages.
    async fn ensure_can_post(&self, chat_id: i64, sender_id: i64) -> Result<(), AppError> {
        self.ensure_member(chat_id, sender_id).await?;
        let chat = self.chats.find_chat(chat_id).await?;
        MembershipPolicy::ensure_active(&chat)
    }

    async fn find_message(&self, message_id: i64) -> Result<Message, AppError> {
        self.messages
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))
    }

    async fn ensure_reply_target(&self, chat_id: i64, reply_to: Option<i64>) -> Result<(), AppError> {
        let Some(reply_id) = reply_to else {
            return Ok(());
        };
        match self.messages.find_by_id(reply_id).await? {
            Some(target) if target.chat_id == chat_id => Ok(()),
            _ => Err(AppError::InvalidArgument(format!(
                "Reply target {} is not a message in this chat",
                reply_id
            ))),
        }
    }

    /// Create, then advance the pointer. The two writes are not atomic.
    async fn store(&self, message: Message) -> Result<MessageResponse, AppError> {
        let created = self.messages.create(&message).await?;
        self.chats
            .record_last_message(created.chat_id, created.id)
            .await?;

        tracing::debug!(
            chat_id = created.chat_id,
            message_id = created.id,
            message_type = %created.message_type,
            "Message stored"
        );

        self.hydrate_one(&created).await
    }

    async fn hydrate_one(&self, message: &Message) -> Result<MessageResponse, AppError> {
        let mut views = self.hydrate(std::slice::from_ref(message)).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal("Message hydration produced nothing".into()))
    }

    /// Resolve senders and reply previews for a batch of messages.
    async fn hydrate(&self, messages: &[Message]) -> Result<Vec<MessageResponse>, AppError> {
        let reply_ids: Vec<i64> = messages.iter().filter_map(|m| m.reply_to_id).collect();
        let replies = if reply_ids.is_empty() {
            Vec::new()
        } else {
            self.messages.find_by_ids(&reply_ids).await?
        };

        let user_ids: Vec<i64> = messages
            .iter()
            .map(|m| m.sender_id)
            .chain(replies.iter().map(|r| r.sender_id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let users = self.users.find_by_ids(&user_ids).await?;

        Ok(messages
            .iter()
            .map(|m| {
                let reply = m
                    .reply_to_id
                    .and_then(|id| replies.iter().find(|r| r.id == id));
                MessageResponse::new(m, reply, &users)
            })
            .collect())
    }
}

/// Trim and bound text content.
fn normalize_content(content: &str, message_type: MessageType) -> Result<String, AppError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidArgument(
            "Message content cannot be empty".into(),
        ));
    }
    if message_type.is_text() && trimmed.chars().count() > MAX_TEXT_LENGTH {
        return Err(AppError::InvalidArgument(format!(
            "Message content exceeds {} characters",
            MAX_TEXT_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

#[async_trait]
impl MessageService for MessageServiceImpl {
    async fn send(
        &self,
        sender_id: i64,
        message: NewMessage,
    ) -> Result<MessageResponse, AppError> {
        self.ensure_can_post(message.chat_id, sender_id).await?;
        let content = normalize_content(&message.content, message.message_type)?;
        self.ensure_reply_target(message.chat_id, message.reply_to)
            .await?;

        let now = Utc::now();
        self.store(Message {
            id: self.id_generator.generate(),
            chat_id: message.chat_id,
            sender_id,
            content,
            message_type: message.message_type,
            reply_to_id: message.reply_to,
            read_by: Vec::new(),
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
        .await
    }

    async fn send_attachment(
        &self,
        sender_id: i64,
        attachment: NewAttachment,
    ) -> Result<MessageResponse, AppError> {
        self.ensure_can_post(attachment.chat_id, sender_id).await?;
        let accepted = validate_upload(
            &attachment.filename,
            attachment.content_type.as_deref(),
            attachment.bytes.len(),
            self.max_file_size,
        )?;
        self.ensure_reply_target(attachment.chat_id, attachment.reply_to)
            .await?;

        let id = self.id_generator.generate();
        let key = format!("media-{}.{}", id, accepted.extension);
        let url = self.blobs.put(&key, attachment.bytes).await?;

        let now = Utc::now();
        self.store(Message {
            id,
            chat_id: attachment.chat_id,
            sender_id,
            content: url,
            message_type: accepted.message_type,
            reply_to_id: attachment.reply_to,
            read_by: Vec::new(),
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        })
        .await
    }

    async fn list_page(
        &self,
        chat_id: i64,
        requester_id: i64,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<MessagePageResponse, AppError> {
        self.ensure_member(chat_id, requester_id).await?;

        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let total = self.messages.count_by_chat(chat_id).await?;

        // A page too far out to address is simply past the end
        let mut messages = match (page - 1).checked_mul(limit) {
            Some(offset) if offset < total => {
                self.messages.find_page(chat_id, offset, limit).await?
            }
            _ => Vec::new(),
        };
        messages.reverse();

        Ok(MessagePageResponse {
            messages: self.hydrate(&messages).await?,
            page,
            limit,
            total,
        })
    }

    async fn mark_read(
        &self,
        message_id: i64,
        reader_id: i64,
    ) -> Result<InChat<MarkReadResponse>, AppError> {
        let message = self.find_message(message_id).await?;
        self.ensure_member(message.chat_id, reader_id).await?;

        let added = self
            .messages
            .add_reader(message_id, reader_id, Utc::now())
            .await?;

        Ok(InChat {
            chat_id: message.chat_id,
            value: MarkReadResponse {
                chat_id: message.chat_id.to_string(),
                modified_count: u64::from(added),
            },
        })
    }

    async fn mark_many_read(
        &self,
        chat_id: i64,
        reader_id: i64,
        message_ids: Option<Vec<i64>>,
    ) -> Result<MarkReadResponse, AppError> {
        self.ensure_member(chat_id, reader_id).await?;

        let ids = message_ids.filter(|ids| !ids.is_empty());
        let modified_count = self
            .messages
            .mark_many_read(chat_id, reader_id, ids.as_deref(), Utc::now())
            .await?;

        tracing::debug!(chat_id, reader_id, modified_count, "Messages marked read");

        Ok(MarkReadResponse {
            chat_id: chat_id.to_string(),
            modified_count,
        })
    }

    async fn soft_delete(
        &self,
        message_id: i64,
        acting_id: i64,
    ) -> Result<InChat<MessageResponse>, AppError> {
        let mut message = self.find_message(message_id).await?;
        if message.sender_id != acting_id {
            return Err(AppError::Forbidden(
                "You can only delete your own messages".into(),
            ));
        }

        if !message.is_deleted {
            let now = Utc::now();
            self.messages.soft_delete(message_id, now).await?;
            message.is_deleted = true;
            message.deleted_at = Some(now);
            message.updated_at = now;
            tracing::info!(chat_id = message.chat_id, message_id, "Message deleted");
        }

        Ok(InChat {
            chat_id: message.chat_id,
            value: self.hydrate_one(&message).await?,
        })
    }

    async fn edit_content(
        &self,
        message_id: i64,
        acting_id: i64,
        content: &str,
    ) -> Result<InChat<MessageResponse>, AppError> {
        let message = self.find_message(message_id).await?;
        if message.sender_id != acting_id {
            return Err(AppError::Forbidden(
                "You can only edit your own messages".into(),
            ));
        }
        if message.is_deleted {
            return Err(AppError::InvalidArgument(
                "Deleted messages cannot be edited".into(),
            ));
        }
        if !message.message_type.is_text() {
            return Err(AppError::InvalidArgument(
                "Only text messages can be edited".into(),
            ));
        }

        let content = normalize_content(content, MessageType::Text)?;
        let updated = self
            .messages
            .update_content(message_id, &content, Utc::now())
            .await?;

        Ok(InChat {
            chat_id: updated.chat_id,
            value: self.hydrate_one(&updated).await?,
        })
    }

    async fn count_unread(
        &self,
        chat_id: i64,
        reader_id: i64,
    ) -> Result<UnreadCountResponse, AppError> {
        self.ensure_member(chat_id, reader_id).await?;

        Ok(UnreadCountResponse {
            chat_id: chat_id.to_string(),
            unread_count: self.messages.count_unread(chat_id, reader_id).await?,
        })
    }

    async fn find_unread_across_user(
        &self,
        reader_id: i64,
    ) -> Result<Vec<MessageResponse>, AppError> {
        let chat_ids = self.chats.active_chat_ids(reader_id).await?;
        if chat_ids.is_empty() {
            return Ok(Vec::new());
        }

        let unread = self
            .messages
            .find_unread_for_user(reader_id, &chat_ids)
            .await?;
        self.hydrate(&unread).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::ChatServiceImpl;
    use crate::domain::{
        Chat, ChatRepository, ChatType, MockBlobStore, Participant, ParticipantRole, User,
    };
    use crate::infrastructure::memory::{
        MemoryChatRepository, MemoryMessageRepository, MemoryUserRepository,
    };

    const A: i64 = 1;
    const B: i64 = 2;
    const C: i64 = 3;
    const CHAT: i64 = 100;
    const OTHER_CHAT: i64 = 200;

    struct Fixture {
        service: MessageServiceImpl,
        chats: Arc<MemoryChatRepository>,
    }

    async fn fixture_with(blobs: MockBlobStore) -> Fixture {
        let users = Arc::new(MemoryUserRepository::new());
        for (id, name) in [(A, "Ana"), (B, "Bruno"), (C, "Carla")] {
            users
                .create(&User {
                    id,
                    name: name.into(),
                    email: format!("{}@example.com", name.to_lowercase()),
                    virtual_number: format!("+55119000000{:02}", id),
                    ..User::default()
                })
                .await
                .unwrap();
        }

        let chats = Arc::new(MemoryChatRepository::new());
        let now = Utc::now();
        chats
            .create(&Chat::individual(CHAT, A, B, now))
            .await
            .unwrap();
        chats
            .create(&Chat {
                id: OTHER_CHAT,
                chat_type: ChatType::Group,
                name: Some("Other".into()),
                participants: vec![
                    Participant::new(B, ParticipantRole::Admin, now),
                    Participant::new(C, ParticipantRole::Member, now),
                ],
                ..Chat::individual(OTHER_CHAT, B, C, now)
            })
            .await
            .unwrap();

        let messages = Arc::new(MemoryMessageRepository::new());
        let id_generator = Arc::new(SnowflakeGenerator::new(1));
        let registry = Arc::new(ChatServiceImpl::new(
            chats.clone(),
            users.clone(),
            messages.clone(),
            id_generator.clone(),
        ));

        Fixture {
            service: MessageServiceImpl::new(
                messages,
                registry,
                users,
                Arc::new(blobs),
                id_generator,
                1024,
            ),
            chats,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(MockBlobStore::new()).await
    }

    fn text(chat_id: i64, content: &str) -> NewMessage {
        NewMessage {
            chat_id,
            content: content.into(),
            message_type: MessageType::Text,
            reply_to: None,
        }
    }

    fn id(view: &MessageResponse) -> i64 {
        view.id.parse().unwrap()
    }

    #[tokio::test]
    async fn test_send_read_unread_scenario() {
        let f = fixture().await;

        let sent = f.service.send(A, text(CHAT, "hello")).await.unwrap();

        let page = f.service.list_page(CHAT, B, None, None).await.unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].content, "hello");
        assert_eq!(page.messages[0].sender.id, "1");
        assert_eq!(page.messages[0].message_type, MessageType::Text);
        assert_eq!(page.total, 1);

        assert_eq!(f.service.count_unread(CHAT, B).await.unwrap().unread_count, 1);
        assert_eq!(f.service.count_unread(CHAT, A).await.unwrap().unread_count, 0);

        let first = f.service.mark_read(id(&sent), B).await.unwrap();
        let second = f.service.mark_read(id(&sent), B).await.unwrap();
        assert_eq!(first.value.modified_count, 1);
        assert_eq!(second.value.modified_count, 0);
        assert_eq!(first.chat_id, CHAT);

        assert_eq!(f.service.count_unread(CHAT, B).await.unwrap().unread_count, 0);

        let page = f.service.list_page(CHAT, A, None, None).await.unwrap();
        assert_eq!(page.messages[0].read_by.len(), 1);
    }

    #[tokio::test]
    async fn test_send_updates_last_message_pointer() {
        let f = fixture().await;
        let sent = f.service.send(A, text(CHAT, "hi")).await.unwrap();

        let chat = f.chats.find_by_id(CHAT).await.unwrap().unwrap();
        assert_eq!(chat.last_message_id, Some(id(&sent)));
    }

    #[tokio::test]
    async fn test_send_rejections() {
        let f = fixture().await;

        assert!(matches!(
            f.service.send(C, text(CHAT, "intruder")).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.send(A, text(CHAT, "   ")).await,
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            f.service
                .send(A, text(CHAT, &"x".repeat(MAX_TEXT_LENGTH + 1)))
                .await,
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            f.service.send(A, text(999, "nowhere")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reply_must_stay_in_chat() {
        let f = fixture().await;
        let elsewhere = f.service.send(B, text(OTHER_CHAT, "group msg")).await.unwrap();
        let here = f.service.send(B, text(CHAT, "question")).await.unwrap();

        let mut reply = text(CHAT, "answer");
        reply.reply_to = Some(id(&elsewhere));
        assert!(matches!(
            f.service.send(A, reply.clone()).await,
            Err(AppError::InvalidArgument(_))
        ));

        reply.reply_to = Some(id(&here));
        let sent = f.service.send(A, reply).await.unwrap();
        let preview = sent.reply_to.unwrap();
        assert_eq!(preview.content, "question");
        assert_eq!(preview.sender_name, "Bruno");
    }

    #[tokio::test]
    async fn test_edit_delete_scenario() {
        let f = fixture().await;
        let sent = f.service.send(A, text(CHAT, " v1 ")).await.unwrap();
        let message_id = id(&sent);
        assert_eq!(sent.content, "v1");

        assert!(matches!(
            f.service.edit_content(message_id, B, "hijack").await,
            Err(AppError::Forbidden(_))
        ));

        let edited = f.service.edit_content(message_id, A, "v2").await.unwrap();
        assert_eq!(edited.value.content, "v2");
        let page = f.service.list_page(CHAT, B, None, None).await.unwrap();
        assert_eq!(page.messages[0].content, "v2");

        assert!(matches!(
            f.service.soft_delete(message_id, B).await,
            Err(AppError::Forbidden(_))
        ));

        let deleted = f.service.soft_delete(message_id, A).await.unwrap();
        assert!(deleted.value.is_deleted);
        assert_eq!(deleted.value.content, "");
        assert_eq!(deleted.chat_id, CHAT);

        let page = f.service.list_page(CHAT, B, None, None).await.unwrap();
        assert!(page.messages.is_empty());
        assert_eq!(page.total, 0);

        // Deleting again is a no-op; editing a deleted message is refused.
        assert!(f.service.soft_delete(message_id, A).await.is_ok());
        assert!(matches!(
            f.service.edit_content(message_id, B, "x").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            f.service.edit_content(message_id, A, "v3").await,
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_unread_ignores_deleted_messages() {
        let f = fixture().await;
        let first = f.service.send(A, text(CHAT, "one")).await.unwrap();
        f.service.send(A, text(CHAT, "two")).await.unwrap();
        f.service.send(B, text(CHAT, "mine")).await.unwrap();

        assert_eq!(f.service.count_unread(CHAT, B).await.unwrap().unread_count, 2);

        f.service.soft_delete(id(&first), A).await.unwrap();
        assert_eq!(f.service.count_unread(CHAT, B).await.unwrap().unread_count, 1);
    }

    #[tokio::test]
    async fn test_mark_many_read_all_or_selected() {
        let f = fixture().await;
        let one = f.service.send(A, text(CHAT, "one")).await.unwrap();
        f.service.send(A, text(CHAT, "two")).await.unwrap();
        f.service.send(A, text(CHAT, "three")).await.unwrap();

        let selected = f
            .service
            .mark_many_read(CHAT, B, Some(vec![id(&one)]))
            .await
            .unwrap();
        assert_eq!(selected.modified_count, 1);

        let rest = f.service.mark_many_read(CHAT, B, Some(vec![])).await.unwrap();
        assert_eq!(rest.modified_count, 2);

        let again = f.service.mark_many_read(CHAT, B, None).await.unwrap();
        assert_eq!(again.modified_count, 0);
        assert_eq!(f.service.count_unread(CHAT, B).await.unwrap().unread_count, 0);

        assert!(matches!(
            f.service.mark_many_read(CHAT, C, None).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_list_page_is_chronological_and_paged() {
        let f = fixture().await;
        for i in 1..=5 {
            f.service
                .send(A, text(CHAT, &format!("m{}", i)))
                .await
                .unwrap();
        }

        let newest = f.service.list_page(CHAT, B, Some(1), Some(2)).await.unwrap();
        let contents: Vec<_> = newest.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m4", "m5"]);
        assert_eq!(newest.total, 5);

        let older = f.service.list_page(CHAT, B, Some(2), Some(2)).await.unwrap();
        let contents: Vec<_> = older.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3"]);

        let capped = f.service.list_page(CHAT, B, Some(0), Some(1000)).await.unwrap();
        assert_eq!(capped.page, 1);
        assert_eq!(capped.limit, MAX_PAGE_SIZE);

        let past_end = f.service.list_page(CHAT, B, Some(4), Some(2)).await.unwrap();
        assert!(past_end.messages.is_empty());
        assert_eq!(past_end.total, 5);
    }

    #[tokio::test]
    async fn test_list_page_with_huge_page_number_is_empty() {
        let f = fixture().await;
        f.service.send(A, text(CHAT, "only")).await.unwrap();

        let page = f
            .service
            .list_page(CHAT, B, Some(i64::MAX), Some(MAX_PAGE_SIZE))
            .await
            .unwrap();
        assert!(page.messages.is_empty());
        assert_eq!(page.page, i64::MAX);
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_deactivated_chat_refuses_new_messages_but_keeps_history() {
        let f = fixture().await;
        let before = f.service.send(A, text(CHAT, "last words")).await.unwrap();
        f.chats.deactivate(CHAT, Utc::now()).await.unwrap();

        assert!(matches!(
            f.service.send(B, text(CHAT, "anyone?")).await,
            Err(AppError::Forbidden(_))
        ));
        let chat = f.chats.find_by_id(CHAT).await.unwrap().unwrap();
        assert_eq!(chat.last_message_id, Some(id(&before)));

        let page = f.service.list_page(CHAT, B, None, None).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.messages[0].content, "last words");
    }

    #[tokio::test]
    async fn test_unread_across_user_only_covers_own_chats() {
        let f = fixture().await;
        f.service.send(A, text(CHAT, "for bruno")).await.unwrap();
        f.service.send(C, text(OTHER_CHAT, "group")).await.unwrap();

        let unread_b = f.service.find_unread_across_user(B).await.unwrap();
        assert_eq!(unread_b.len(), 2);
        assert_eq!(unread_b[0].content, "group");

        let unread_a = f.service.find_unread_across_user(A).await.unwrap();
        assert!(unread_a.is_empty());
    }

    #[tokio::test]
    async fn test_send_attachment_stores_blob() {
        let mut blobs = MockBlobStore::new();
        blobs
            .expect_put()
            .withf(|key, bytes| key.starts_with("media-") && key.ends_with(".png") && bytes.len() == 4)
            .times(1)
            .returning(|key, _| Ok(format!("/uploads/{}", key)));
        let f = fixture_with(blobs).await;

        let sent = f
            .service
            .send_attachment(
                A,
                NewAttachment {
                    chat_id: CHAT,
                    filename: "photo.png".into(),
                    content_type: Some("image/png".into()),
                    bytes: vec![1, 2, 3, 4],
                    reply_to: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(sent.message_type, MessageType::Image);
        assert!(sent.content.starts_with("/uploads/media-"));
    }

    #[tokio::test]
    async fn test_send_attachment_rejects_before_storing() {
        let mut blobs = MockBlobStore::new();
        blobs.expect_put().never();
        let f = fixture_with(blobs).await;

        let attachment = |filename: &str, size: usize| NewAttachment {
            chat_id: CHAT,
            filename: filename.into(),
            content_type: None,
            bytes: vec![0; size],
            reply_to: None,
        };

        assert!(matches!(
            f.service.send_attachment(A, attachment("virus.exe", 10)).await,
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            f.service.send_attachment(A, attachment("big.pdf", 2048)).await,
            Err(AppError::InvalidArgument(_))
        ));
        assert!(matches!(
            f.service.send_attachment(C, attachment("doc.pdf", 10)).await,
            Err(AppError::Forbidden(_))
        ));
    }
}
