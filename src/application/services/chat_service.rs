//! Chat Service
//!
//! Chat registry operations: individual and group creation, listing,
//! membership changes, metadata and the last-message pointer.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::application::dto::{ChatResponse, IndividualChatResult, MessagePreview};
use crate::domain::services::MembershipPolicy;
use crate::domain::{
    Chat, ChatMetadataUpdate, ChatRepository, ChatType, MessageRepository, Participant,
    ParticipantRole, UserRepository,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Input for a new group chat
#[derive(Debug, Clone, Default)]
pub struct NewGroup {
    pub name: String,
    pub participant_ids: Vec<i64>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
}

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Return the active chat for the pair, creating it if needed
    async fn create_individual(
        &self,
        creator_id: i64,
        other_id: i64,
    ) -> Result<IndividualChatResult, AppError>;

    /// Create a group with the creator as admin
    async fn create_group(&self, creator_id: i64, group: NewGroup)
        -> Result<ChatResponse, AppError>;

    /// Active chats of a user, most recently updated first
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<ChatResponse>, AppError>;

    /// Hydrated chat; the requester must participate
    async fn get_by_id(&self, chat_id: i64, requester_id: i64) -> Result<ChatResponse, AppError>;

    /// Raw chat entity
    async fn find_chat(&self, chat_id: i64) -> Result<Chat, AppError>;

    /// Membership gate for chat and message operations; `NotFound` for an unknown chat
    async fn is_participant(&self, chat_id: i64, user_id: i64) -> Result<bool, AppError>;

    /// Ids of the active chats a user participates in
    async fn active_chat_ids(&self, user_id: i64) -> Result<Vec<i64>, AppError>;

    async fn add_participant(
        &self,
        chat_id: i64,
        acting_id: i64,
        new_user_id: i64,
        role: ParticipantRole,
    ) -> Result<ChatResponse, AppError>;

    async fn remove_participant(
        &self,
        chat_id: i64,
        acting_id: i64,
        target_id: i64,
    ) -> Result<ChatResponse, AppError>;

    async fn update_metadata(
        &self,
        chat_id: i64,
        acting_id: i64,
        update: ChatMetadataUpdate,
    ) -> Result<ChatResponse, AppError>;

    /// Point the chat at its newest message and bump its updated time
    async fn record_last_message(&self, chat_id: i64, message_id: i64) -> Result<(), AppError>;

    /// Soft-deactivate; history stays reachable
    async fn deactivate(&self, chat_id: i64, acting_id: i64) -> Result<(), AppError>;
}

/// ChatService implementation
pub struct ChatServiceImpl {
    chats: Arc<dyn ChatRepository>,
    users: Arc<dyn UserRepository>,
    messages: Arc<dyn MessageRepository>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl ChatServiceImpl {
    pub fn new(
        chats: Arc<dyn ChatRepository>,
        users: Arc<dyn UserRepository>,
        messages: Arc<dyn MessageRepository>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            chats,
            users,
            messages,
            id_generator,
        }
    }

    async fn hydrate(&self, chat: &Chat) -> Result<ChatResponse, AppError> {
        let users = self.users.find_by_ids(&chat.participant_ids()).await?;
        let mut view = ChatResponse::new(chat, &users);

        if let Some(last_id) = chat.last_message_id {
            view.last_message = self
                .messages
                .find_by_id(last_id)
                .await?
                .as_ref()
                .map(MessagePreview::from);
        }
        Ok(view)
    }

    async fn ensure_user_exists(&self, user_id: i64) -> Result<(), AppError> {
        match self.users.find_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound(format!("User {} not found", user_id))),
        }
    }
}

#[async_trait]
impl ChatService for ChatServiceImpl {
    async fn create_individual(
        &self,
        creator_id: i64,
        other_id: i64,
    ) -> Result<IndividualChatResult, AppError> {
        if creator_id == other_id {
            return Err(AppError::InvalidArgument(
                "Cannot start a chat with yourself".into(),
            ));
        }
        self.ensure_user_exists(creator_id).await?;
        self.ensure_user_exists(other_id).await?;

        if let Some(existing) = self.chats.find_individual(creator_id, other_id).await? {
            return Ok(IndividualChatResult {
                chat: self.hydrate(&existing).await?,
                created: false,
            });
        }

        let chat = Chat::individual(self.id_generator.generate(), creator_id, other_id, Utc::now());
        match self.chats.create(&chat).await {
            Ok(created) => {
                tracing::info!(chat_id = created.id, creator_id, other_id, "Individual chat created");
                Ok(IndividualChatResult {
                    chat: self.hydrate(&created).await?,
                    created: true,
                })
            }
            // Lost a race with a concurrent create for the same pair.
            Err(AppError::Conflict(_)) => {
                let existing = self
                    .chats
                    .find_individual(creator_id, other_id)
                    .await?
                    .ok_or_else(|| AppError::Internal("Individual chat vanished".into()))?;
                Ok(IndividualChatResult {
                    chat: self.hydrate(&existing).await?,
                    created: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    async fn create_group(
        &self,
        creator_id: i64,
        group: NewGroup,
    ) -> Result<ChatResponse, AppError> {
        let name = group.name.trim();
        if name.is_empty() {
            return Err(AppError::InvalidArgument("Group name is required".into()));
        }

        let mut seen = HashSet::new();
        let others: Vec<i64> = group
            .participant_ids
            .into_iter()
            .filter(|id| *id != creator_id && seen.insert(*id))
            .collect();
        if others.is_empty() {
            return Err(AppError::InvalidArgument(
                "A group needs at least one other participant".into(),
            ));
        }

        self.ensure_user_exists(creator_id).await?;
        let found = self.users.find_by_ids(&others).await?;
        if let Some(missing) = others.iter().find(|id| !found.iter().any(|u| u.id == **id)) {
            return Err(AppError::NotFound(format!("User {} not found", missing)));
        }

        let now = Utc::now();
        let mut participants = vec![Participant::new(creator_id, ParticipantRole::Admin, now)];
        participants.extend(
            others
                .iter()
                .map(|id| Participant::new(*id, ParticipantRole::Member, now)),
        );

        let chat = Chat {
            id: self.id_generator.generate(),
            chat_type: ChatType::Group,
            name: Some(name.to_string()),
            description: group.description,
            avatar_url: group.avatar_url,
            participants,
            last_message_id: None,
            is_active: true,
            created_by: creator_id,
            created_at: now,
            updated_at: now,
        };

        let created = self.chats.create(&chat).await?;
        tracing::info!(
            chat_id = created.id,
            creator_id,
            members = created.participants.len(),
            "Group chat created"
        );

        self.hydrate(&created).await
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<ChatResponse>, AppError> {
        let chats = self.chats.find_by_user(user_id).await?;

        let user_ids: Vec<i64> = chats
            .iter()
            .flat_map(|c| c.participant_ids())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let users = self.users.find_by_ids(&user_ids).await?;

        let last_ids: Vec<i64> = chats.iter().filter_map(|c| c.last_message_id).collect();
        let last_messages = self.messages.find_by_ids(&last_ids).await?;

        let mut views = Vec::with_capacity(chats.len());
        for chat in &chats {
            let mut view = ChatResponse::new(chat, &users);
            view.last_message = chat
                .last_message_id
                .and_then(|id| last_messages.iter().find(|m| m.id == id))
                .map(MessagePreview::from);
            view.unread_count = Some(self.messages.count_unread(chat.id, user_id).await?);
            views.push(view);
        }
        Ok(views)
    }

    async fn get_by_id(&self, chat_id: i64, requester_id: i64) -> Result<ChatResponse, AppError> {
        let chat = self.find_chat(chat_id).await?;
        MembershipPolicy::ensure_participant(&chat, requester_id)?;
        self.hydrate(&chat).await
    }

    async fn find_chat(&self, chat_id: i64) -> Result<Chat, AppError> {
        self.chats
            .find_by_id(chat_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Chat {} not found", chat_id)))
    }

    async fn is_participant(&self, chat_id: i64, user_id: i64) -> Result<bool, AppError> {
        if self.chats.is_participant(chat_id, user_id).await? {
            return Ok(true);
        }
        self.find_chat(chat_id).await?;
        Ok(false)
    }

    async fn active_chat_ids(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        Ok(self
            .chats
            .find_by_user(user_id)
            .await?
            .iter()
            .map(|c| c.id)
            .collect())
    }

    async fn add_participant(
        &self,
        chat_id: i64,
        acting_id: i64,
        new_user_id: i64,
        role: ParticipantRole,
    ) -> Result<ChatResponse, AppError> {
        let chat = self.find_chat(chat_id).await?;
        MembershipPolicy::ensure_group(&chat)?;
        MembershipPolicy::ensure_admin(&chat, acting_id)?;
        self.ensure_user_exists(new_user_id).await?;

        if chat.is_participant(new_user_id) {
            return Err(AppError::Conflict(
                "User is already a participant".into(),
            ));
        }

        let updated = self
            .chats
            .add_participant(chat_id, &Participant::new(new_user_id, role, Utc::now()))
            .await?;
        tracing::info!(chat_id, acting_id, new_user_id, "Participant added");

        self.hydrate(&updated).await
    }

    async fn remove_participant(
        &self,
        chat_id: i64,
        acting_id: i64,
        target_id: i64,
    ) -> Result<ChatResponse, AppError> {
        let chat = self.find_chat(chat_id).await?;
        MembershipPolicy::ensure_group(&chat)?;
        MembershipPolicy::ensure_can_remove(&chat, acting_id, target_id)?;

        let updated = self.chats.remove_participant(chat_id, target_id).await?;
        tracing::info!(chat_id, acting_id, target_id, "Participant removed");

        self.hydrate(&updated).await
    }

    async fn update_metadata(
        &self,
        chat_id: i64,
        acting_id: i64,
        mut update: ChatMetadataUpdate,
    ) -> Result<ChatResponse, AppError> {
        let chat = self.find_chat(chat_id).await?;
        MembershipPolicy::ensure_group(&chat)?;
        MembershipPolicy::ensure_admin(&chat, acting_id)?;

        if let Some(name) = update.name.as_mut() {
            *name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::InvalidArgument("Group name cannot be empty".into()));
            }
        }
        if update.is_empty() {
            return self.hydrate(&chat).await;
        }

        let updated = self.chats.update_metadata(chat_id, &update, Utc::now()).await?;
        self.hydrate(&updated).await
    }

    async fn record_last_message(&self, chat_id: i64, message_id: i64) -> Result<(), AppError> {
        self.chats
            .update_last_message(chat_id, message_id, Utc::now())
            .await
    }

    async fn deactivate(&self, chat_id: i64, acting_id: i64) -> Result<(), AppError> {
        let chat = self.find_chat(chat_id).await?;
        MembershipPolicy::ensure_can_deactivate(&chat, acting_id)?;

        self.chats.deactivate(chat_id, Utc::now()).await?;
        tracing::info!(chat_id, acting_id, "Chat deactivated");
        Ok(())
    }
}
