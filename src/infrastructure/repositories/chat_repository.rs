//! Chat Repository Implementation
//!
//! PostgreSQL implementation of the ChatRepository trait. Participants live
//! in `chat_participants` and are loaded alongside their chats, ordered by
//! their `position` column.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{
    Chat, ChatMetadataUpdate, ChatRepository, ChatType, Participant, ParticipantRole,
};
use crate::shared::error::AppError;

const CHAT_COLUMNS: &str = "c.id, c.chat_type, c.name, c.description, c.avatar_url, \
     c.last_message_id, c.is_active, c.created_by, c.created_at, c.updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ChatRow {
    id: i64,
    chat_type: String,
    name: Option<String>,
    description: Option<String>,
    avatar_url: Option<String>,
    last_message_id: Option<i64>,
    is_active: bool,
    created_by: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatRow {
    fn into_chat(self, participants: Vec<Participant>) -> Chat {
        Chat {
            id: self.id,
            chat_type: ChatType::from_str(&self.chat_type),
            name: self.name,
            description: self.description,
            avatar_url: self.avatar_url,
            participants,
            last_message_id: self.last_message_id,
            is_active: self.is_active,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ParticipantRow {
    chat_id: i64,
    user_id: i64,
    role: String,
    joined_at: DateTime<Utc>,
}

impl ParticipantRow {
    fn into_participant(self) -> Participant {
        Participant::new(self.user_id, ParticipantRole::from_str(&self.role), self.joined_at)
    }
}

/// PostgreSQL chat repository implementation.
#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach participant rolls to a batch of chat rows, preserving row order.
    async fn hydrate(&self, rows: Vec<ChatRow>) -> Result<Vec<Chat>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let participant_rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT chat_id, user_id, role, joined_at
            FROM chat_participants
            WHERE chat_id = ANY($1)
            ORDER BY chat_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_chat: HashMap<i64, Vec<Participant>> = HashMap::new();
        for row in participant_rows {
            by_chat
                .entry(row.chat_id)
                .or_default()
                .push(row.into_participant());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let participants = by_chat.remove(&row.id).unwrap_or_default();
                row.into_chat(participants)
            })
            .collect())
    }

    async fn fetch_one(&self, id: i64) -> Result<Option<Chat>, AppError> {
        let sql = format!("SELECT {CHAT_COLUMNS} FROM chats c WHERE c.id = $1");
        let row = sqlx::query_as::<_, ChatRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn require(&self, id: i64) -> Result<Chat, AppError> {
        self.fetch_one(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Chat not found".to_string()))
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn create(&self, chat: &Chat) -> Result<Chat, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO chats (id, chat_type, name, description, avatar_url, direct_key,
                               last_message_id, is_active, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(chat.id)
        .bind(chat.chat_type.as_str())
        .bind(&chat.name)
        .bind(&chat.description)
        .bind(&chat.avatar_url)
        .bind(chat.own_direct_key())
        .bind(chat.last_message_id)
        .bind(chat.is_active)
        .bind(chat.created_by)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("An active chat already exists for this pair".to_string())
            }
            _ => AppError::Database(e),
        })?;

        for (position, participant) in chat.participants.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO chat_participants (chat_id, user_id, role, position, joined_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(chat.id)
            .bind(participant.user_id)
            .bind(participant.role.as_str())
            .bind(position as i32)
            .bind(participant.joined_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(chat.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Chat>, AppError> {
        self.fetch_one(id).await
    }

    async fn find_individual(&self, a: i64, b: i64) -> Result<Option<Chat>, AppError> {
        let sql = format!(
            r#"
            SELECT {CHAT_COLUMNS}
            FROM chats c
            WHERE c.direct_key = $1 AND c.is_active AND c.chat_type = 'individual'
            "#
        );
        let row = sqlx::query_as::<_, ChatRow>(&sql)
            .bind(Chat::direct_key(a, b))
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Chat>, AppError> {
        let sql = format!(
            r#"
            SELECT {CHAT_COLUMNS}
            FROM chats c
            JOIN chat_participants p ON p.chat_id = c.id
            WHERE p.user_id = $1 AND c.is_active
            ORDER BY c.updated_at DESC, c.id ASC
            "#
        );
        let rows = sqlx::query_as::<_, ChatRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        self.hydrate(rows).await
    }

    async fn is_participant(&self, chat_id: i64, user_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM chat_participants WHERE chat_id = $1 AND user_id = $2)",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn add_participant(
        &self,
        chat_id: i64,
        participant: &Participant,
    ) -> Result<Chat, AppError> {
        sqlx::query(
            r#"
            INSERT INTO chat_participants (chat_id, user_id, role, position, joined_at)
            SELECT $1, $2, $3,
                   COALESCE((SELECT MAX(position) + 1 FROM chat_participants WHERE chat_id = $1), 0),
                   $4
            "#,
        )
        .bind(chat_id)
        .bind(participant.user_id)
        .bind(participant.role.as_str())
        .bind(participant.joined_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("User is already a participant".to_string())
            }
            _ => AppError::Database(e),
        })?;

        sqlx::query("UPDATE chats SET updated_at = $2 WHERE id = $1")
            .bind(chat_id)
            .bind(participant.joined_at)
            .execute(&self.pool)
            .await?;

        self.require(chat_id).await
    }

    async fn remove_participant(&self, chat_id: i64, user_id: i64) -> Result<Chat, AppError> {
        let result =
            sqlx::query("DELETE FROM chat_participants WHERE chat_id = $1 AND user_id = $2")
                .bind(chat_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(
                "User is not a participant in this chat".to_string(),
            ));
        }

        sqlx::query("UPDATE chats SET updated_at = NOW() WHERE id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        self.require(chat_id).await
    }

    async fn update_metadata(
        &self,
        chat_id: i64,
        update: &ChatMetadataUpdate,
        at: DateTime<Utc>,
    ) -> Result<Chat, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE chats
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                avatar_url = COALESCE($4, avatar_url),
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .bind(&update.name)
        .bind(&update.description)
        .bind(&update.avatar_url)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Chat not found".to_string()));
        }

        self.require(chat_id).await
    }

    async fn update_last_message(
        &self,
        chat_id: i64,
        message_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE chats SET last_message_id = $2, updated_at = $3 WHERE id = $1")
            .bind(chat_id)
            .bind(message_id)
            .bind(at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn deactivate(&self, chat_id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE chats SET is_active = FALSE, updated_at = $2 WHERE id = $1")
                .bind(chat_id)
                .bind(at)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Chat not found".to_string()));
        }

        Ok(())
    }
}
