//! Message Repository Implementation
//!
//! PostgreSQL implementation of the MessageRepository trait.
//!
//! ## Read receipts
//!
//! Receipts are rows of `message_reads`, keyed by `(message_id, user_id)`.
//! The primary key makes a second receipt for the same reader impossible, so
//! every insert uses `ON CONFLICT DO NOTHING` and the affected-row count tells
//! whether the reader was new.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Message, MessageRepository, MessageType, ReadReceipt};
use crate::shared::error::AppError;

const MESSAGE_COLUMNS: &str = "m.id, m.chat_id, m.sender_id, m.content, m.message_type, \
     m.reply_to_id, m.is_deleted, m.deleted_at, m.created_at, m.updated_at";

/// Database row representation for messages.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    chat_id: i64,
    sender_id: i64,
    content: String,
    message_type: String,
    reply_to_id: Option<i64>,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MessageRow {
    /// Convert database row to domain Message entity.
    fn into_message(self, read_by: Vec<ReadReceipt>) -> Message {
        Message {
            id: self.id,
            chat_id: self.chat_id,
            sender_id: self.sender_id,
            content: self.content,
            message_type: MessageType::from_str(&self.message_type),
            reply_to_id: self.reply_to_id,
            read_by,
            is_deleted: self.is_deleted,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReadRow {
    message_id: i64,
    user_id: i64,
    read_at: DateTime<Utc>,
}

/// PostgreSQL message repository implementation.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Create a new PgMessageRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Attach read receipts to a batch of rows, preserving row order.
    async fn hydrate(&self, rows: Vec<MessageRow>) -> Result<Vec<Message>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let reads = sqlx::query_as::<_, ReadRow>(
            r#"
            SELECT message_id, user_id, read_at
            FROM message_reads
            WHERE message_id = ANY($1)
            ORDER BY read_at, user_id
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_message: HashMap<i64, Vec<ReadReceipt>> = HashMap::new();
        for read in reads {
            by_message
                .entry(read.message_id)
                .or_default()
                .push(ReadReceipt {
                    user_id: read.user_id,
                    read_at: read.read_at,
                });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let read_by = by_message.remove(&row.id).unwrap_or_default();
                row.into_message(read_by)
            })
            .collect())
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, chat_id, sender_id, content, message_type, reply_to_id,
                                  is_deleted, deleted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(message.id)
        .bind(message.chat_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.message_type.as_str())
        .bind(message.reply_to_id)
        .bind(message.is_deleted)
        .bind(message.deleted_at)
        .bind(message.created_at)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(message.clone())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.id = $1");
        let row = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Message>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.id = ANY($1)");
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        self.hydrate(rows).await
    }

    async fn find_page(
        &self,
        chat_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Message>, AppError> {
        let sql = format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages m
            WHERE m.chat_id = $1 AND NOT m.is_deleted
            ORDER BY m.created_at DESC, m.id DESC
            OFFSET $2
            LIMIT $3
            "#
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(chat_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        self.hydrate(rows).await
    }

    async fn count_by_chat(&self, chat_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE chat_id = $1 AND NOT is_deleted",
        )
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn add_reader(
        &self,
        message_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO message_reads (message_id, user_id, read_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_many_read(
        &self,
        chat_id: i64,
        reader_id: i64,
        ids: Option<&[i64]>,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO message_reads (message_id, user_id, read_at)
            SELECT m.id, $2, $4
            FROM messages m
            WHERE m.chat_id = $1
              AND NOT m.is_deleted
              AND ($3::BIGINT[] IS NULL OR m.id = ANY($3))
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(chat_id)
        .bind(reader_id)
        .bind(ids.map(|ids| ids.to_vec()))
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn soft_delete(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE messages SET is_deleted = TRUE, deleted_at = $2, updated_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Message not found".to_string()));
        }

        Ok(())
    }

    async fn update_content(
        &self,
        id: i64,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Message, AppError> {
        let result = sqlx::query("UPDATE messages SET content = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(content)
            .bind(at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Message not found".to_string()));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))
    }

    async fn count_unread(&self, chat_id: i64, reader_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages m
            WHERE m.chat_id = $1
              AND NOT m.is_deleted
              AND m.sender_id <> $2
              AND NOT EXISTS (
                  SELECT 1 FROM message_reads r WHERE r.message_id = m.id AND r.user_id = $2
              )
            "#,
        )
        .bind(chat_id)
        .bind(reader_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn find_unread_for_user(
        &self,
        reader_id: i64,
        chat_ids: &[i64],
    ) -> Result<Vec<Message>, AppError> {
        if chat_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages m
            WHERE m.chat_id = ANY($2)
              AND NOT m.is_deleted
              AND m.sender_id <> $1
              AND NOT EXISTS (
                  SELECT 1 FROM message_reads r WHERE r.message_id = m.id AND r.user_id = $1
              )
            ORDER BY m.created_at DESC, m.id DESC
            "#
        );
        let rows = sqlx::query_as::<_, MessageRow>(&sql)
            .bind(reader_id)
            .bind(chat_ids)
            .fetch_all(&self.pool)
            .await?;

        self.hydrate(rows).await
    }
}
