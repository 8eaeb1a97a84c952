//! Contact Repository Implementation
//!
//! PostgreSQL implementation of the ContactRepository trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::user_repository::escape_like;
use crate::domain::{Contact, ContactFilter, ContactRepository};
use crate::shared::error::AppError;

const CONTACT_COLUMNS: &str = "id, owner_id, target_id, name, is_blocked, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: i64,
    owner_id: i64,
    target_id: i64,
    name: String,
    is_blocked: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ContactRow {
    fn into_contact(self) -> Contact {
        Contact {
            id: self.id,
            owner_id: self.owner_id,
            target_id: self.target_id,
            name: self.name,
            is_blocked: self.is_blocked,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// PostgreSQL contact repository implementation.
#[derive(Clone)]
pub struct PgContactRepository {
    pool: PgPool,
}

impl PgContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Contact>, AppError> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1");
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ContactRow::into_contact))
    }

    async fn find_by_pair(
        &self,
        owner_id: i64,
        target_id: i64,
    ) -> Result<Option<Contact>, AppError> {
        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE owner_id = $1 AND target_id = $2"
        );
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(owner_id)
            .bind(target_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(ContactRow::into_contact))
    }

    async fn find_by_owner(
        &self,
        owner_id: i64,
        filter: ContactFilter,
    ) -> Result<Vec<Contact>, AppError> {
        let blocked: Option<bool> = match filter {
            ContactFilter::All => None,
            ContactFilter::Unblocked => Some(false),
            ContactFilter::Blocked => Some(true),
        };
        let sql = format!(
            r#"
            SELECT {CONTACT_COLUMNS}
            FROM contacts
            WHERE owner_id = $1 AND ($2::BOOLEAN IS NULL OR is_blocked = $2)
            ORDER BY LOWER(name), id
            "#
        );
        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(owner_id)
            .bind(blocked)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ContactRow::into_contact).collect())
    }

    async fn create(&self, contact: &Contact) -> Result<Contact, AppError> {
        let sql = format!(
            r#"
            INSERT INTO contacts (id, owner_id, target_id, name, is_blocked, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CONTACT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(contact.id)
            .bind(contact.owner_id)
            .bind(contact.target_id)
            .bind(&contact.name)
            .bind(contact.is_blocked)
            .bind(contact.created_at)
            .bind(contact.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict("Contact already exists".to_string())
                }
                _ => AppError::Database(e),
            })?;

        Ok(row.into_contact())
    }

    async fn update(&self, contact: &Contact) -> Result<Contact, AppError> {
        let sql = format!(
            r#"
            UPDATE contacts
            SET name = $2, is_blocked = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {CONTACT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(contact.id)
            .bind(&contact.name)
            .bind(contact.is_blocked)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Contact not found".to_string()))?;

        Ok(row.into_contact())
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn search(
        &self,
        owner_id: i64,
        term: &str,
        limit: i64,
    ) -> Result<Vec<Contact>, AppError> {
        let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
        let sql = format!(
            r#"
            SELECT {CONTACT_COLUMNS}
            FROM contacts
            WHERE owner_id = $1 AND NOT is_blocked AND LOWER(name) LIKE $2
            ORDER BY LOWER(name), id
            LIMIT $3
            "#
        );
        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(owner_id)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(ContactRow::into_contact).collect())
    }
}
