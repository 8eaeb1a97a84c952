//! Infrastructure Layer
//!
//! Contains implementations for external services including:
//! - Database repositories (PostgreSQL)
//! - In-memory repositories (tests, single-process deployments)
//! - Attachment blob storage
//! - Prometheus metrics

pub mod database;
pub mod memory;
pub mod metrics;
pub mod repositories;
pub mod storage;

use std::sync::Arc;

use sqlx::PgPool;

use crate::domain::{ChatRepository, ContactRepository, MessageRepository, UserRepository};

/// The storage adapter in use, kept for health checks.
#[derive(Clone)]
pub enum StorageHandle {
    Postgres(PgPool),
    Memory,
}

/// Every repository the services need, behind the domain traits.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub storage: StorageHandle,
}

impl Repositories {
    /// PostgreSQL-backed repositories sharing one pool.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(repositories::PgUserRepository::new(pool.clone())),
            contacts: Arc::new(repositories::PgContactRepository::new(pool.clone())),
            chats: Arc::new(repositories::PgChatRepository::new(pool.clone())),
            messages: Arc::new(repositories::PgMessageRepository::new(pool.clone())),
            storage: StorageHandle::Postgres(pool),
        }
    }

    /// Fresh, empty in-memory repositories.
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUserRepository::new()),
            contacts: Arc::new(memory::MemoryContactRepository::new()),
            chats: Arc::new(memory::MemoryChatRepository::new()),
            messages: Arc::new(memory::MemoryMessageRepository::new()),
            storage: StorageHandle::Memory,
        }
    }

    /// Check the backing store is reachable.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        match &self.storage {
            StorageHandle::Postgres(pool) => database::ping(pool).await,
            StorageHandle::Memory => Ok(()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.storage {
            StorageHandle::Postgres(_) => "postgres",
            StorageHandle::Memory => "memory",
        }
    }
}
