//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! This module provides concrete implementations of the repository traits
//! defined in the domain layer. Each repository handles data access for
//! a specific entity type.
//!
//! ## Available Repositories
//!
//! - **UserRepository** - Identity directory and presence
//! - **ContactRepository** - Per-owner address books
//! - **ChatRepository** - Chats and their participant rolls
//! - **MessageRepository** - Messages, read receipts, soft deletion
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgChatRepository, PgMessageRepository};
//!
//! async fn setup_repositories(pool: PgPool) {
//!     let chats = PgChatRepository::new(pool.clone());
//!     let messages = PgMessageRepository::new(pool);
//! }
//! ```

pub mod chat_repository;
pub mod contact_repository;
pub mod message_repository;
pub mod user_repository;

pub use chat_repository::PgChatRepository;
pub use contact_repository::PgContactRepository;
pub use message_repository::PgMessageRepository;
pub use user_repository::PgUserRepository;
