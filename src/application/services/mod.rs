//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Registration, login, JWT issuance and verification
//! - **UserService**: Identity directory, own profile, presence
//! - **ContactService**: Per-user address book
//! - **ChatService**: Individual and group chats, membership
//! - **MessageService**: Messages, read receipts, soft delete, edits

pub mod auth_service;
pub mod chat_service;
pub mod contact_service;
pub mod message_service;
pub mod user_service;

pub use auth_service::{issue_token, verify_token, AuthError, AuthService, AuthServiceImpl, Claims};
pub use chat_service::{ChatService, ChatServiceImpl, NewGroup};
pub use contact_service::{ContactService, ContactServiceImpl};
pub use message_service::{
    InChat, MessageService, MessageServiceImpl, NewAttachment, NewMessage,
};
pub use user_service::{UserService, UserServiceImpl};
