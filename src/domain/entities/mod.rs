//! # Domain Entities
//!
//! Core domain entities of the messenger.
//!
//! ## Core Entities
//!
//! - **User**: Registered identity with virtual number and presence
//! - **Contact**: Per-owner address book entry pointing at another user
//! - **Chat**: Individual or group conversation with an ordered participant roll
//! - **Message**: Authored item in a chat with read receipts and soft deletion
//!
//! ## Supporting Types
//!
//! - **Attachment**: Upload allow-list and the blob storage trait
//!
//! ## Repository Traits
//!
//! Each entity has an associated repository trait defining data access operations.
//! These traits are implemented in the infrastructure layer (PostgreSQL and
//! in-memory), following the dependency inversion principle.

mod attachment;
mod chat;
mod contact;
mod message;
mod user;

pub use attachment::{validate_upload, AcceptedUpload, BlobStore, MAX_ATTACHMENT_SIZE};
#[cfg(test)]
pub use attachment::MockBlobStore;

pub use chat::{
    Chat, ChatMetadataUpdate, ChatRepository, ChatType, Participant, ParticipantRole,
};

pub use contact::{Contact, ContactFilter, ContactRepository};

pub use message::{Message, MessageRepository, MessageType, ReadReceipt, MAX_TEXT_LENGTH};

pub use user::{ProfileUpdate, User, UserRepository, DEFAULT_STATUS_TEXT};
