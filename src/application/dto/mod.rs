//! Data Transfer Objects
//!
//! DTOs for API request/response serialization. Response views are shared
//! by the HTTP handlers and the realtime gateway.

pub mod request;
pub mod response;

pub use response::{
    AuthResponse, ChatResponse, ContactResponse, IndividualChatResult, MarkReadResponse,
    MessagePageResponse, MessagePreview, MessageResponse, ParticipantResponse, ProfileResponse,
    ReadReceiptResponse, ReplyPreview, SenderSummary, UnreadCountResponse, UserSummary,
};
