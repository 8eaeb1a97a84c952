//! WebSocket Message Types
//!
//! Frames are JSON objects `{"event": "<name>", "data": {...}}` in both
//! directions. Inbound frames are parsed in two steps (envelope, then the
//! payload for the named event) so unknown events get a precise error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::application::dto::request::SendMessageRequest;
use crate::application::dto::{MessageResponse, UserSummary};

/// Raw inbound envelope
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// `{chatId}` payload used by typing events
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRef {
    #[serde(alias = "chatId")]
    pub chat_id: String,
}

/// `mark-as-read` payload
#[derive(Debug, Clone, Deserialize)]
pub struct MarkAsReadPayload {
    #[serde(alias = "chatId")]
    pub chat_id: String,
    #[serde(default, alias = "messageIds")]
    pub message_ids: Option<Vec<String>>,
}

/// Call signaling payload. Everything besides the chat id is relayed as-is.
#[derive(Debug, Clone, Deserialize)]
pub struct CallSignal {
    #[serde(alias = "chatId")]
    pub chat_id: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

/// Call signaling event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Offer,
    Accept,
    Reject,
    End,
    IceCandidate,
}

/// Parsed inbound event
#[derive(Debug, Clone)]
pub enum ClientEvent {
    SendMessage(SendMessageRequest),
    Typing(ChatRef),
    StopTyping(ChatRef),
    MarkAsRead(MarkAsReadPayload),
    Call(CallKind, CallSignal),
    RefreshSubscriptions,
    Heartbeat,
}

/// Why an inbound frame could not be parsed
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Malformed frame: {0}")]
    Malformed(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid payload for {event}: {reason}")]
    InvalidPayload { event: String, reason: String },
}

impl ClientEvent {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<(String, Self), FrameError> {
        let frame: ClientFrame =
            serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))?;
        let event = frame.event.clone();
        let parsed = Self::from_frame(frame)?;
        Ok((event, parsed))
    }

    fn from_frame(frame: ClientFrame) -> Result<Self, FrameError> {
        fn payload<T: serde::de::DeserializeOwned>(
            event: &str,
            data: Value,
        ) -> Result<T, FrameError> {
            serde_json::from_value(data).map_err(|e| FrameError::InvalidPayload {
                event: event.to_string(),
                reason: e.to_string(),
            })
        }

        let ClientFrame { event, data } = frame;
        let parsed = match event.as_str() {
            "send-message" => ClientEvent::SendMessage(payload(&event, data)?),
            "typing" => ClientEvent::Typing(payload(&event, data)?),
            "stop-typing" => ClientEvent::StopTyping(payload(&event, data)?),
            "mark-as-read" => ClientEvent::MarkAsRead(payload(&event, data)?),
            "call-user" => ClientEvent::Call(CallKind::Offer, payload(&event, data)?),
            "accept-call" => ClientEvent::Call(CallKind::Accept, payload(&event, data)?),
            "reject-call" => ClientEvent::Call(CallKind::Reject, payload(&event, data)?),
            "end-call" => ClientEvent::Call(CallKind::End, payload(&event, data)?),
            "ice-candidate" => ClientEvent::Call(CallKind::IceCandidate, payload(&event, data)?),
            "refresh-subscriptions" => ClientEvent::RefreshSubscriptions,
            "heartbeat" => ClientEvent::Heartbeat,
            _ => return Err(FrameError::UnknownEvent(event)),
        };
        Ok(parsed)
    }
}

/// Outbound event
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    Ready(ReadyPayload),
    NewMessage(MessageResponse),
    MessageUpdated(MessageResponse),
    MessageDeleted(MessageDeletedPayload),
    UserTyping(TypingPayload),
    UserStopTyping(TypingPayload),
    MessagesRead(MessagesReadPayload),
    UserOnline(PresencePayload),
    UserOffline(PresencePayload),
    IncomingCall(CallPayload),
    CallAccepted(CallPayload),
    CallRejected(CallPayload),
    CallEnded(CallPayload),
    IceCandidate(CallPayload),
    SubscriptionsRefreshed(SubscriptionsPayload),
    HeartbeatAck(HeartbeatAckPayload),
    Error(ErrorPayload),
}

impl ServerEvent {
    /// Relay event for a call signal kind.
    pub fn call(kind: CallKind, payload: CallPayload) -> Self {
        match kind {
            CallKind::Offer => ServerEvent::IncomingCall(payload),
            CallKind::Accept => ServerEvent::CallAccepted(payload),
            CallKind::Reject => ServerEvent::CallRejected(payload),
            CallKind::End => ServerEvent::CallEnded(payload),
            CallKind::IceCandidate => ServerEvent::IceCandidate(payload),
        }
    }

    /// Wire name, used for logging and metrics
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Ready(_) => "ready",
            ServerEvent::NewMessage(_) => "new-message",
            ServerEvent::MessageUpdated(_) => "message-updated",
            ServerEvent::MessageDeleted(_) => "message-deleted",
            ServerEvent::UserTyping(_) => "user-typing",
            ServerEvent::UserStopTyping(_) => "user-stop-typing",
            ServerEvent::MessagesRead(_) => "messages-read",
            ServerEvent::UserOnline(_) => "user-online",
            ServerEvent::UserOffline(_) => "user-offline",
            ServerEvent::IncomingCall(_) => "incoming-call",
            ServerEvent::CallAccepted(_) => "call-accepted",
            ServerEvent::CallRejected(_) => "call-rejected",
            ServerEvent::CallEnded(_) => "call-ended",
            ServerEvent::IceCandidate(_) => "ice-candidate",
            ServerEvent::SubscriptionsRefreshed(_) => "subscriptions-refreshed",
            ServerEvent::HeartbeatAck(_) => "heartbeat-ack",
            ServerEvent::Error(_) => "error",
        }
    }
}

/// Sent once after the connection is authenticated
#[derive(Debug, Clone, Serialize)]
pub struct ReadyPayload {
    pub session_id: String,
    pub user: UserSummary,
    pub chat_ids: Vec<String>,
    pub heartbeat_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDeletedPayload {
    pub chat_id: String,
    pub message_id: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TypingPayload {
    pub chat_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessagesReadPayload {
    pub chat_id: String,
    pub user_id: String,
    /// Ids the reader asked for; absent when the whole chat was marked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_ids: Option<Vec<String>>,
    pub modified_count: u64,
    pub read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PresencePayload {
    pub user_id: String,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallPayload {
    pub chat_id: String,
    pub from_user_id: String,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionsPayload {
    pub chat_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatAckPayload {
    pub server_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    /// Inbound event that failed, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    pub code: u16,
    pub message: String,
}
