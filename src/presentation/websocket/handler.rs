//! WebSocket Connection Handler
//!
//! Authenticates the upgrade, registers the connection with the gateway and
//! runs the per-connection event loop.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::interval;
use uuid::Uuid;

use super::messages::{
    CallPayload, ClientEvent, ErrorPayload, FrameError, HeartbeatAckPayload, MessagesReadPayload,
    PresencePayload, ReadyPayload, ServerEvent, SubscriptionsPayload, TypingPayload,
};
use super::session::SessionState;
use crate::application::dto::UserSummary;
use crate::application::services::{ChatService, MessageService, NewMessage, UserService};
use crate::domain::services::MembershipPolicy;
use crate::domain::User;
use crate::infrastructure::metrics;
use crate::presentation::middleware::auth::authenticate;
use crate::shared::error::AppError;
use crate::shared::snowflake::{parse_id, parse_ids};
use crate::startup::AppState;

/// Grace period on top of the advertised heartbeat interval
const HEARTBEAT_GRACE_MS: u64 = 10_000;

/// Handshake query string
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub token: Option<String>,
}

/// WebSocket upgrade handler. Rejects with 401 before upgrading when the
/// token is missing, invalid, or names an unknown user.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let user = authenticate_connection(&state, query.token.as_deref()).await?;

    let limits = &state.settings.websocket;
    Ok(ws
        .max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state, user)))
}

/// Resolve a handshake token to a known user.
pub async fn authenticate_connection(
    state: &AppState,
    token: Option<&str>,
) -> Result<User, AppError> {
    let token = token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;
    let user_id = authenticate(state, token)?;
    state
        .repos
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown user".into()))
}

/// Bring a connection online: mark the user present, join the rooms of
/// their active chats, greet the session and announce the user.
pub async fn open_session(
    state: &AppState,
    user: &User,
    sender: mpsc::UnboundedSender<ServerEvent>,
) -> Result<SessionState, AppError> {
    let session_id = Uuid::new_v4().to_string();
    let user_id = user.id;
    let rooms = state.chat_service().active_chat_ids(user_id).await?;

    let now = Utc::now();
    if let Err(e) = state.user_service().set_presence(user_id, true, now).await {
        tracing::warn!(user_id, error = %e, "Failed to mark user online");
    }

    state
        .gateway
        .register_session(session_id.clone(), user_id, rooms.clone(), sender);

    let mut summary = UserSummary::from(user);
    summary.is_online = true;
    summary.last_seen = now;
    state.gateway.send_to_session(
        &session_id,
        ServerEvent::Ready(ReadyPayload {
            session_id: session_id.clone(),
            user: summary,
            chat_ids: rooms.iter().map(ToString::to_string).collect(),
            heartbeat_interval_ms: state.gateway.heartbeat_interval(),
        }),
    );
    state.gateway.broadcast_presence(
        user_id,
        &rooms,
        ServerEvent::UserOnline(PresencePayload {
            user_id: user_id.to_string(),
            is_online: true,
            last_seen: now,
        }),
    );

    tracing::info!(user_id, session_id = %session_id, rooms = rooms.len(), "User connected");
    Ok(SessionState::new(session_id, user_id))
}

/// Drop a connection. The user goes offline only with their last session.
pub async fn close_session(state: &AppState, session: &SessionState) {
    let user_id = session.user_id;
    let Some(gone) = state.gateway.unregister_session(&session.session_id) else {
        return;
    };
    if gone.was_last {
        let now = Utc::now();
        if let Err(e) = state.user_service().set_presence(user_id, false, now).await {
            tracing::warn!(user_id, error = %e, "Failed to mark user offline");
        }
        state.gateway.broadcast_presence(
            user_id,
            &gone.rooms,
            ServerEvent::UserOffline(PresencePayload {
                user_id: user_id.to_string(),
                is_online: false,
                last_seen: now,
            }),
        );
    }
    tracing::info!(user_id, session_id = %session.session_id, "User disconnected");
}

/// Handle an authenticated connection until it closes or stops heartbeating
async fn handle_socket(socket: WebSocket, state: AppState, user: User) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Forward queued events to the socket
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(event = event.name(), error = %e, "Failed to serialize event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut session = match open_session(&state, &user, tx).await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(user_id = user.id, error = %e, "Failed to open session");
            writer.abort();
            return;
        }
    };
    let session_id = session.session_id.clone();

    let timeout = Duration::from_millis(state.gateway.heartbeat_interval() + HEARTBEAT_GRACE_MS);
    let mut heartbeat_check = interval(timeout);
    heartbeat_check.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_event(&state, &mut session, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(session_id = %session_id, "Connection closed");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(session_id = %session_id, error = %e, "WebSocket error");
                        break;
                    }
                    // Pings are answered by axum
                    _ => {}
                }
            }

            _ = heartbeat_check.tick() => {
                if !session.is_alive(timeout) {
                    tracing::info!(session_id = %session_id, "Heartbeat timeout, closing connection");
                    break;
                }
            }
        }
    }

    close_session(&state, &session).await;
    writer.abort();
}

/// Handle one inbound text frame for a registered session.
///
/// Failures are reported to the session as `error` events; the connection
/// is never closed here.
pub async fn handle_event(state: &AppState, session: &mut SessionState, text: &str) {
    let (name, event) = match ClientEvent::parse(text) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::debug!(session_id = %session.session_id, error = %e, "Rejected frame");
            let event = match &e {
                FrameError::Malformed(_) => None,
                FrameError::UnknownEvent(name) | FrameError::InvalidPayload { event: name, .. } => {
                    Some(name.clone())
                }
            };
            let (_, code) = AppError::InvalidArgument(String::new()).status_and_code();
            state.gateway.send_to_session(
                &session.session_id,
                ServerEvent::Error(ErrorPayload {
                    event,
                    code,
                    message: e.to_string(),
                }),
            );
            return;
        }
    };

    if let Err(err) = dispatch(state, session, event).await {
        let (status, code) = err.status_and_code();
        if status.is_server_error() {
            tracing::error!(session_id = %session.session_id, event = %name, error = %err, "Realtime event failed");
        } else {
            tracing::debug!(session_id = %session.session_id, event = %name, error = %err, "Realtime event rejected");
        }
        state.gateway.send_to_session(
            &session.session_id,
            ServerEvent::Error(ErrorPayload {
                event: Some(name),
                code,
                message: err.client_message(),
            }),
        );
    }
}

async fn dispatch(
    state: &AppState,
    session: &mut SessionState,
    event: ClientEvent,
) -> Result<(), AppError> {
    let user_id = session.user_id;

    match event {
        ClientEvent::SendMessage(req) => {
            let chat_id = parse_id(&req.chat_id, "chat")?;
            let reply_to = req
                .reply_to
                .as_deref()
                .map(|id| parse_id(id, "message"))
                .transpose()?;
            let message = state
                .message_service()
                .send(
                    user_id,
                    NewMessage {
                        chat_id,
                        content: req.content,
                        message_type: req.message_type.unwrap_or_default(),
                        reply_to,
                    },
                )
                .await?;
            metrics::record_message_sent("realtime", message.message_type.as_str());
            state
                .gateway
                .send_to_room(chat_id, ServerEvent::NewMessage(message), None);
        }

        ClientEvent::Typing(chat) => {
            let chat_id = participating_chat(state, &chat.chat_id, user_id).await?;
            state.gateway.send_to_room(
                chat_id,
                ServerEvent::UserTyping(TypingPayload {
                    chat_id: chat_id.to_string(),
                    user_id: user_id.to_string(),
                }),
                Some(user_id),
            );
        }

        ClientEvent::StopTyping(chat) => {
            let chat_id = participating_chat(state, &chat.chat_id, user_id).await?;
            state.gateway.send_to_room(
                chat_id,
                ServerEvent::UserStopTyping(TypingPayload {
                    chat_id: chat_id.to_string(),
                    user_id: user_id.to_string(),
                }),
                Some(user_id),
            );
        }

        ClientEvent::MarkAsRead(payload) => {
            let chat_id = parse_id(&payload.chat_id, "chat")?;
            let ids = payload
                .message_ids
                .as_deref()
                .map(|ids| parse_ids(ids, "message"))
                .transpose()?;
            let result = state
                .message_service()
                .mark_many_read(chat_id, user_id, ids)
                .await?;
            state.gateway.send_to_room(
                chat_id,
                ServerEvent::MessagesRead(MessagesReadPayload {
                    chat_id: result.chat_id,
                    user_id: user_id.to_string(),
                    message_ids: payload.message_ids.filter(|ids| !ids.is_empty()),
                    modified_count: result.modified_count,
                    read_at: Utc::now(),
                }),
                Some(user_id),
            );
        }

        ClientEvent::Call(kind, signal) => {
            let chat_id = participating_chat(state, &signal.chat_id, user_id).await?;
            state.gateway.send_to_room(
                chat_id,
                ServerEvent::call(
                    kind,
                    CallPayload {
                        chat_id: chat_id.to_string(),
                        from_user_id: user_id.to_string(),
                        payload: signal.payload,
                    },
                ),
                Some(user_id),
            );
        }

        ClientEvent::RefreshSubscriptions => {
            let rooms = state.chat_service().active_chat_ids(user_id).await?;
            state.gateway.replace_rooms(&session.session_id, rooms.clone());
            state.gateway.send_to_session(
                &session.session_id,
                ServerEvent::SubscriptionsRefreshed(SubscriptionsPayload {
                    chat_ids: rooms.iter().map(ToString::to_string).collect(),
                }),
            );
        }

        ClientEvent::Heartbeat => {
            session.heartbeat();
            state.gateway.send_to_session(
                &session.session_id,
                ServerEvent::HeartbeatAck(HeartbeatAckPayload {
                    server_time: Utc::now(),
                }),
            );
            tracing::trace!(session_id = %session.session_id, "Heartbeat received");
        }
    }

    Ok(())
}

/// Parse a chat id and check the user participates in that chat.
async fn participating_chat(state: &AppState, raw: &str, user_id: i64) -> Result<i64, AppError> {
    let chat_id = parse_id(raw, "chat")?;
    let chat = state.chat_service().find_chat(chat_id).await?;
    MembershipPolicy::ensure_participant(&chat, user_id)?;
    MembershipPolicy::ensure_active(&chat)?;
    Ok(chat_id)
}
