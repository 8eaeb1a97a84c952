//! Message Handlers
//!
//! Every mutation is also fanned out to the chat's realtime room so HTTP and
//! realtime clients observe the same stream.

use axum::{
    body::Bytes,
    extract::{Extension, Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;

use crate::application::dto::request::{
    EditMessageRequest, MarkReadRequest, MessageListQuery, SendMessageRequest,
};
use crate::application::dto::{
    MarkReadResponse, MessagePageResponse, MessageResponse, UnreadCountResponse,
};
use crate::application::services::{MessageService, NewAttachment, NewMessage};
use crate::infrastructure::metrics;
use crate::presentation::middleware::AuthUser;
use crate::presentation::websocket::messages::{
    MessageDeletedPayload, MessagesReadPayload, ServerEvent,
};
use crate::shared::error::AppError;
use crate::shared::snowflake::{parse_id, parse_ids};
use crate::shared::validation::validate;
use crate::startup::AppState;

/// Send a text message
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    validate(&body)?;
    let chat_id = parse_id(&body.chat_id, "chat")?;
    let reply_to = body
        .reply_to
        .as_deref()
        .map(|id| parse_id(id, "message"))
        .transpose()?;

    let message = state
        .message_service()
        .send(
            auth.user_id,
            NewMessage {
                chat_id,
                content: body.content,
                message_type: body.message_type.unwrap_or_default(),
                reply_to,
            },
        )
        .await?;

    metrics::record_message_sent("http", message.message_type.as_str());
    state
        .gateway
        .send_to_room(chat_id, ServerEvent::NewMessage(message.clone()), None);
    Ok((StatusCode::CREATED, Json(message)))
}

/// Send a file as a media message.
///
/// Multipart fields: `file` (required), `chat_id`/`chatId`, `reply_to`/`replyTo`.
pub async fn send_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let mut chat_id = None;
    let mut reply_to = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidArgument(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidArgument(format!("Malformed upload: {}", e)))?;
                file = Some((filename, content_type, bytes.to_vec()));
            }
            "chat_id" | "chatId" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidArgument(format!("Malformed upload: {}", e)))?;
                chat_id = Some(parse_id(&text, "chat")?);
            }
            "reply_to" | "replyTo" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidArgument(format!("Malformed upload: {}", e)))?;
                if !text.trim().is_empty() {
                    reply_to = Some(parse_id(&text, "message")?);
                }
            }
            _ => {}
        }
    }

    let chat_id = chat_id.ok_or_else(|| AppError::InvalidArgument("Chat id is required".into()))?;
    let (filename, content_type, bytes) =
        file.ok_or_else(|| AppError::InvalidArgument("No file uploaded".into()))?;

    let message = state
        .message_service()
        .send_attachment(
            auth.user_id,
            NewAttachment {
                chat_id,
                filename,
                content_type,
                bytes,
                reply_to,
            },
        )
        .await?;

    metrics::record_message_sent("http", message.message_type.as_str());
    state
        .gateway
        .send_to_room(chat_id, ServerEvent::NewMessage(message.clone()), None);
    Ok((StatusCode::CREATED, Json(message)))
}

/// One page of a chat's history, oldest to newest
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Query(query): Query<MessageListQuery>,
) -> Result<Json<MessagePageResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let page = state
        .message_service()
        .list_page(chat_id, auth.user_id, query.page, query.limit)
        .await?;
    Ok(Json(page))
}

/// Mark the given (or all) messages of a chat as read
pub async fn mark_chat_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    body: Bytes,
) -> Result<Json<MarkReadResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    // An empty body marks every unread message
    let body: MarkReadRequest = if body.is_empty() {
        MarkReadRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::InvalidArgument(format!("Invalid request body: {}", e)))?
    };
    let message_ids = body
        .message_ids
        .as_deref()
        .map(|ids| parse_ids(ids, "message"))
        .transpose()?;

    let result = state
        .message_service()
        .mark_many_read(chat_id, auth.user_id, message_ids)
        .await?;

    state.gateway.send_to_room(
        chat_id,
        ServerEvent::MessagesRead(MessagesReadPayload {
            chat_id: result.chat_id.clone(),
            user_id: auth.user_id.to_string(),
            message_ids: body.message_ids.filter(|ids| !ids.is_empty()),
            modified_count: result.modified_count,
            read_at: Utc::now(),
        }),
        Some(auth.user_id),
    );
    Ok(Json(result))
}

/// Mark a single message as read
pub async fn mark_message_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<String>,
) -> Result<Json<MarkReadResponse>, AppError> {
    let message_id = parse_id(&message_id, "message")?;
    let result = state
        .message_service()
        .mark_read(message_id, auth.user_id)
        .await?;

    if result.value.modified_count > 0 {
        state.gateway.send_to_room(
            result.chat_id,
            ServerEvent::MessagesRead(MessagesReadPayload {
                chat_id: result.value.chat_id.clone(),
                user_id: auth.user_id.to_string(),
                message_ids: Some(vec![message_id.to_string()]),
                modified_count: result.value.modified_count,
                read_at: Utc::now(),
            }),
            Some(auth.user_id),
        );
    }
    Ok(Json(result.value))
}

/// Edit a text message (sender only)
pub async fn edit_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<String>,
    Json(body): Json<EditMessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    validate(&body)?;
    let message_id = parse_id(&message_id, "message")?;
    let edited = state
        .message_service()
        .edit_content(message_id, auth.user_id, &body.content)
        .await?;

    state.gateway.send_to_room(
        edited.chat_id,
        ServerEvent::MessageUpdated(edited.value.clone()),
        None,
    );
    Ok(Json(edited.value))
}

/// Soft-delete a message (sender only)
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let message_id = parse_id(&message_id, "message")?;
    let deleted = state
        .message_service()
        .soft_delete(message_id, auth.user_id)
        .await?;

    state.gateway.send_to_room(
        deleted.chat_id,
        ServerEvent::MessageDeleted(MessageDeletedPayload {
            chat_id: deleted.value.chat_id.clone(),
            message_id: deleted.value.id.clone(),
            deleted_at: deleted.value.deleted_at,
        }),
        None,
    );
    Ok(Json(deleted.value))
}

/// Unread count of one chat for the caller
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let count = state
        .message_service()
        .count_unread(chat_id, auth.user_id)
        .await?;
    Ok(Json(count))
}

/// Unread messages across all of the caller's chats
pub async fn list_unread(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let messages = state
        .message_service()
        .find_unread_across_user(auth.user_id)
        .await?;
    Ok(Json(messages))
}
