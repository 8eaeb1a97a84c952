//! Chat Handlers
//!
//! Membership changes made here also move the affected users' live
//! connections in or out of the chat's realtime room.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    AddParticipantRequest, CreateGroupChatRequest, CreateIndividualChatRequest, UpdateChatRequest,
};
use crate::application::dto::ChatResponse;
use crate::application::services::{ChatService, NewGroup};
use crate::domain::{ChatMetadataUpdate, ParticipantRole};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::snowflake::{parse_id, parse_ids};
use crate::shared::validation::validate;
use crate::startup::AppState;

/// Open the individual chat with another user; 201 when newly created
pub async fn create_individual_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateIndividualChatRequest>,
) -> Result<(StatusCode, Json<ChatResponse>), AppError> {
    validate(&body)?;
    let other_id = parse_id(&body.participant_id, "user")?;

    let result = state
        .chat_service()
        .create_individual(auth.user_id, other_id)
        .await?;

    if result.created {
        join_participants(&state, &result.chat);
        Ok((StatusCode::CREATED, Json(result.chat)))
    } else {
        Ok((StatusCode::OK, Json(result.chat)))
    }
}

/// Create a group chat with the caller as admin
pub async fn create_group_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateGroupChatRequest>,
) -> Result<(StatusCode, Json<ChatResponse>), AppError> {
    validate(&body)?;

    let group = NewGroup {
        name: body.name,
        participant_ids: parse_ids(&body.participant_ids, "user")?,
        description: body.description,
        avatar_url: body.avatar_url,
    };
    let chat = state.chat_service().create_group(auth.user_id, group).await?;

    join_participants(&state, &chat);
    Ok((StatusCode::CREATED, Json(chat)))
}

/// The caller's active chats, most recent first
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<ChatResponse>>, AppError> {
    let chats = state.chat_service().list_for_user(auth.user_id).await?;
    Ok(Json(chats))
}

pub async fn get_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let chat = state.chat_service().get_by_id(chat_id, auth.user_id).await?;
    Ok(Json(chat))
}

/// Update group name, description or avatar (admins only)
pub async fn update_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Json(body): Json<UpdateChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    validate(&body)?;
    let chat_id = parse_id(&chat_id, "chat")?;

    let update = ChatMetadataUpdate {
        name: body.name,
        description: body.description,
        avatar_url: body.avatar_url,
    };
    let chat = state
        .chat_service()
        .update_metadata(chat_id, auth.user_id, update)
        .await?;
    Ok(Json(chat))
}

pub async fn add_participant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Json(body): Json<AddParticipantRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    validate(&body)?;
    let chat_id = parse_id(&chat_id, "chat")?;
    let user_id = parse_id(&body.user_id, "user")?;

    let chat = state
        .chat_service()
        .add_participant(
            chat_id,
            auth.user_id,
            user_id,
            body.role.unwrap_or(ParticipantRole::Member),
        )
        .await?;

    state.gateway.join_room(user_id, chat_id);
    Ok(Json(chat))
}

pub async fn remove_participant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path((chat_id, user_id)): Path<(String, String)>,
) -> Result<Json<ChatResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    let user_id = parse_id(&user_id, "user")?;

    let chat = state
        .chat_service()
        .remove_participant(chat_id, auth.user_id, user_id)
        .await?;

    state.gateway.leave_room(user_id, chat_id);
    Ok(Json(chat))
}

/// Soft-deactivate a chat; it disappears from listings
pub async fn deactivate_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let chat_id = parse_id(&chat_id, "chat")?;
    state.chat_service().deactivate(chat_id, auth.user_id).await?;

    state.gateway.close_room(chat_id);
    Ok(StatusCode::NO_CONTENT)
}

fn join_participants(state: &AppState, chat: &ChatResponse) {
    let Ok(chat_id) = chat.id.parse::<i64>() else {
        return;
    };
    for participant in &chat.participants {
        if let Ok(user_id) = participant.user_id.parse::<i64>() {
            state.gateway.join_room(user_id, chat_id);
        }
    }
}
