//! User Handlers

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};

use crate::application::dto::request::{SearchQuery, UpdateProfileRequest};
use crate::application::dto::{ProfileResponse, UserSummary};
use crate::application::services::UserService;
use crate::domain::ProfileUpdate;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::snowflake::parse_id;
use crate::shared::validation::validate;
use crate::startup::AppState;

/// Get current authenticated user
pub async fn get_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.user_service().get_profile(auth.user_id).await?;
    Ok(Json(profile))
}

/// Update current user profile
pub async fn update_current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    validate(&body)?;

    let update = ProfileUpdate {
        name: body.name,
        avatar_url: body.avatar_url,
        status_text: body.status_text,
    };
    let profile = state
        .user_service()
        .update_profile(auth.user_id, update)
        .await?;
    Ok(Json(profile))
}

/// Search users by name, email or virtual number
pub async fn search_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    let users = state.user_service().search(auth.user_id, &query.q).await?;
    Ok(Json(users))
}

/// Look a user up by virtual number
pub async fn get_user_by_number(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<UserSummary>, AppError> {
    let user = state.user_service().find_by_virtual_number(&number).await?;
    Ok(Json(user))
}

/// Get user by ID
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserSummary>, AppError> {
    let user_id = parse_id(&user_id, "user")?;
    let user = state.user_service().get_user(user_id).await?;
    Ok(Json(user))
}
