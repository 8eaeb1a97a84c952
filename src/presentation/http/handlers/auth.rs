//! Authentication Handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::application::dto::request::{LoginRequest, RegisterRequest};
use crate::application::dto::AuthResponse;
use crate::application::services::AuthService;
use crate::shared::error::AppError;
use crate::shared::validation::validate;
use crate::startup::AppState;

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    validate(&body)?;

    let response = state
        .auth_service()
        .register(&body.name, &body.email, &body.password, body.avatar_url)
        .await?;

    tracing::info!(user_id = %response.user.user.id, "User registered");
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with credentials
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    validate(&body)?;

    let response = state.auth_service().login(&body.email, &body.password).await?;
    Ok(Json(response))
}
