//! Authentication Middleware
//!
//! Bearer-token validation for protected routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    RequestExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::application::services::verify_token;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Authenticated user extension
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Resolve a bearer token to the user id it was issued for.
///
/// Shared by HTTP routes and the realtime handshake.
pub fn authenticate(state: &AppState, token: &str) -> Result<i64, AppError> {
    let claims = verify_token(&state.settings.jwt, token)?;
    Ok(claims.user_id()?)
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = request
        .extract_parts::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| AppError::Unauthorized("Missing authorization header".into()))?;

    let user_id = authenticate(&state, bearer.token())?;
    tracing::Span::current().record("user_id", user_id);

    request.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(request).await)
}
