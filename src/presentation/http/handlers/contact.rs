//! Contact Handlers

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::application::dto::request::{
    AddContactRequest, ContactListQuery, SearchQuery, UpdateContactRequest,
};
use crate::application::dto::ContactResponse;
use crate::application::services::ContactService;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::snowflake::parse_id;
use crate::shared::validation::validate;
use crate::startup::AppState;

/// Add a contact by virtual number or user id
pub async fn add_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<AddContactRequest>,
) -> Result<(StatusCode, Json<ContactResponse>), AppError> {
    validate(&body)?;

    let contact = state
        .contact_service()
        .add(auth.user_id, body.target.trim(), body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

/// List the caller's contacts, optionally filtered by blocked state
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ContactListQuery>,
) -> Result<Json<Vec<ContactResponse>>, AppError> {
    let contacts = state
        .contact_service()
        .list(auth.user_id, query.filter())
        .await?;
    Ok(Json(contacts))
}

/// Search the caller's unblocked contacts by name
pub async fn search_contacts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ContactResponse>>, AppError> {
    let contacts = state
        .contact_service()
        .search(auth.user_id, &query.q)
        .await?;
    Ok(Json(contacts))
}

/// Rename a contact
pub async fn rename_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(contact_id): Path<String>,
    Json(body): Json<UpdateContactRequest>,
) -> Result<Json<ContactResponse>, AppError> {
    validate(&body)?;
    let contact_id = parse_id(&contact_id, "contact")?;

    let contact = state
        .contact_service()
        .rename(auth.user_id, contact_id, &body.name)
        .await?;
    Ok(Json(contact))
}

pub async fn block_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(contact_id): Path<String>,
) -> Result<Json<ContactResponse>, AppError> {
    set_blocked(state, auth, contact_id, true).await
}

pub async fn unblock_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(contact_id): Path<String>,
) -> Result<Json<ContactResponse>, AppError> {
    set_blocked(state, auth, contact_id, false).await
}

async fn set_blocked(
    state: AppState,
    auth: AuthUser,
    contact_id: String,
    blocked: bool,
) -> Result<Json<ContactResponse>, AppError> {
    let contact_id = parse_id(&contact_id, "contact")?;
    let contact = state
        .contact_service()
        .set_blocked(auth.user_id, contact_id, blocked)
        .await?;
    Ok(Json(contact))
}

/// Remove a contact permanently
pub async fn remove_contact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(contact_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let contact_id = parse_id(&contact_id, "contact")?;
    state
        .contact_service()
        .remove(auth.user_id, contact_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
