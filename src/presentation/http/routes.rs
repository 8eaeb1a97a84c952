//! Route Configuration
//!
//! Configures all HTTP routes for the API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::auth_middleware;
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Room for multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Create the main API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes(state.clone()))
        // Realtime endpoint; authenticates from `?token=` itself
        .route("/ws", get(ws_handler))
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// API v1 routes
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes(state.clone()))
        .nest("/contacts", contact_routes(state.clone()))
        .nest("/chats", chat_routes(state.clone()))
        .nest("/messages", message_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
}

/// User routes (protected)
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/me",
            get(handlers::user::get_current_user).patch(handlers::user::update_current_user),
        )
        .route("/search", get(handlers::user::search_users))
        .route("/by-number/{number}", get(handlers::user::get_user_by_number))
        .route("/{user_id}", get(handlers::user::get_user))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Contact routes (protected)
fn contact_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::contact::list_contacts).post(handlers::contact::add_contact),
        )
        .route("/search", get(handlers::contact::search_contacts))
        .route(
            "/{contact_id}",
            patch(handlers::contact::rename_contact).delete(handlers::contact::remove_contact),
        )
        .route("/{contact_id}/block", post(handlers::contact::block_contact))
        .route("/{contact_id}/unblock", post(handlers::contact::unblock_contact))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Chat routes (protected)
fn chat_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::chat::list_chats))
        .route("/individual", post(handlers::chat::create_individual_chat))
        .route("/group", post(handlers::chat::create_group_chat))
        .route(
            "/{chat_id}",
            get(handlers::chat::get_chat)
                .patch(handlers::chat::update_chat)
                .delete(handlers::chat::deactivate_chat),
        )
        .route("/{chat_id}/participants", post(handlers::chat::add_participant))
        .route(
            "/{chat_id}/participants/{user_id}",
            axum::routing::delete(handlers::chat::remove_participant),
        )
        .route("/{chat_id}/messages", get(handlers::message::list_messages))
        .route("/{chat_id}/read", post(handlers::message::mark_chat_read))
        .route("/{chat_id}/unread-count", get(handlers::message::unread_count))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Message routes (protected)
fn message_routes(state: AppState) -> Router<AppState> {
    let upload_limit = state.settings.uploads.max_file_size + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", post(handlers::message::send_message))
        .route(
            "/attachment",
            post(handlers::message::send_attachment).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/unread", get(handlers::message::list_unread))
        .route(
            "/{message_id}",
            patch(handlers::message::edit_message).delete(handlers::message::delete_message),
        )
        .route("/{message_id}/read", post(handlers::message::mark_message_read))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
