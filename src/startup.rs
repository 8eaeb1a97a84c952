//! Application Startup
//!
//! Application state, router assembly and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::application::services::{
    AuthServiceImpl, ChatServiceImpl, ContactServiceImpl, MessageServiceImpl, UserServiceImpl,
};
use crate::config::{Settings, StorageBackend};
use crate::domain::BlobStore;
use crate::infrastructure::storage::LocalBlobStore;
use crate::infrastructure::{database, Repositories};
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{create_cors_layer, create_trace_layer, track_metrics};
use crate::presentation::websocket::Gateway;
use crate::shared::snowflake::SnowflakeGenerator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub blob_store: Arc<dyn BlobStore>,
    pub snowflake: Arc<SnowflakeGenerator>,
    pub gateway: Arc<Gateway>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings, repos: Repositories, blob_store: Arc<dyn BlobStore>) -> Self {
        let snowflake = Arc::new(SnowflakeGenerator::new(settings.snowflake.machine_id));
        let gateway = Arc::new(Gateway::new(
            settings.websocket.heartbeat_interval_ms,
            settings.websocket.presence_scope,
        ));
        Self {
            repos,
            blob_store,
            snowflake,
            gateway,
            settings: Arc::new(settings),
        }
    }

    /// State over fresh in-memory repositories and a local blob store.
    pub fn in_memory(settings: Settings) -> Self {
        let blob_store = Arc::new(LocalBlobStore::new(&settings.uploads));
        Self::new(settings, Repositories::in_memory(), blob_store)
    }

    pub fn auth_service(&self) -> AuthServiceImpl {
        AuthServiceImpl::new(
            self.repos.users.clone(),
            self.snowflake.clone(),
            self.settings.jwt.clone(),
            self.settings.identity.country_code.clone(),
        )
    }

    pub fn user_service(&self) -> UserServiceImpl {
        UserServiceImpl::new(self.repos.users.clone())
    }

    pub fn contact_service(&self) -> ContactServiceImpl {
        ContactServiceImpl::new(
            self.repos.contacts.clone(),
            self.repos.users.clone(),
            self.snowflake.clone(),
        )
    }

    pub fn chat_service(&self) -> ChatServiceImpl {
        ChatServiceImpl::new(
            self.repos.chats.clone(),
            self.repos.users.clone(),
            self.repos.messages.clone(),
            self.snowflake.clone(),
        )
    }

    pub fn message_service(&self) -> MessageServiceImpl {
        MessageServiceImpl::new(
            self.repos.messages.clone(),
            Arc::new(self.chat_service()),
            self.repos.users.clone(),
            self.blob_store.clone(),
            self.snowflake.clone(),
            self.settings.uploads.max_file_size,
        )
    }
}

/// Full router: API routes, realtime endpoint, uploads and middleware.
pub fn build_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    routes::create_router(state)
        .nest_service(
            &settings.uploads.public_path,
            ServeDir::new(&settings.uploads.dir),
        )
        .layer(middleware::from_fn(track_metrics))
        .layer(create_trace_layer())
        .layer(create_cors_layer(&settings.cors))
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        handlers::health::init_server_start();

        let repos = match settings.database.backend {
            StorageBackend::Postgres => {
                let pool = database::create_pool(&settings.database)
                    .await
                    .context("failed to connect to PostgreSQL")?;
                database::run_migrations(&pool)
                    .await
                    .context("failed to run migrations")?;
                tracing::info!("Database connection pool created");
                Repositories::postgres(pool)
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Repositories::in_memory()
            }
        };

        let blob_store = LocalBlobStore::new(&settings.uploads);
        tokio::fs::create_dir_all(blob_store.root())
            .await
            .with_context(|| format!("failed to create upload dir {}", settings.uploads.dir))?;

        let addr = settings.server_addr();
        let state = AppState::new(settings, repos, Arc::new(blob_store));
        let router = build_router(state);

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
