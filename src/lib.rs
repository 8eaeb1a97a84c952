//! # Messenger Server Library
//!
//! Real-time messaging backend:
//! - REST API for identities, contacts, chats and messages
//! - WebSocket gateway for live delivery, presence, typing, read receipts
//!   and call signaling
//! - PostgreSQL or in-memory storage behind repository traits
//!
//! ## Architecture
//!
//! - **Domain Layer**: Entities, membership policy and repository traits
//! - **Application Layer**: Services and DTOs
//! - **Infrastructure Layer**: Storage adapters, blob store, metrics
//! - **Presentation Layer**: HTTP handlers, middleware and the WebSocket gateway
//!
//! ## Module Structure
//!
//! ```text
//! messenger_server/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities, value objects, and traits
//! +-- application/    Application services and DTOs
//! +-- infrastructure/ PostgreSQL, in-memory and blob storage, metrics
//! +-- presentation/   HTTP routes and WebSocket handlers
//! +-- shared/         Common utilities (errors, snowflake IDs)
//! ```

pub mod config;

pub mod domain;

pub mod application;

pub mod infrastructure;

pub mod presentation;

pub mod shared;

// Application startup and state management
pub mod startup;

// Structured logging setup
pub mod telemetry;
