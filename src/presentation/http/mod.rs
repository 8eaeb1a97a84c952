//! HTTP API
//!
//! REST handlers and route wiring.

pub mod handlers;
pub mod routes;
