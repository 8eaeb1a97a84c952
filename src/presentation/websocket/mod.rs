//! WebSocket Gateway
//!
//! Real-time communication via WebSocket connections.

pub mod gateway;
pub mod handler;
pub mod messages;
pub mod session;

pub use gateway::{Disconnected, Gateway};
pub use handler::{
    authenticate_connection, close_session, handle_event, open_session, ws_handler,
};
pub use messages::{ClientEvent, ServerEvent};
pub use session::{ConnectedSession, SessionState};
