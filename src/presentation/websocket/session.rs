//! WebSocket Session Management

use std::collections::HashSet;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::mpsc;

use super::messages::ServerEvent;

/// A live connection as seen by the gateway.
pub struct ConnectedSession {
    pub session_id: String,
    pub user_id: i64,
    rooms: RwLock<HashSet<i64>>,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectedSession {
    pub fn new(
        session_id: String,
        user_id: i64,
        rooms: impl IntoIterator<Item = i64>,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> Self {
        Self {
            session_id,
            user_id,
            rooms: RwLock::new(rooms.into_iter().collect()),
            sender,
        }
    }

    /// Queue an event for the writer task. False once the connection is gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }

    pub fn rooms(&self) -> Vec<i64> {
        self.rooms.read().iter().copied().collect()
    }

    /// Returns false if already joined.
    pub(super) fn join(&self, chat_id: i64) -> bool {
        self.rooms.write().insert(chat_id)
    }

    /// Returns false if not joined.
    pub(super) fn leave(&self, chat_id: i64) -> bool {
        self.rooms.write().remove(&chat_id)
    }

    /// Swap the room set, returning the previous one.
    pub(super) fn replace_rooms(&self, rooms: HashSet<i64>) -> HashSet<i64> {
        std::mem::replace(&mut *self.rooms.write(), rooms)
    }
}

/// Per-connection state owned by the connection task
#[derive(Debug)]
pub struct SessionState {
    pub user_id: i64,
    pub session_id: String,
    pub last_heartbeat: Instant,
}

impl SessionState {
    pub fn new(session_id: String, user_id: i64) -> Self {
        Self {
            user_id,
            session_id,
            last_heartbeat: Instant::now(),
        }
    }

    pub fn heartbeat(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    pub fn is_alive(&self, timeout: Duration) -> bool {
        self.last_heartbeat.elapsed() < timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_membership() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = ConnectedSession::new("s1".into(), 1, [10, 20], tx);

        assert!(!session.join(10));
        assert!(session.join(30));
        assert!(session.leave(20));
        assert!(!session.leave(20));

        let previous = session.replace_rooms(HashSet::from([99]));
        assert_eq!(previous, HashSet::from([10, 30]));
        assert_eq!(session.rooms(), vec![99]);
    }

    #[test]
    fn test_send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ConnectedSession::new("s1".into(), 1, [], tx);
        drop(rx);
        assert!(!session.send(ServerEvent::Error(super::super::messages::ErrorPayload {
            event: None,
            code: 0,
            message: "gone".into(),
        })));
    }

    #[test]
    fn test_heartbeat_liveness() {
        let mut state = SessionState::new("s1".into(), 1);
        assert!(state.is_alive(Duration::from_secs(5)));
        state.last_heartbeat = Instant::now() - Duration::from_secs(10);
        assert!(!state.is_alive(Duration::from_secs(5)));
        state.heartbeat();
        assert!(state.is_alive(Duration::from_secs(5)));
    }
}
