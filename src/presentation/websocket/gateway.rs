//! WebSocket Gateway
//!
//! Tracks live connections and routes events to them. Every chat is a room;
//! a connection is in the room of each active chat its user participates in.
//! A user may hold several connections at once.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::messages::ServerEvent;
use super::session::ConnectedSession;
use crate::config::PresenceScope;
use crate::infrastructure::metrics;

/// Result of dropping a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnected {
    pub user_id: i64,
    /// True when the user has no other live connection
    pub was_last: bool,
    pub rooms: Vec<i64>,
}

/// WebSocket gateway managing all connections
pub struct Gateway {
    /// Active sessions by session_id
    sessions: DashMap<String, Arc<ConnectedSession>>,
    /// User ID to session IDs mapping
    user_sessions: DashMap<i64, Vec<String>>,
    /// Chat ID to session IDs mapping
    room_sessions: DashMap<i64, Vec<String>>,
    heartbeat_interval_ms: u64,
    presence_scope: PresenceScope,
}

impl Gateway {
    pub fn new(heartbeat_interval_ms: u64, presence_scope: PresenceScope) -> Self {
        Self {
            sessions: DashMap::new(),
            user_sessions: DashMap::new(),
            room_sessions: DashMap::new(),
            heartbeat_interval_ms,
            presence_scope,
        }
    }

    pub fn heartbeat_interval(&self) -> u64 {
        self.heartbeat_interval_ms
    }

    /// Register a new connected session and join it to its rooms.
    ///
    /// Returns true when this is the user's first live session.
    pub fn register_session(
        &self,
        session_id: String,
        user_id: i64,
        rooms: Vec<i64>,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> bool {
        let session = Arc::new(ConnectedSession::new(
            session_id.clone(),
            user_id,
            rooms.iter().copied(),
            sender,
        ));
        self.sessions.insert(session_id.clone(), session);

        let first = {
            let mut entry = self.user_sessions.entry(user_id).or_default();
            entry.push(session_id.clone());
            entry.len() == 1
        };

        for chat_id in rooms {
            self.add_to_room(chat_id, &session_id);
        }

        metrics::set_realtime_sessions(self.sessions.len());
        tracing::info!(user_id, session_id = %session_id, first, "Session registered");
        first
    }

    /// Drop a session from every mapping.
    pub fn unregister_session(&self, session_id: &str) -> Option<Disconnected> {
        let (_, session) = self.sessions.remove(session_id)?;
        let user_id = session.user_id;

        let was_last = match self.user_sessions.get_mut(&user_id) {
            Some(mut ids) => {
                ids.retain(|s| s != session_id);
                ids.is_empty()
            }
            None => true,
        };
        if was_last {
            self.user_sessions.remove_if(&user_id, |_, ids| ids.is_empty());
        }

        let rooms = session.rooms();
        for chat_id in &rooms {
            self.remove_from_room(*chat_id, session_id);
        }

        metrics::set_realtime_sessions(self.sessions.len());
        tracing::info!(user_id, session_id = %session_id, was_last, "Session unregistered");

        Some(Disconnected {
            user_id,
            was_last,
            rooms,
        })
    }

    /// Replace a session's room set with a freshly computed one.
    pub fn replace_rooms(&self, session_id: &str, rooms: Vec<i64>) {
        let Some(session) = self.session(session_id) else {
            return;
        };
        let next: HashSet<i64> = rooms.into_iter().collect();
        let previous = session.replace_rooms(next.clone());

        for chat_id in previous.difference(&next) {
            self.remove_from_room(*chat_id, session_id);
        }
        for chat_id in next.difference(&previous) {
            self.add_to_room(*chat_id, session_id);
        }
    }

    /// Join every live session of a user to a chat room.
    pub fn join_room(&self, user_id: i64, chat_id: i64) {
        for session in self.user_session_handles(user_id) {
            if session.join(chat_id) {
                self.add_to_room(chat_id, &session.session_id);
            }
        }
    }

    /// Remove every live session of a user from a chat room.
    pub fn leave_room(&self, user_id: i64, chat_id: i64) {
        for session in self.user_session_handles(user_id) {
            if session.leave(chat_id) {
                self.remove_from_room(chat_id, &session.session_id);
            }
        }
    }

    /// Empty a room entirely, e.g. after the chat is deactivated.
    pub fn close_room(&self, chat_id: i64) {
        let Some((_, ids)) = self.room_sessions.remove(&chat_id) else {
            return;
        };
        for id in ids {
            if let Some(session) = self.session(&id) {
                session.leave(chat_id);
            }
        }
    }

    /// Send to every session in a room, optionally skipping one user's sessions.
    ///
    /// The room entry is held exclusively while enqueuing, so concurrent
    /// senders into one room are serialized and every subscriber observes
    /// the same order. Returns the number of sessions reached.
    pub fn send_to_room(&self, chat_id: i64, event: ServerEvent, except_user: Option<i64>) -> usize {
        let Some(ids) = self.room_sessions.get_mut(&chat_id) else {
            return 0;
        };
        metrics::record_realtime_event(event.name());
        let mut delivered = 0;
        for id in ids.value() {
            let Some(session) = self.sessions.get(id) else {
                continue;
            };
            if except_user == Some(session.user_id) {
                continue;
            }
            if session.send(event.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Send directly to a session
    pub fn send_to_session(&self, session_id: &str, event: ServerEvent) -> bool {
        self.session(session_id)
            .map(|session| session.send(event))
            .unwrap_or(false)
    }

    /// Announce a presence change for a user.
    ///
    /// With [`PresenceScope::Peers`] only sessions sharing one of `rooms` hear
    /// it; otherwise every live session does. The user's own sessions never do.
    pub fn broadcast_presence(&self, user_id: i64, rooms: &[i64], event: ServerEvent) -> usize {
        let targets: Vec<Arc<ConnectedSession>> = match self.presence_scope {
            PresenceScope::Everyone => self
                .sessions
                .iter()
                .filter(|entry| entry.user_id != user_id)
                .map(|entry| Arc::clone(entry.value()))
                .collect(),
            PresenceScope::Peers => {
                let mut seen = HashSet::new();
                for chat_id in rooms {
                    if let Some(ids) = self.room_sessions.get(chat_id) {
                        seen.extend(ids.value().iter().cloned());
                    }
                }
                seen.iter()
                    .filter_map(|id| self.session(id))
                    .filter(|session| session.user_id != user_id)
                    .collect()
            }
        };

        metrics::record_realtime_event(event.name());
        targets
            .into_iter()
            .filter(|session| session.send(event.clone()))
            .count()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn session(&self, session_id: &str) -> Option<Arc<ConnectedSession>> {
        self.sessions.get(session_id).map(|s| Arc::clone(s.value()))
    }

    fn user_session_handles(&self, user_id: i64) -> Vec<Arc<ConnectedSession>> {
        let ids = match self.user_sessions.get(&user_id) {
            Some(ids) => ids.value().clone(),
            None => return Vec::new(),
        };
        ids.iter().filter_map(|id| self.session(id)).collect()
    }

    fn add_to_room(&self, chat_id: i64, session_id: &str) {
        let mut ids = self.room_sessions.entry(chat_id).or_default();
        if !ids.iter().any(|s| s == session_id) {
            ids.push(session_id.to_string());
        }
    }

    fn remove_from_room(&self, chat_id: i64, session_id: &str) {
        if let Some(mut ids) = self.room_sessions.get_mut(&chat_id) {
            ids.retain(|s| s != session_id);
        }
        self.room_sessions.remove_if(&chat_id, |_, ids| ids.is_empty());
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(45_000, PresenceScope::Everyone)
    }
}
