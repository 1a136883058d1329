use std::collections::HashMap;
use tracing::info;

use crate::models::SessionId;
use super::session::Session;

/// Owns every live session, keyed by session id.
///
/// A session is present exactly while it has participants: it is created on
/// first join and removed by the caller as soon as its last participant leaves.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    default_language: String,
}

impl SessionRegistry {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            sessions: HashMap::new(),
            default_language: default_language.into(),
        }
    }

    /// Return the session, creating it with the seeded document if unknown.
    pub fn get_or_create(&mut self, session_id: &str) -> &mut Session {
        let default_language = &self.default_language;
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                info!("Session {} created", session_id);
                Session::new(session_id, default_language)
            })
    }

    pub fn remove(&mut self, session_id: &str) -> Option<Session> {
        let removed = self.sessions.remove(session_id);
        if removed.is_some() {
            info!("Session {} deleted (empty)", session_id);
        }
        removed
    }

    pub fn lookup(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn lookup_mut(&mut self, session_id: &str) -> Option<&mut Session> {
        self.sessions.get_mut(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Participants across every session.
    pub fn participant_count(&self) -> usize {
        self.sessions.values().map(Session::participant_count).sum()
    }
}
