use std::collections::HashMap;
use tracing::{debug, info, trace, warn};

use crate::models::{
    ConnectionId, CursorPosition, CursorUpdateMessage, DocumentUpdateMessage, JoinMessage,
    LanguageUpdateMessage, PresenceLeftMessage, ReceivedMessage, SendMessage, SessionId,
};
use super::membership::MembershipManager;
use super::registry::SessionRegistry;
use super::router::{BroadcastRouter, Outbox};

/// Where a connection stands. Unknown connections report `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unbound,
    Bound(SessionId),
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounts {
    pub sessions: usize,
    pub participants: usize,
    pub connections: usize,
}

/// Binds each connection to at most one session and sequences membership,
/// document mutation and fan-out for every inbound event.
///
/// Every method runs to completion without awaiting; the dispatcher calls
/// them one at a time, which is what orders last-writer-wins updates.
pub struct ConnectionLifecycleHandler {
    registry: SessionRegistry,
    membership: MembershipManager,
    router: BroadcastRouter,
    connections: HashMap<ConnectionId, ConnectionState>,
}

impl ConnectionLifecycleHandler {
    pub fn new(registry: SessionRegistry, membership: MembershipManager) -> Self {
        Self {
            registry,
            membership,
            router: BroadcastRouter::new(),
            connections: HashMap::new(),
        }
    }

    pub fn on_connect(&mut self, connection_id: &str, outbox: Outbox) {
        debug!("Connection {} registered", connection_id);
        self.router.register(connection_id, outbox);
        self.connections.insert(connection_id.to_string(), ConnectionState::Unbound);
    }

    pub fn on_event(&mut self, connection_id: &str, msg: ReceivedMessage) {
        self.apply_event(connection_id, msg);
        self.evict_lagging();
    }

    pub fn on_disconnect(&mut self, connection_id: &str) {
        self.close_connection(connection_id);
        self.evict_lagging();
    }

    pub fn state(&self, connection_id: &str) -> ConnectionState {
        self.connections
            .get(connection_id)
            .cloned()
            .unwrap_or(ConnectionState::Closed)
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn counts(&self) -> SessionCounts {
        SessionCounts {
            sessions: self.registry.len(),
            participants: self.registry.participant_count(),
            connections: self.connections.len(),
        }
    }

    fn apply_event(&mut self, connection_id: &str, msg: ReceivedMessage) {
        let state = match self.connections.get(connection_id) {
            Some(state) => state.clone(),
            None => {
                debug!("Dropping {} from closed connection {}", msg.kind(), connection_id);
                return;
            }
        };

        match msg {
            ReceivedMessage::Join(join) => self.handle_join(connection_id, &state, join),
            ReceivedMessage::CodeChange(change) => {
                if let Some(session_id) = bound_session(connection_id, &state, &change.session_id) {
                    self.handle_code_change(connection_id, &session_id, change.text);
                }
            }
            ReceivedMessage::CursorChange(change) => {
                if let Some(session_id) = bound_session(connection_id, &state, &change.session_id) {
                    self.handle_cursor_change(connection_id, &session_id, change.position);
                }
            }
            ReceivedMessage::LanguageChange(change) => {
                if let Some(session_id) = bound_session(connection_id, &state, &change.session_id) {
                    self.handle_language_change(connection_id, &session_id, change.language);
                }
            }
            ReceivedMessage::Ping => trace!("Ping from {} reached the dispatcher", connection_id),
        }
    }

    fn close_connection(&mut self, connection_id: &str) {
        self.router.unregister(connection_id);
        match self.connections.remove(connection_id) {
            Some(ConnectionState::Bound(session_id)) => self.leave_session(connection_id, &session_id),
            Some(_) => {}
            None => {
                debug!("Disconnect for already closed connection {}", connection_id);
                return;
            }
        }
        info!("Connection {} closed", connection_id);
    }

    fn handle_join(&mut self, connection_id: &str, state: &ConnectionState, join: JoinMessage) {
        if let ConnectionState::Bound(current) = state {
            if *current == join.session_id {
                // Already a member: hand out a fresh snapshot, membership is unchanged.
                if let Some(session) = self.registry.lookup(current) {
                    if let Some(name) = join.display_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
                        let known = session.participant(connection_id).map(|p| p.display_name.as_str());
                        if known != Some(name) {
                            debug!("Connection {} rejoined {} as {}, keeping its current name", connection_id, current, name);
                        }
                    }
                    self.router.broadcast_to_one(connection_id, SendMessage::SyncSnapshot(session.snapshot()));
                }
                return;
            }
            info!("Connection {} moving from session {} to {}", connection_id, current, join.session_id);
            self.leave_session(connection_id, current);
        }

        let session = self.registry.get_or_create(&join.session_id);
        let outcome = self.membership.join(session, connection_id, join.display_name.as_deref());

        self.router.broadcast_to_one(connection_id, SendMessage::SyncSnapshot(outcome.snapshot));
        self.router.broadcast_to_others(session, connection_id, &SendMessage::PresenceJoined(outcome.participant));

        self.connections
            .insert(connection_id.to_string(), ConnectionState::Bound(join.session_id));
    }

    fn handle_code_change(&mut self, connection_id: &str, session_id: &str, text: String) {
        let Some(session) = self.registry.lookup_mut(session_id) else {
            return;
        };
        session.apply_code_change(text);
        debug!("Code change in session {} from {}", session_id, connection_id);

        let msg = SendMessage::DocumentUpdate(DocumentUpdateMessage {
            text: session.document_text.clone(),
            origin_connection_id: connection_id.to_string(),
        });
        self.router.broadcast_to_others(session, connection_id, &msg);
    }

    fn handle_cursor_change(&mut self, connection_id: &str, session_id: &str, position: CursorPosition) {
        let Some(session) = self.registry.lookup_mut(session_id) else {
            return;
        };
        let Some(participant) = self.membership.update_cursor(session, connection_id, position) else {
            return;
        };

        let msg = SendMessage::CursorUpdate(CursorUpdateMessage {
            connection_id: connection_id.to_string(),
            position,
            participant,
        });
        self.router.broadcast_to_others(session, connection_id, &msg);
    }

    fn handle_language_change(&mut self, connection_id: &str, session_id: &str, language: String) {
        let Some(session) = self.registry.lookup_mut(session_id) else {
            return;
        };
        session.apply_language_change(language);
        debug!("Language of session {} set to {} by {}", session_id, session.language, connection_id);

        let msg = SendMessage::LanguageUpdate(LanguageUpdateMessage {
            language: session.language.clone(),
        });
        self.router.broadcast_to_others(session, connection_id, &msg);
    }

    /// Drop connections whose outbox overflowed; their leave may overflow others.
    fn evict_lagging(&mut self) {
        loop {
            let lagging = self.router.take_lagging();
            if lagging.is_empty() {
                break;
            }
            for connection_id in lagging {
                warn!("Connection {} stopped reading, evicting it", connection_id);
                self.close_connection(&connection_id);
            }
        }
    }

    fn leave_session(&mut self, connection_id: &str, session_id: &str) {
        let Some(session) = self.registry.lookup_mut(session_id) else {
            return;
        };
        let Some(participant) = self.membership.leave(session, connection_id) else {
            return;
        };

        let msg = SendMessage::PresenceLeft(PresenceLeftMessage {
            connection_id: connection_id.to_string(),
            participant,
        });
        self.router.broadcast_to_others(session, connection_id, &msg);

        if session.is_empty() {
            self.registry.remove(session_id);
            if self.registry.is_empty() {
                debug!("No live sessions left");
            }
        }
    }
}

/// Session a mutation may act on: the bound one, and only if the frame names it.
fn bound_session(connection_id: &str, state: &ConnectionState, claimed: &str) -> Option<SessionId> {
    match state {
        ConnectionState::Bound(session_id) if session_id == claimed => Some(session_id.clone()),
        ConnectionState::Bound(session_id) => {
            warn!(
                "Connection {} sent an event for session {} while bound to {}",
                connection_id, claimed, session_id
            );
            None
        }
        ConnectionState::Unbound => {
            debug!("Dropping event from unbound connection {}", connection_id);
            None
        }
        ConnectionState::Closed => None,
    }
}
