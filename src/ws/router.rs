use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};

use crate::models::{ConnectionId, SendMessage};
use super::session::Session;

/// Per-connection queue drained by that connection's socket writer.
pub type Outbox = mpsc::Sender<SendMessage>;

/// Fans outbound events to the live connections of a session.
///
/// Delivery is fire-and-forget: a closed outbox just means the connection is
/// on its way out and its disconnect is already queued behind this event.
/// A full outbox marks the connection as lagging; the owner evicts it with
/// [`BroadcastRouter::take_lagging`] since it has already missed an event.
#[derive(Debug, Default)]
pub struct BroadcastRouter {
    outboxes: HashMap<ConnectionId, Outbox>,
    lagging: Vec<ConnectionId>,
}

impl BroadcastRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, connection_id: &str, outbox: Outbox) {
        self.outboxes.insert(connection_id.to_string(), outbox);
    }

    pub fn unregister(&mut self, connection_id: &str) -> bool {
        self.outboxes.remove(connection_id).is_some()
    }

    pub fn connection_count(&self) -> usize {
        self.outboxes.len()
    }

    /// Deliver to every participant of `session` except `origin`.
    /// Returns how many outboxes accepted the event.
    pub fn broadcast_to_others(&mut self, session: &Session, origin: &str, msg: &SendMessage) -> usize {
        let mut delivered = 0;
        for connection_id in session.participants.keys() {
            if connection_id == origin {
                continue;
            }
            if self.send(connection_id, msg.clone()) {
                delivered += 1;
            }
        }
        trace!("Broadcast in session {} from {} reached {} peers", session.id, origin, delivered);
        delivered
    }

    pub fn broadcast_to_one(&mut self, connection_id: &str, msg: SendMessage) -> bool {
        self.send(connection_id, msg)
    }

    /// Connections whose outbox overflowed since the last call.
    pub fn take_lagging(&mut self) -> Vec<ConnectionId> {
        std::mem::take(&mut self.lagging)
    }

    fn send(&mut self, connection_id: &str, msg: SendMessage) -> bool {
        let Some(outbox) = self.outboxes.get(connection_id) else {
            debug!("No outbox for connection {}", connection_id);
            return false;
        };
        match outbox.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                if !self.lagging.iter().any(|id| id == connection_id) {
                    warn!("Outbox of connection {} is full, marking it as lagging", connection_id);
                    self.lagging.push(connection_id.to_string());
                }
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}
