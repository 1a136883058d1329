use tracing::{debug, error};
use chrono::Utc;
use crate::models::{PongMessage, SendMessage};
use crate::ws::router::Outbox;

/// Answer a ping on the same connection. Session state is never touched.
pub fn handle_ping_message(connection_id: &str, outbox: &Outbox) {
    debug!("Ping message received from connection {}", connection_id);

    let pong = SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() });
    if outbox.try_send(pong).is_err() {
        error!("Failed to queue Pong message for connection {}", connection_id);
    }
}
