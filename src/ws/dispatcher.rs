use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::models::{ConnectionId, ReceivedMessage};
use super::lifecycle::{ConnectionLifecycleHandler, SessionCounts};
use super::router::Outbox;

/// Commands for the session dispatcher task.
#[derive(Debug)]
pub enum DispatchCmd {
    /// A socket was upgraded; register its outbox.
    Connect {
        connection_id: ConnectionId,
        outbox: Outbox,
    },
    /// A validated inbound frame.
    Event {
        connection_id: ConnectionId,
        message: ReceivedMessage,
    },
    /// The socket is gone; leave and clean up.
    Disconnect {
        connection_id: ConnectionId,
    },
    /// Snapshot of registry counters.
    Diagnostics {
        reply: oneshot::Sender<SessionCounts>,
    },
}

/// Cloneable handle onto the dispatcher task.
///
/// The channel is unbounded so that enqueueing never awaits; a disconnect can
/// be queued from a `Drop` impl.
#[derive(Clone, Debug)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<DispatchCmd>,
}

impl DispatcherHandle {
    pub fn connect(&self, connection_id: &str, outbox: Outbox) -> bool {
        self.tx
            .send(DispatchCmd::Connect {
                connection_id: connection_id.to_string(),
                outbox,
            })
            .is_ok()
    }

    pub fn dispatch(&self, connection_id: &str, message: ReceivedMessage) -> bool {
        self.tx
            .send(DispatchCmd::Event {
                connection_id: connection_id.to_string(),
                message,
            })
            .is_ok()
    }

    pub fn disconnect(&self, connection_id: &str) -> bool {
        self.tx
            .send(DispatchCmd::Disconnect {
                connection_id: connection_id.to_string(),
            })
            .is_ok()
    }

    /// Registry counters, or `None` if the dispatcher has stopped.
    pub async fn diagnostics(&self) -> Option<SessionCounts> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(DispatchCmd::Diagnostics { reply }).ok()?;
        rx.await.ok()
    }

    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Start the dispatcher task that owns all session state.
pub fn spawn_dispatcher(handler: ConnectionLifecycleHandler) -> DispatcherHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run(rx, handler));
    DispatcherHandle { tx }
}

async fn run(mut rx: mpsc::UnboundedReceiver<DispatchCmd>, mut handler: ConnectionLifecycleHandler) {
    info!("Session dispatcher started");
    while let Some(cmd) = rx.recv().await {
        match cmd {
            DispatchCmd::Connect { connection_id, outbox } => handler.on_connect(&connection_id, outbox),
            DispatchCmd::Event { connection_id, message } => handler.on_event(&connection_id, message),
            DispatchCmd::Disconnect { connection_id } => handler.on_disconnect(&connection_id),
            DispatchCmd::Diagnostics { reply } => {
                if reply.send(handler.counts()).is_err() {
                    debug!("Diagnostics requester went away");
                }
            }
        }
    }
    info!("Session dispatcher stopped");
}
