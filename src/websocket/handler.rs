use std::sync::Arc;
use axum::{
    extract::{State, ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, timeout, Duration, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};
use futures_util::{StreamExt, SinkExt};
use uuid::Uuid;

use crate::AppState;
use crate::models::{ReceivedMessage, SendMessage};
use crate::websocket::msg_ping_handler::handle_ping_message;
use crate::ws::DispatcherHandle;
use crate::ws::router::Outbox;

// Time the writer gets to flush a close frame once the reader is done
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    debug!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

// Queue the disconnect for the dispatcher whichever way the socket task ends
struct DisconnectOnDrop {
    dispatcher: DispatcherHandle,
    connection_id: String,
}

impl Drop for DisconnectOnDrop {
    fn drop(&mut self) {
        if !self.dispatcher.disconnect(&self.connection_id) {
            warn!("Dispatcher stopped before disconnect of {}", self.connection_id);
        }
    }
}

async fn next_heartbeat(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {

    // Fresh identity per socket, never reused
    let connection_id = Uuid::new_v4().to_string();
    info!("WebSocket connection established with connection_id: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::channel::<SendMessage>(app_state.config.outbox_capacity.max(1));
    let (close_tx, mut close_rx) = oneshot::channel::<CloseFrame<'static>>();

    let dispatcher = app_state.dispatcher.clone();
    if !dispatcher.connect(&connection_id, outbox.clone()) {
        error!("Session dispatcher unavailable, dropping connection {}", connection_id);
        return;
    }
    let _disconnect = DisconnectOnDrop {
        dispatcher: dispatcher.clone(),
        connection_id: connection_id.clone(),
    };

    let idle_timeout = app_state.config.idle_timeout();
    let mut heartbeat = app_state.config.heartbeat_interval().map(|period| {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    // Writer: drain the outbox onto the socket and keep the peer answering pings
    let writer_id = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                msg = outbox_rx.recv() => match msg {
                    Some(msg) => match serde_json::to_string(&msg) {
                        Ok(text) => Message::Text(text),
                        Err(e) => {
                            error!("Failed to serialize outbound message for {}: {}", writer_id, e);
                            continue;
                        }
                    },
                    None => break,
                },
                _ = next_heartbeat(&mut heartbeat) => {
                    trace!("Heartbeat ping to {}", writer_id);
                    Message::Ping(Vec::new())
                }
                close = &mut close_rx => {
                    if let Ok(frame) = close {
                        if sender.send(Message::Close(Some(frame))).await.is_err() {
                            debug!("Could not send close frame to {}", writer_id);
                        }
                    }
                    break;
                }
            };

            // A peer that stops reading must not hold the writer forever
            let written = match idle_timeout {
                Some(limit) => matches!(timeout(limit, sender.send(frame)).await, Ok(Ok(()))),
                None => sender.send(frame).await.is_ok(),
            };
            if !written {
                debug!("Socket write failed or stalled for {}", writer_id);
                break;
            }
        }
    });

    // Reader: validate frames and hand them to the dispatcher
    let reader_id = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            let frame = match idle_timeout {
                Some(limit) => match timeout(limit, receiver.next()).await {
                    Ok(frame) => frame,
                    Err(_) => {
                        warn!("Connection {} silent for {:?}, reclaiming", reader_id, limit);
                        let frame = CloseFrame {
                            code: close_code::AWAY,
                            reason: "idle timeout".into(),
                        };
                        if close_tx.send(frame).is_err() {
                            debug!("Writer for {} already gone", reader_id);
                        }
                        break;
                    }
                },
                None => receiver.next().await,
            };

            match frame {
                Some(Ok(Message::Text(text))) => handle_text_frame(&text, &reader_id, &dispatcher, &outbox),
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Connection {} closed by peer", reader_id);
                    break;
                }
                // Pongs answering the heartbeat, pings and binary frames only count as activity
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error on {}: {}", reader_id, e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish, then finish the other
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => {
            if timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
                send_task.abort();
            }
        }
    };
    info!("WebSocket connection {} terminated", connection_id);
}

fn handle_text_frame(text: &str, connection_id: &str, dispatcher: &DispatcherHandle, outbox: &Outbox) {
    let msg: ReceivedMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!("Dropping malformed frame from {}: {}", connection_id, e);
            return;
        }
    };

    if !msg.is_well_formed() {
        warn!("Dropping invalid {} frame from {}", msg.kind(), connection_id);
        return;
    }

    match msg {
        ReceivedMessage::Ping => handle_ping_message(connection_id, outbox),
        other => {
            if !dispatcher.dispatch(connection_id, other) {
                error!("Session dispatcher unavailable for connection {}", connection_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::routes::create_app;
    use serde_json::json;
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::{sleep, Duration};
    use tokio::time::timeout_at;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
    use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn start_server(config: Config) -> (String, Arc<AppState>) {
        let state = Arc::new(AppState::new(config));
        let app = create_app(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("ws://{addr}/ws"), state)
    }

    async fn connect(url: &str) -> Client {
        let (ws, _) = connect_async(url).await.unwrap();
        ws
    }

    async fn send(ws: &mut Client, value: serde_json::Value) {
        ws.send(tungstenite::Message::text(value.to_string())).await.unwrap();
    }

    async fn send_raw(ws: &mut Client, raw: &str) {
        ws.send(tungstenite::Message::text(raw.to_string())).await.unwrap();
    }

    async fn recv(ws: &mut Client) -> SendMessage {
        loop {
            let frame = timeout(Duration::from_secs(2), ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("connection closed")
                .unwrap();
            if frame.is_text() {
                return serde_json::from_str(frame.to_text().unwrap()).unwrap();
            }
        }
    }

    async fn assert_silent(ws: &mut Client) {
        assert!(timeout(Duration::from_millis(200), ws.next()).await.is_err());
    }

    async fn wait_for_sessions(state: &AppState, expected: usize) {
        for _ in 0..100 {
            if state.dispatcher.diagnostics().await.map(|c| c.sessions) == Some(expected) {
                return;
            }
            sleep(Duration::from_millis(20)).await;
        }
        panic!("session count never reached {}", expected);
    }

    #[tokio::test]
    async fn test_two_peer_scenario_over_websocket() {
        let (url, state) = start_server(Config::default()).await;
        let mut c1 = connect(&url).await;
        let mut c2 = connect(&url).await;

        send(&mut c1, json!({"type": "join", "sessionId": "ABCD1234", "displayName": ""})).await;
        let c1_id = match recv(&mut c1).await {
            SendMessage::SyncSnapshot(snapshot) => {
                assert!(snapshot.document_text.contains("ABCD1234"));
                assert_eq!(snapshot.language, "javascript");
                assert_eq!(snapshot.participants.len(), 1);
                snapshot.participants[0].id.clone()
            }
            other => panic!("unexpected {:?}", other),
        };

        send(&mut c2, json!({"type": "join", "sessionId": "ABCD1234", "displayName": "Bo"})).await;
        let c2_id = match recv(&mut c2).await {
            SendMessage::SyncSnapshot(snapshot) => {
                assert_eq!(snapshot.participants.len(), 2);
                snapshot
                    .participants
                    .iter()
                    .find(|p| p.display_name == "Bo")
                    .map(|p| p.id.clone())
                    .unwrap()
            }
            other => panic!("unexpected {:?}", other),
        };
        match recv(&mut c1).await {
            SendMessage::PresenceJoined(participant) => assert_eq!(participant.id, c2_id),
            other => panic!("unexpected {:?}", other),
        }

        send(&mut c1, json!({"type": "code-change", "sessionId": "ABCD1234", "text": "x=1"})).await;
        match recv(&mut c2).await {
            SendMessage::DocumentUpdate(update) => {
                assert_eq!(update.text, "x=1");
                assert_eq!(update.origin_connection_id, c1_id);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_silent(&mut c1).await;

        c2.close(None).await.unwrap();
        match recv(&mut c1).await {
            SendMessage::PresenceLeft(left) => assert_eq!(left.connection_id, c2_id),
            other => panic!("unexpected {:?}", other),
        }
        wait_for_sessions(&state, 1).await;

        c1.close(None).await.unwrap();
        wait_for_sessions(&state, 0).await;
    }

    #[tokio::test]
    async fn test_ping_is_answered_without_join() {
        let (url, state) = start_server(Config::default()).await;
        let mut ws = connect(&url).await;

        send(&mut ws, json!({"type": "ping"})).await;
        assert!(matches!(recv(&mut ws).await, SendMessage::Pong(_)));
        assert_eq!(state.dispatcher.diagnostics().await.unwrap().sessions, 0);
    }

    #[tokio::test]
    async fn test_malformed_frames_are_dropped() {
        let (url, _state) = start_server(Config::default()).await;
        let mut ws = connect(&url).await;

        send_raw(&mut ws, "not json").await;
        send(&mut ws, json!({"type": "code-change", "sessionId": "s"})).await;
        send(&mut ws, json!({"type": "join", "sessionId": ""})).await;
        send(&mut ws, json!({"type": "teleport", "sessionId": "s"})).await;
        assert_silent(&mut ws).await;

        // The connection survives and still works.
        send(&mut ws, json!({"type": "join", "sessionId": "s", "displayName": "Al"})).await;
        match recv(&mut ws).await {
            SendMessage::SyncSnapshot(snapshot) => assert_eq!(snapshot.participants[0].display_name, "Al"),
            other => panic!("unexpected {:?}", other),
        }

        send(&mut ws, json!({"type": "cursor-change", "sessionId": "s", "position": {"line": 0, "column": 1}})).await;
        assert_silent(&mut ws).await;
    }

    #[tokio::test]
    async fn test_idle_connection_is_reclaimed() {
        let config = Config {
            idle_timeout_secs: 1,
            ..Config::default()
        };
        let (url, state) = start_server(config).await;
        let mut ws = connect(&url).await;

        send(&mut ws, json!({"type": "join", "sessionId": "quiet"})).await;
        assert!(matches!(recv(&mut ws).await, SendMessage::SyncSnapshot(_)));
        wait_for_sessions(&state, 1).await;

        let ended = timeout(Duration::from_secs(3), ws.next())
            .await
            .expect("idle connection was never closed");
        match ended {
            Some(Ok(tungstenite::Message::Close(Some(frame)))) => {
                assert_eq!(frame.code, CloseCode::Away);
                assert_eq!(frame.reason.as_str(), "idle timeout");
            }
            other => panic!("expected a close frame, got {:?}", other),
        }
        wait_for_sessions(&state, 0).await;
    }

    #[tokio::test]
    async fn test_listening_client_survives_idle_limit() {
        let config = Config {
            idle_timeout_secs: 2,
            heartbeat_interval_secs: 1,
            ..Config::default()
        };
        let (url, state) = start_server(config).await;
        let mut ws = connect(&url).await;

        send(&mut ws, json!({"type": "join", "sessionId": "doc"})).await;
        assert!(matches!(recv(&mut ws).await, SendMessage::SyncSnapshot(_)));
        send(&mut ws, json!({"type": "code-change", "sessionId": "doc", "text": "precious work"})).await;

        // Only read, never type; reading is what answers the server pings.
        let deadline = Instant::now() + Duration::from_millis(4500);
        let mut pings = 0;
        while let Ok(frame) = timeout_at(deadline, ws.next()).await {
            match frame {
                Some(Ok(tungstenite::Message::Ping(_))) => pings += 1,
                other => panic!("listening client got {:?}", other),
            }
        }
        assert!(pings >= 3, "only {} heartbeats seen", pings);
        assert_eq!(state.dispatcher.diagnostics().await.unwrap().sessions, 1);

        let mut late = connect(&url).await;
        send(&mut late, json!({"type": "join", "sessionId": "doc"})).await;
        match recv(&mut late).await {
            SendMessage::SyncSnapshot(snapshot) => {
                assert_eq!(snapshot.document_text, "precious work");
                assert_eq!(snapshot.participants.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unanswered_heartbeat_reclaims_connection() {
        let config = Config {
            idle_timeout_secs: 2,
            heartbeat_interval_secs: 1,
            ..Config::default()
        };
        let (url, state) = start_server(config).await;
        let mut ws = connect(&url).await;

        send(&mut ws, json!({"type": "join", "sessionId": "gone"})).await;
        assert!(matches!(recv(&mut ws).await, SendMessage::SyncSnapshot(_)));
        wait_for_sessions(&state, 1).await;

        // Never polled again, so no pong goes back.
        sleep(Duration::from_millis(3500)).await;
        wait_for_sessions(&state, 0).await;
        drop(ws);
    }
}
