//! WebSocket command channel
//!
//! Each inbound text frame is one command. Its progress events are written
//! back on the same socket as JSON text frames, in order.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use pagepilot_orchestrator::{Command, CommandError, ProgressEvent, ProgressSink, SessionHandle};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::server::SharedState;

/// How often to send WebSocket Ping frames
const PING_INTERVAL: Duration = Duration::from_secs(30);

pub async fn ws_handler(ws: WebSocketUpgrade, State(app): State<SharedState>) -> impl IntoResponse {
    let session = app.session.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, session))
}

async fn handle_socket(socket: WebSocket, session: SessionHandle) {
    info!("WebSocket client connected");
    let (mut sender, mut receiver) = socket.split();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<ProgressEvent>();

    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    // The first tick completes immediately
    ping_interval.tick().await;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sender.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            Some(event) = events_rx.recv() => {
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to encode event: {}", e),
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => handle_frame(&session, &text, &events_tx).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("WebSocket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
    info!("WebSocket client disconnected");
}

/// Parse and queue one frame; problems become `error` events on the socket
async fn handle_frame(session: &SessionHandle, text: &str, events: &mpsc::UnboundedSender<ProgressEvent>) {
    let command = match Command::from_json(text) {
        Ok(command) => command,
        Err(e) => {
            events.emit(ProgressEvent::error(None, &e));
            return;
        }
    };

    debug!("Received command: {}", command.name());
    if let Err(e) = session.submit(command, events.clone()).await {
        events.emit(ProgressEvent::error(None, &CommandError::Failed(e.to_string())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagepilot_agent::MockProvider;
    use pagepilot_browser::{MockBrowser, MockLauncher};
    use pagepilot_core::config::PilotConfig;
    use pagepilot_orchestrator::{Collaborators, ErrorKind, MockRunner, Orchestrator};
    use std::sync::Arc;

    fn session() -> SessionHandle {
        let collaborators = Collaborators {
            provider: Arc::new(MockProvider::new()),
            launcher: Arc::new(MockLauncher::new(MockBrowser::new("Home", "https://example.com"))),
            runner: Arc::new(MockRunner::new()),
        };
        SessionHandle::spawn(Orchestrator::in_memory(collaborators, &PilotConfig::default())).0
    }

    #[tokio::test]
    async fn test_invalid_frame_becomes_error_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle_frame(&session(), "{not json", &tx).await;

        match rx.recv().await.unwrap() {
            ProgressEvent::Error { kind, message, .. } => {
                assert_eq!(kind, ErrorKind::Failed);
                assert!(message.starts_with("Invalid command message"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chat_frame_is_answered() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle_frame(&session(), r#"{"command": "chat", "payload": {"message": "hi"}}"#, &tx).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            ProgressEvent::ChatResponse {
                message: "Received: hi. How can I help you test your application?".to_string()
            }
        );
    }
}
