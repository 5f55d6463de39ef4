//! `WebSocket` viewer sessions.
//!
//! Clients connect to `GET /ws`. The first frame a session writes is a
//! `data_update` carrying the current snapshot; after that it forwards
//! whatever the [`Broadcaster`](crate::broadcast::Broadcaster) queues for
//! it and handles inbound commands:
//!
//! - `request_data` -- send the current snapshot to this viewer only
//! - `set_pump_state` -- change a pump mode, then re-broadcast to everyone
//!
//! Malformed or rejected commands are answered with an `error` event.
//! On shutdown the session flushes its queue and sends a close frame.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use sia_types::{ClientEvent, ServerEvent, ViewerId};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::broadcast::encode;
use crate::error::ObserverError;
use crate::state::AppState;

type ViewerSink = SplitSink<WebSocket, Message>;
type ViewerStream = SplitStream<WebSocket>;

/// Upgrade an HTTP request to a viewer session.
///
/// # Route
///
/// `GET /ws`
pub async fn ws_viewer(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    ClientClosed,
    TransportFault,
    Shutdown,
}

async fn run_session(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (id, mut rx, initial) = state.attach_viewer().await;
    info!(viewer = %id, "Viewer connected");

    let greeted = match encode(&ServerEvent::data_update(initial)) {
        Some(frame) => sink.send(Message::Text(frame)).await.is_ok(),
        None => false,
    };
    let exit = if greeted {
        session_loop(&state, id, &mut sink, &mut stream, &mut rx).await
    } else {
        Exit::TransportFault
    };

    if exit == Exit::Shutdown {
        close_after_flush(&mut sink, &mut rx).await;
    }
    state.broadcaster.unregister(id).await;
    info!(viewer = %id, ?exit, "Viewer disconnected");
}

async fn session_loop(
    state: &AppState,
    id: ViewerId,
    sink: &mut ViewerSink,
    stream: &mut ViewerStream,
    rx: &mut mpsc::Receiver<Utf8Bytes>,
) -> Exit {
    loop {
        tokio::select! {
            biased;
            () = state.shutdown.wait() => return Exit::Shutdown,

            frame = rx.recv() => {
                let Some(frame) = frame else {
                    return Exit::TransportFault;
                };
                if let Err(e) = sink.send(Message::Text(frame)).await {
                    debug!(viewer = %id, error = %e, "send failed");
                    return Exit::TransportFault;
                }
            }

            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => handle_command(state, id, text.as_str()).await,
                Some(Ok(Message::Ping(data))) => {
                    if sink.send(Message::Pong(data)).await.is_err() {
                        return Exit::TransportFault;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Exit::ClientClosed,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(viewer = %id, error = %e, "receive failed");
                    return Exit::TransportFault;
                }
            },
        }
    }
}

/// Parse and execute one inbound command.
async fn handle_command(state: &AppState, id: ViewerId, text: &str) {
    let result = match parse_command(text) {
        Ok(ClientEvent::RequestData) => {
            state.send_snapshot_to(id).await;
            Ok(())
        }
        Ok(ClientEvent::SetPumpState(command)) => {
            state.apply_pump_command(&command).await.map(drop)
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        debug!(viewer = %id, error = %e, "command rejected");
        state
            .broadcaster
            .send_to(id, &ServerEvent::error(e.to_string()))
            .await;
    }
}

/// Decode a viewer text frame.
pub fn parse_command(text: &str) -> Result<ClientEvent, ObserverError> {
    Ok(serde_json::from_str(text)?)
}

/// Write whatever is already queued, then close the connection.
async fn close_after_flush(sink: &mut ViewerSink, rx: &mut mpsc::Receiver<Utf8Bytes>) {
    while let Ok(frame) = rx.try_recv() {
        if sink.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }
    let close = Message::Close(Some(CloseFrame {
        code: close_code::AWAY,
        reason: Utf8Bytes::from_static("server shutting down"),
    }));
    let _ = sink.send(close).await;
}
