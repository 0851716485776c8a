//! WebSocket transport for web terminals.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt, stream::SplitStream};
use remote_shell_core::{
    ConnectionId, ConnectionInfo, Dispatcher, ExitStatus, InputSender, IoHandles, input_channel,
    output_channel,
};
use remote_shell_session::SessionManager;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use crate::{
    TransportConfig,
    protocol::{ClientMessage, ServerMessage},
};

/// WebSocket handler state.
pub struct WsState<D>
where
    D: Dispatcher,
{
    pub manager: Arc<SessionManager<D>>,
    pub config: Arc<TransportConfig>,
}

impl<D> Clone for WsState<D>
where
    D: Dispatcher,
{
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            config: Arc::clone(&self.config),
        }
    }
}

impl<D> WsState<D>
where
    D: Dispatcher,
{
    /// Create new WebSocket state.
    #[must_use]
    pub fn new(manager: Arc<SessionManager<D>>, config: TransportConfig) -> Self {
        Self {
            manager,
            config: Arc::new(config),
        }
    }
}

/// WebSocket upgrade handler.
///
/// Use this as an Axum route handler.
pub async fn ws_handler<D>(
    ws: WebSocketUpgrade,
    State(state): State<WsState<D>>,
) -> impl IntoResponse
where
    D: Dispatcher + 'static,
{
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One decoded event from the client side of the socket.
#[derive(Debug, PartialEq, Eq)]
enum Incoming {
    Message(ClientMessage),
    /// Binary frames carry raw terminal input.
    RawInput(Vec<u8>),
    Closed,
}

/// How the bridge loop ended.
enum Outcome {
    ClientClosed,
    SessionEnded(Option<i32>),
}

async fn handle_socket<D>(socket: WebSocket, state: WsState<D>)
where
    D: Dispatcher + 'static,
{
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection = ConnectionId::new();

    // Channel for sending messages to the client
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("Failed to serialize message: {e}");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    // A leading hello describes the terminal; anything else is replayed
    // once the session is running.
    let defaults = || ConnectionInfo {
        terminal: state.config.default_terminal.clone(),
        user: None,
    };
    let first = tokio::time::timeout(
        state.config.hello_timeout(),
        next_incoming(&mut ws_receiver, &tx),
    )
    .await;
    let (info, pending) = match first {
        Ok(Incoming::Closed) => {
            drop(tx);
            let _ = send_task.await;
            return;
        }
        Ok(Incoming::Message(msg)) => {
            match msg.into_connection_info(&state.config.default_terminal) {
                Ok(info) => (info, None),
                Err(msg) => (defaults(), Some(Incoming::Message(msg))),
            }
        }
        Ok(other) => (defaults(), Some(other)),
        Err(_) => (defaults(), None),
    };

    let (input_tx, input) = input_channel(state.config.input_poll_interval());
    let (output, mut output_rx) = output_channel();
    let (exit_tx, mut exit_rx) = oneshot::channel::<ExitStatus>();
    let handles = IoHandles::new(input, output, move |status| {
        let _ = exit_tx.send(status);
    });

    if let Err(e) = state
        .manager
        .on_connection_accepted(connection, handles, info)
    {
        tracing::error!(%connection, error = %e, "failed to start session");
        let _ = tx.send(ServerMessage::Error {
            message: e.to_string(),
        });
        drop(tx);
        let _ = send_task.await;
        return;
    }
    let _ = tx.send(ServerMessage::session_started(connection));
    tracing::info!(%connection, "websocket session started");

    let mut open =
        pending.is_none_or(|incoming| handle_incoming(connection, incoming, &input_tx, &tx));

    let outcome = loop {
        if !open {
            break Outcome::ClientClosed;
        }
        tokio::select! {
            chunk = output_rx.recv() => match chunk {
                Some(bytes) => {
                    let _ = tx.send(ServerMessage::output(&bytes));
                }
                None => break Outcome::SessionEnded(exit_rx.try_recv().ok().map(|s| s.code)),
            },
            status = &mut exit_rx => {
                while let Ok(bytes) = output_rx.try_recv() {
                    let _ = tx.send(ServerMessage::output(&bytes));
                }
                break Outcome::SessionEnded(status.ok().map(|s| s.code));
            }
            incoming = next_incoming(&mut ws_receiver, &tx) => {
                open = handle_incoming(connection, incoming, &input_tx, &tx);
            }
        }
    };

    match outcome {
        Outcome::ClientClosed => {
            tracing::info!(%connection, "websocket disconnected");
        }
        Outcome::SessionEnded(code) => {
            tracing::info!(%connection, ?code, "session ended, closing websocket");
            let _ = tx.send(ServerMessage::session_ended(connection, code));
        }
    }
    state.manager.on_connection_closed(connection);

    // Flush queued frames, then close the socket.
    drop(tx);
    let _ = send_task.await;
}

/// Wait for the next meaningful client event.
///
/// Malformed text frames are answered with an error and skipped.
async fn next_incoming(
    receiver: &mut SplitStream<WebSocket>,
    tx: &mpsc::UnboundedSender<ServerMessage>,
) -> Incoming {
    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str(text.as_str()) {
                Ok(m) => return Incoming::Message(m),
                Err(e) => {
                    tracing::warn!("Invalid client message: {e}");
                    let _ = tx.send(ServerMessage::Error {
                        message: format!("Invalid message: {e}"),
                    });
                }
            },
            Ok(Message::Binary(data)) => return Incoming::RawInput(data.to_vec()),
            Ok(Message::Close(_)) => return Incoming::Closed,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("WebSocket error: {e}");
                return Incoming::Closed;
            }
        }
    }
    Incoming::Closed
}

/// Apply one client event to the running session. Returns `false` once the
/// client is gone.
fn handle_incoming(
    connection: ConnectionId,
    incoming: Incoming,
    input: &InputSender,
    tx: &mpsc::UnboundedSender<ServerMessage>,
) -> bool {
    let msg = match incoming {
        Incoming::Closed => return false,
        Incoming::RawInput(bytes) => {
            forward_input(connection, input, bytes);
            return true;
        }
        Incoming::Message(msg) => msg,
    };

    match &msg {
        ClientMessage::Input { .. } => match msg.decode_input() {
            Some(bytes) => forward_input(connection, input, bytes),
            None => {
                let _ = tx.send(ServerMessage::Error {
                    message: "Invalid input encoding".to_string(),
                });
            }
        },
        ClientMessage::Resize { cols, rows } => {
            tracing::debug!(%connection, cols, rows, "resize after session start ignored");
        }
        ClientMessage::Hello { .. } => {
            tracing::debug!(%connection, "late hello ignored");
        }
        ClientMessage::Ping => {
            let _ = tx.send(ServerMessage::Pong);
        }
    }
    true
}

fn forward_input(connection: ConnectionId, input: &InputSender, bytes: Vec<u8>) {
    // Fails only once the session thread is gone; its output channel
    // closing ends the bridge.
    if input.send(bytes).is_err() {
        tracing::trace!(%connection, "input dropped after session end");
    }
}

/// Create WebSocket router serving `/ws`.
///
/// # Example
/// ```ignore
/// let app = Router::new()
///     .merge(create_ws_router(manager, TransportConfig::default()));
/// ```
#[must_use]
pub fn create_ws_router<D>(manager: Arc<SessionManager<D>>, config: TransportConfig) -> Router
where
    D: Dispatcher + 'static,
{
    Router::new()
        .route("/ws", get(ws_handler::<D>))
        .layer(TraceLayer::new_for_http())
        .with_state(WsState::new(manager, config))
}

#[cfg(test)]
mod tests {
    use std::{io::Read, time::Duration};

    use remote_shell_core::ChannelInput;

    use super::*;

    fn setup() -> (
        InputSender,
        ChannelInput,
        mpsc::UnboundedSender<ServerMessage>,
        mpsc::UnboundedReceiver<ServerMessage>,
    ) {
        let (input_tx, input) = input_channel(Duration::from_millis(10));
        let (tx, rx) = mpsc::unbounded_channel();
        (input_tx, input, tx, rx)
    }

    #[test]
    fn test_input_frames_reach_session() {
        let (input_tx, mut input, tx, mut rx) = setup();
        let connection = ConnectionId::new();

        assert!(handle_incoming(
            connection,
            Incoming::Message(ClientMessage::input(b"echo hi\r")),
            &input_tx,
            &tx
        ));
        assert!(handle_incoming(
            connection,
            Incoming::RawInput(b"ls\r".to_vec()),
            &input_tx,
            &tx
        ));

        let mut buf = [0u8; 32];
        let n = input.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"echo hi\r");
        let n = input.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"ls\r");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_ping_and_bad_input() {
        let (input_tx, _input, tx, mut rx) = setup();
        let connection = ConnectionId::new();

        handle_incoming(
            connection,
            Incoming::Message(ClientMessage::Ping),
            &input_tx,
            &tx,
        );
        assert_eq!(tokio_test::block_on(rx.recv()), Some(ServerMessage::Pong));

        handle_incoming(
            connection,
            Incoming::Message(ClientMessage::Input {
                data: "%%%".to_string(),
            }),
            &input_tx,
            &tx,
        );
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::Error { .. }));
    }

    #[test]
    fn test_resize_ignored_and_close_stops() {
        let (input_tx, _input, tx, mut rx) = setup();
        let connection = ConnectionId::new();

        assert!(handle_incoming(
            connection,
            Incoming::Message(ClientMessage::Resize { cols: 100, rows: 30 }),
            &input_tx,
            &tx
        ));
        assert!(rx.try_recv().is_err());
        assert!(!handle_incoming(connection, Incoming::Closed, &input_tx, &tx));
    }
}
