//! Wire protocol for WebSocket clients.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use remote_shell_core::{ConnectionId, ConnectionInfo, TerminalAttributes};
use serde::{Deserialize, Serialize};

/// Message from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Terminal description, honoured only as the first frame.
    Hello {
        cols: u16,
        rows: u16,
        #[serde(default)]
        term: Option<String>,
        #[serde(default)]
        user: Option<String>,
    },
    /// Terminal input data (base64 encoded).
    Input { data: String },
    /// Terminal resized.
    Resize { cols: u16, rows: u16 },
    /// Ping for keepalive.
    Ping,
}

impl ClientMessage {
    /// Create an input message from raw bytes.
    #[must_use]
    pub fn input(data: &[u8]) -> Self {
        Self::Input {
            data: BASE64.encode(data),
        }
    }

    /// Decode input data from base64.
    #[must_use]
    pub fn decode_input(&self) -> Option<Vec<u8>> {
        if let Self::Input { data } = self {
            BASE64.decode(data).ok()
        } else {
            None
        }
    }

    /// Connection details announced by a `hello`, on top of `defaults`.
    ///
    /// # Errors
    /// Returns the message unchanged if it is not a `hello`.
    pub fn into_connection_info(self, defaults: &TerminalAttributes) -> Result<ConnectionInfo, Self> {
        match self {
            Self::Hello {
                cols,
                rows,
                term,
                user,
            } => Ok(ConnectionInfo {
                terminal: TerminalAttributes::new(
                    term.unwrap_or_else(|| defaults.term.clone()),
                    cols,
                    rows,
                ),
                user,
            }),
            other => Err(other),
        }
    }
}

/// Message from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Terminal output data (base64 encoded).
    Output { data: String },
    /// Session started.
    SessionStarted { session_id: String },
    /// Session ended; `code` is absent when it was torn down.
    SessionEnded {
        session_id: String,
        code: Option<i32>,
    },
    /// Error message.
    Error { message: String },
    /// Pong response.
    Pong,
}

impl ServerMessage {
    /// Create an output message from raw bytes.
    #[must_use]
    pub fn output(data: &[u8]) -> Self {
        Self::Output {
            data: BASE64.encode(data),
        }
    }

    /// Decode output data from base64.
    #[must_use]
    pub fn decode_output(&self) -> Option<Vec<u8>> {
        if let Self::Output { data } = self {
            BASE64.decode(data).ok()
        } else {
            None
        }
    }

    #[must_use]
    pub fn session_started(connection: ConnectionId) -> Self {
        Self::SessionStarted {
            session_id: connection.to_string(),
        }
    }

    #[must_use]
    pub fn session_ended(connection: ConnectionId, code: Option<i32>) -> Self {
        Self::SessionEnded {
            session_id: connection.to_string(),
            code,
        }
    }
}
