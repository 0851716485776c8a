//! Transports that carry remote shell sessions.
//!
//! Provides:
//! - Wire protocol (JSON + base64)
//! - WebSocket transport (feature: websocket)
//! - Blocking TCP transport (feature: tcp)

pub mod config;
pub mod protocol;

#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "tcp")]
pub mod tcp;

use remote_shell_session::ManagerError;
use thiserror::Error;

pub use config::TransportConfig;
pub use protocol::{ClientMessage, ServerMessage};

/// Transport error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Session error: {0}")]
    Session(#[from] ManagerError),
}
