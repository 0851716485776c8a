//! Transport configuration.

use std::time::Duration;

use remote_shell_core::TerminalAttributes;
use serde::{Deserialize, Serialize};

/// Settings shared by every transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// How often a blocked read wakes up to check for teardown.
    pub input_poll_interval_ms: u64,
    /// How long a WebSocket client has to send its `hello` frame.
    pub hello_timeout_ms: u64,
    /// Terminal attributes used when the client does not report any.
    pub default_terminal: TerminalAttributes,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            input_poll_interval_ms: 100,
            hello_timeout_ms: 500,
            default_terminal: TerminalAttributes::default(),
        }
    }
}

impl TransportConfig {
    #[must_use]
    pub const fn input_poll_interval(&self) -> Duration {
        Duration::from_millis(self.input_poll_interval_ms)
    }

    #[must_use]
    pub const fn hello_timeout(&self) -> Duration {
        Duration::from_millis(self.hello_timeout_ms)
    }
}
