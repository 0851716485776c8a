//! Blocking TCP transport: raw line-oriented sockets, one session each.

use std::{
    net::{Shutdown, TcpListener, TcpStream},
    sync::Arc,
};

use remote_shell_core::{ConnectionId, ConnectionInfo, Dispatcher, ExitStatus, IoHandles};
use remote_shell_session::SessionManager;

use crate::{TransportConfig, TransportError};

/// Hands accepted sockets to a [`SessionManager`].
pub struct TcpTransport<D>
where
    D: Dispatcher,
{
    manager: Arc<SessionManager<D>>,
    config: TransportConfig,
}

impl<D> TcpTransport<D>
where
    D: Dispatcher + 'static,
{
    #[must_use]
    pub const fn new(manager: Arc<SessionManager<D>>, config: TransportConfig) -> Self {
        Self { manager, config }
    }

    #[must_use]
    pub const fn manager(&self) -> &Arc<SessionManager<D>> {
        &self.manager
    }

    /// Accept connections until the listener fails. Blocks the calling
    /// thread.
    ///
    /// # Errors
    /// Returns error if the listener address cannot be read.
    pub fn serve(&self, listener: &TcpListener) -> Result<(), TransportError> {
        let addr = listener.local_addr()?;
        tracing::info!(%addr, "tcp transport listening");

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = self.accept(stream) {
                        tracing::warn!(error = %e, "failed to start tcp session");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to accept tcp connection"),
            }
        }
        Ok(())
    }

    /// Start a session on an accepted socket.
    ///
    /// The session reads and writes through clones of the socket. When it
    /// ends on its own the socket is shut down and the close is reported
    /// back to the manager.
    ///
    /// # Errors
    /// Returns error if the socket cannot be configured or the session
    /// cannot start.
    pub fn accept(&self, stream: TcpStream) -> Result<ConnectionId, TransportError> {
        let connection = ConnectionId::new();
        let peer = stream.peer_addr()?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.config.input_poll_interval()))?;
        let input = stream.try_clone()?;
        let output = stream.try_clone()?;

        let manager = Arc::downgrade(&self.manager);
        let exit = move |status: ExitStatus| {
            tracing::debug!(%connection, code = status.code, "closing tcp connection");
            let _ = stream.shutdown(Shutdown::Both);
            if let Some(manager) = manager.upgrade() {
                manager.on_connection_closed(connection);
            }
        };

        let info = ConnectionInfo {
            terminal: self.config.default_terminal.clone(),
            user: None,
        };
        self.manager
            .on_connection_accepted(connection, IoHandles::new(input, output, exit), info)?;
        tracing::info!(%connection, %peer, "tcp connection accepted");
        Ok(connection)
    }
}
