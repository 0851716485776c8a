//! Session manager: one execution thread per live connection.

use std::{
    collections::HashMap,
    io,
    sync::{Arc, PoisonError, RwLock, RwLockWriteGuard},
    thread::{self, JoinHandle},
    time::Instant,
};

use remote_shell_core::{
    ConnectionId, ConnectionInfo, Dispatcher, InterruptFlag, IoHandles, SessionIoContext,
    SessionRuntimeContext,
};
use remote_shell_postprocess::{PipelineInvoker, TransformerRegistry};

use crate::{
    SessionConfig,
    runner::{self, LineReaderFactory, Shell, stream_line_reader},
};

/// Session manager error.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    #[error("Session already active for connection {0}")]
    AlreadyActive(ConnectionId),
    #[error("Failed to start session thread: {0}")]
    SessionStart(#[source] io::Error),
}

/// Live session state.
struct ActiveSession {
    interrupt: InterruptFlag,
    started_at: Instant,
    // Dropping the handle detaches the thread; it unwinds on its own.
    _thread: JoinHandle<()>,
}

/// Snapshot of one live session, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub connection: ConnectionId,
    pub started_at: Instant,
}

/// Session manager for per-connection shell sessions.
///
/// The live-session table is the only state shared between threads; each
/// session's I/O and runtime contexts are moved into its own thread.
pub struct SessionManager<D>
where
    D: Dispatcher,
{
    shell: Arc<Shell<D>>,
    sessions: RwLock<HashMap<ConnectionId, ActiveSession>>,
}

impl<D> SessionManager<D>
where
    D: Dispatcher + 'static,
{
    /// Create a new session manager using the built-in line reader.
    #[must_use]
    pub fn new(dispatcher: D, registry: Arc<TransformerRegistry>, config: SessionConfig) -> Self {
        Self::with_line_reader(dispatcher, registry, config, stream_line_reader())
    }

    /// Create a session manager with a custom line reader.
    #[must_use]
    pub fn with_line_reader(
        dispatcher: D,
        registry: Arc<TransformerRegistry>,
        config: SessionConfig,
        reader_factory: LineReaderFactory,
    ) -> Self {
        Self {
            shell: Arc::new(Shell {
                dispatcher,
                invoker: PipelineInvoker::new(registry),
                config,
                reader_factory,
            }),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session for a newly accepted connection.
    ///
    /// Spawns exactly one thread that owns the connection's I/O and
    /// runtime contexts. Nothing is registered if the thread cannot start.
    ///
    /// # Errors
    /// Returns error if the connection already has a session or the thread
    /// cannot be spawned.
    pub fn on_connection_accepted(
        &self,
        connection: ConnectionId,
        handles: IoHandles,
        info: ConnectionInfo,
    ) -> Result<(), ManagerError> {
        let mut sessions = self.write_sessions();
        if sessions.contains_key(&connection) {
            return Err(ManagerError::AlreadyActive(connection));
        }

        let interrupt = InterruptFlag::new();
        let IoHandles {
            input,
            output,
            exit,
        } = handles;
        let reader = (self.shell.reader_factory)(input, interrupt.clone());
        let io = SessionIoContext::new(reader, output, exit, interrupt.clone());
        let runtime = SessionRuntimeContext::new(connection, info);

        let shell = Arc::clone(&self.shell);
        let handle = thread::Builder::new()
            .name(format!("{}-{connection}", self.shell.config.thread_name_prefix))
            .spawn(move || runner::run_session(&shell, io, runtime))
            .map_err(|e| {
                tracing::error!(%connection, error = %e, "failed to spawn session thread");
                ManagerError::SessionStart(e)
            })?;

        sessions.insert(
            connection,
            ActiveSession {
                interrupt,
                started_at: Instant::now(),
                _thread: handle,
            },
        );
        let active = sessions.len();
        drop(sessions);

        tracing::info!(%connection, active, "session started");
        Ok(())
    }

    /// Tear down the session of a closed connection.
    ///
    /// Removes the connection from the table and interrupts its thread.
    /// Unknown or already closed connections are ignored. Returns whether
    /// a session was found.
    pub fn on_connection_closed(&self, connection: ConnectionId) -> bool {
        let mut sessions = self.write_sessions();
        let removed = sessions.remove(&connection);
        let active = sessions.len();
        drop(sessions);

        match removed {
            Some(session) => {
                session.interrupt.interrupt();
                tracing::info!(%connection, active, "session destroyed");
                true
            }
            None => {
                tracing::debug!(%connection, active, "no session to destroy");
                false
            }
        }
    }

    /// Interrupt every live session. Returns how many were interrupted.
    pub fn shutdown(&self) -> usize {
        let drained: Vec<_> = self.write_sessions().drain().collect();
        for (connection, session) in &drained {
            session.interrupt.interrupt();
            tracing::debug!(%connection, "session interrupted by shutdown");
        }
        tracing::info!(count = drained.len(), "all sessions interrupted");
        drained.len()
    }

    /// Whether a connection currently has a session.
    #[must_use]
    pub fn is_active(&self, connection: ConnectionId) -> bool {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&connection)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Snapshot of live sessions, oldest first.
    #[must_use]
    pub fn sessions(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(connection, session)| SessionSummary {
                connection: *connection,
                started_at: session.started_at,
            })
            .collect();
        summaries.sort_by_key(|s| s.started_at);
        summaries
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, HashMap<ConnectionId, ActiveSession>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
