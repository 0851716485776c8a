//! Collaborator contracts: transport hand-off, line reading and dispatch.

use std::{
    fmt,
    io::{self, Read, Write},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{CommandContext, CommandValue};

/// Opaque connection handle.
///
/// Every accepted connection gets a freshly generated id, so two handles
/// compare equal only when they name the same connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Allocate a new, unique connection id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Status reported to the transport when a session ends on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitStatus {
    pub code: i32,
}

impl ExitStatus {
    /// Normal termination.
    pub const SUCCESS: Self = Self { code: 0 };
    /// Session ended because its output could no longer be written.
    pub const OUTPUT_CLOSED: Self = Self { code: 1 };
}

/// Callback the session uses to tell the transport it is done.
pub type ExitCallback = Box<dyn FnOnce(ExitStatus) + Send>;

/// Raw I/O handles delivered by the transport for one connection.
///
/// Input streams should return from `read` periodically (`WouldBlock` or
/// `TimedOut`) so a blocked session can observe an interrupt.
pub struct IoHandles {
    pub input: Box<dyn Read + Send>,
    pub output: Box<dyn Write + Send>,
    pub exit: ExitCallback,
}

impl IoHandles {
    /// Bundle the three handles.
    pub fn new<R, W, F>(input: R, output: W, exit: F) -> Self
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
        F: FnOnce(ExitStatus) + Send + 'static,
    {
        Self {
            input: Box::new(input),
            output: Box::new(output),
            exit: Box::new(exit),
        }
    }
}

impl fmt::Debug for IoHandles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoHandles").finish_non_exhaustive()
    }
}

/// Result of one blocking line read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    /// A complete line, without its terminator.
    Line(String),
    /// The input stream is exhausted.
    Eof,
    /// The session was interrupted while waiting.
    Interrupted,
}

/// Blocking, interruptible line source.
pub trait LineReader: Send {
    /// Block until a line is available, the stream ends, or the session
    /// is interrupted.
    ///
    /// # Errors
    /// Returns error on unrecoverable I/O failure.
    fn read_line(&mut self) -> io::Result<ReadLine>;
}

/// Outcome of evaluating one command.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The command produced a value to render.
    Value(CommandValue),
    /// The command asked for the session to end.
    Exit,
}

impl From<CommandValue> for Evaluation {
    fn from(value: CommandValue) -> Self {
        Self::Value(value)
    }
}

/// Error raised while evaluating a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Error raised by an interactive prompt.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Session interrupted")]
    Interrupted,
    #[error("Input closed")]
    EndOfStream,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PromptError {
    /// Whether the prompt failed because the session is going away.
    #[must_use]
    pub const fn is_teardown(&self) -> bool {
        matches!(self, Self::Interrupted | Self::EndOfStream)
    }
}

/// Command dispatch collaborator.
///
/// Shared by every session thread; per-session state belongs in the
/// [`CommandContext`] handed to each call.
pub trait Dispatcher: Send + Sync {
    /// Evaluate one command line (already stripped of its pipe segments).
    ///
    /// # Errors
    /// Returns error if the command is unknown or fails.
    fn evaluate(
        &self,
        command: &str,
        ctx: &mut CommandContext<'_>,
    ) -> Result<Evaluation, CommandError>;
}

impl<F> Dispatcher for F
where
    F: Fn(&str, &mut CommandContext<'_>) -> Result<Evaluation, CommandError> + Send + Sync,
{
    fn evaluate(
        &self,
        command: &str,
        ctx: &mut CommandContext<'_>,
    ) -> Result<Evaluation, CommandError> {
        self(command, ctx)
    }
}
