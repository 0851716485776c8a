//! Per-session I/O and runtime contexts.
//!
//! Both contexts are owned by the session's execution thread. Nothing here
//! is looked up implicitly: command code receives them through a
//! [`CommandContext`] and must pass them on explicitly to any helper (or
//! thread) that needs interactive I/O.

use std::{
    collections::HashMap,
    fmt,
    io::{self, Write},
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ConnectionId, InterruptFlag,
    traits::{ExitCallback, ExitStatus, LineReader, PromptError, ReadLine},
};

/// Terminal attributes negotiated by the transport at connect time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalAttributes {
    /// Terminal type (`TERM`), e.g. `xterm-256color`.
    pub term: String,
    pub cols: u16,
    pub rows: u16,
}

impl TerminalAttributes {
    /// Create terminal attributes.
    #[must_use]
    pub fn new(term: impl Into<String>, cols: u16, rows: u16) -> Self {
        Self {
            term: term.into(),
            cols,
            rows,
        }
    }

    /// Whether ANSI styling should be emitted.
    #[must_use]
    pub fn supports_color(&self) -> bool {
        !self.term.is_empty() && self.term != "dumb"
    }
}

impl Default for TerminalAttributes {
    fn default() -> Self {
        Self::new("xterm", 80, 24)
    }
}

/// Connection-level information supplied alongside the raw I/O handles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub terminal: TerminalAttributes,
    /// Identity established by the authentication gate, if any.
    pub user: Option<String>,
}

/// Captured I/O of one connection.
pub struct SessionIoContext {
    reader: Box<dyn LineReader>,
    output: Box<dyn Write + Send>,
    exit: Option<ExitCallback>,
    interrupt: InterruptFlag,
}

impl SessionIoContext {
    /// Bundle a line reader bound to the connection's input with its
    /// output stream, exit callback and interrupt flag.
    #[must_use]
    pub fn new(
        reader: Box<dyn LineReader>,
        output: Box<dyn Write + Send>,
        exit: ExitCallback,
        interrupt: InterruptFlag,
    ) -> Self {
        Self {
            reader,
            output,
            exit: Some(exit),
            interrupt,
        }
    }

    /// Block on the next input line.
    ///
    /// # Errors
    /// Returns error on unrecoverable input failure.
    pub fn read_line(&mut self) -> io::Result<ReadLine> {
        if self.interrupt.is_interrupted() {
            return Ok(ReadLine::Interrupted);
        }
        self.reader.read_line()
    }

    /// Write text to the connection and flush it.
    ///
    /// # Errors
    /// Returns error if the output stream is closed.
    pub fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes())?;
        self.output.flush()
    }

    /// Write text followed by a CRLF line ending.
    ///
    /// # Errors
    /// Returns error if the output stream is closed.
    pub fn write_line(&mut self, text: &str) -> io::Result<()> {
        // Remote terminals expect CRLF; normalise bare LFs inside the text too.
        let normalized = text.replace("\r\n", "\n").replace('\n', "\r\n");
        self.output.write_all(normalized.as_bytes())?;
        self.output.write_all(b"\r\n")?;
        self.output.flush()
    }

    /// Whether the session has been asked to stop.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.is_interrupted()
    }

    /// Report the session's end to the transport. Only the first call has
    /// an effect.
    pub fn signal_exit(&mut self, status: ExitStatus) {
        if let Some(exit) = self.exit.take() {
            exit(status);
        }
    }
}

impl fmt::Debug for SessionIoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionIoContext")
            .field("interrupted", &self.interrupt.is_interrupted())
            .field("exit_pending", &self.exit.is_some())
            .finish_non_exhaustive()
    }
}

/// Runtime state of one session: terminal attributes, identity and
/// arbitrary command-owned metadata.
#[derive(Debug, Clone)]
pub struct SessionRuntimeContext {
    connection: ConnectionId,
    info: ConnectionInfo,
    metadata: HashMap<String, Value>,
}

impl SessionRuntimeContext {
    /// Create the runtime context for a connection.
    #[must_use]
    pub fn new(connection: ConnectionId, info: ConnectionInfo) -> Self {
        Self {
            connection,
            info,
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn connection(&self) -> ConnectionId {
        self.connection
    }

    #[must_use]
    pub const fn terminal(&self) -> &TerminalAttributes {
        &self.info.terminal
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.info.user.as_deref()
    }

    /// Get a metadata value by key.
    #[must_use]
    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Set a metadata value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Ask the user for a line of input.
    ///
    /// # Errors
    /// Returns error if the session is interrupted, input ends, or I/O fails.
    pub fn read(&self, io: &mut SessionIoContext, message: &str) -> Result<String, PromptError> {
        io.write_str(message)?;
        if !message.ends_with(' ') {
            io.write_str(" ")?;
        }
        match io.read_line()? {
            ReadLine::Line(line) => Ok(line),
            ReadLine::Eof => Err(PromptError::EndOfStream),
            ReadLine::Interrupted => Err(PromptError::Interrupted),
        }
    }

    /// Ask the user a yes/no question. Only `y` or `yes` (any case) confirm.
    ///
    /// # Errors
    /// Returns error if the session is interrupted, input ends, or I/O fails.
    pub fn confirm(&self, io: &mut SessionIoContext, message: &str) -> Result<bool, PromptError> {
        let answer = self.read(io, &format!("{message} (y/N)"))?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}

/// What a command sees of the session it runs in.
#[derive(Debug)]
pub struct CommandContext<'a> {
    pub io: &'a mut SessionIoContext,
    pub runtime: &'a mut SessionRuntimeContext,
}

impl<'a> CommandContext<'a> {
    #[must_use]
    pub fn new(io: &'a mut SessionIoContext, runtime: &'a mut SessionRuntimeContext) -> Self {
        Self { io, runtime }
    }

    /// See [`SessionRuntimeContext::read`].
    ///
    /// # Errors
    /// Returns error if the session is interrupted, input ends, or I/O fails.
    pub fn read(&mut self, message: &str) -> Result<String, PromptError> {
        self.runtime.read(self.io, message)
    }

    /// See [`SessionRuntimeContext::confirm`].
    ///
    /// # Errors
    /// Returns error if the session is interrupted, input ends, or I/O fails.
    pub fn confirm(&mut self, message: &str) -> Result<bool, PromptError> {
        self.runtime.confirm(self.io, message)
    }

    /// Print a line immediately, ahead of the command's result.
    ///
    /// # Errors
    /// Returns error if the output stream is closed.
    pub fn print(&mut self, text: &str) -> io::Result<()> {
        self.io.write_line(text)
    }

    #[must_use]
    pub fn terminal(&self) -> &TerminalAttributes {
        self.runtime.terminal()
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.runtime.user()
    }

    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.io.is_interrupted()
    }
}
