//! Thread-per-connection session management for remote shells.
//!
//! Provides:
//! - `SessionManager` - accept/close connections, one session thread each
//! - The read-evaluate-render loop with pipe-style post-processing
//! - Built-in `exit`, `quit` and `postprocessors` commands
//! - `SessionConfig`

mod builtins;
pub mod config;
pub mod manager;
pub mod runner;
mod style;

pub use config::SessionConfig;
pub use manager::{ManagerError, SessionManager, SessionSummary};
pub use runner::{LineReaderFactory, ShellError, stream_line_reader};
