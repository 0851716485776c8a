//! Core contracts for per-connection interactive shell sessions.
//!
//! This crate provides the fundamental building blocks:
//! - Collaborator traits (`LineReader`, `Dispatcher`) and transport hand-off types
//! - `SessionIoContext` / `SessionRuntimeContext` - thread-confined session state
//! - `CommandValue` - typed command results with default text rendering
//! - `InterruptFlag` and the interruptible `StreamLineReader`
//! - Channel-backed byte streams for message-based transports

pub mod channel;
pub mod context;
pub mod interrupt;
pub mod reader;
pub mod traits;
pub mod value;

pub use channel::{ChannelInput, ChannelOutput, InputSender, OutputReceiver, input_channel, output_channel};
pub use context::{
    CommandContext, ConnectionInfo, SessionIoContext, SessionRuntimeContext, TerminalAttributes,
};
pub use interrupt::InterruptFlag;
pub use reader::StreamLineReader;
pub use traits::{
    CommandError, ConnectionId, Dispatcher, Evaluation, ExitCallback, ExitStatus, IoHandles,
    LineReader, PromptError, ReadLine,
};
pub use value::CommandValue;
