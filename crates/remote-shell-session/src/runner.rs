//! Read-evaluate-render loop executed on each session thread.

use std::{
    any::Any,
    io::{self, Read},
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use remote_shell_core::{
    CommandContext, CommandError, Dispatcher, Evaluation, ExitStatus, InterruptFlag, LineReader,
    PromptError, ReadLine, SessionIoContext, SessionRuntimeContext, StreamLineReader,
};
use remote_shell_postprocess::{PipelineError, PipelineInvoker, split_pipeline};
use thiserror::Error;

use crate::{SessionConfig, builtins, style};

/// Builds the line reader bound to a connection's input stream.
pub type LineReaderFactory =
    Arc<dyn Fn(Box<dyn Read + Send>, InterruptFlag) -> Box<dyn LineReader> + Send + Sync>;

/// Factory producing the built-in [`StreamLineReader`].
#[must_use]
pub fn stream_line_reader() -> LineReaderFactory {
    Arc::new(
        |input: Box<dyn Read + Send>, interrupt: InterruptFlag| -> Box<dyn LineReader> {
            Box::new(StreamLineReader::new(input, interrupt))
        },
    )
}

/// Error shown to the user in place of a command's output.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Command panicked: {0}")]
    Panicked(String),
}

/// Collaborators shared read-only by every session thread.
pub(crate) struct Shell<D> {
    pub(crate) dispatcher: D,
    pub(crate) invoker: PipelineInvoker,
    pub(crate) config: SessionConfig,
    pub(crate) reader_factory: LineReaderFactory,
}

/// Why a session loop stopped.
#[derive(Debug)]
enum SessionEnd {
    EndOfInput,
    ExitRequested,
    Interrupted,
    OutputClosed(io::Error),
    InputFailed(io::Error),
}

/// Result of one successfully evaluated line.
enum Step {
    Render(String),
    Exit,
}

/// Session thread entry point.
pub(crate) fn run_session<D: Dispatcher>(
    shell: &Shell<D>,
    mut io: SessionIoContext,
    mut runtime: SessionRuntimeContext,
) {
    let span = tracing::info_span!("session", connection = %runtime.connection());
    let _entered = span.enter();
    tracing::debug!(user = ?runtime.user(), term = %runtime.terminal().term, "session thread started");

    match session_loop(shell, &mut io, &mut runtime) {
        SessionEnd::Interrupted => {
            tracing::debug!("session interrupted");
        }
        SessionEnd::EndOfInput => {
            tracing::debug!("input closed");
            io.signal_exit(ExitStatus::SUCCESS);
        }
        SessionEnd::ExitRequested => {
            tracing::debug!("exit requested");
            let _ = io.write_line("Bye.");
            io.signal_exit(ExitStatus::SUCCESS);
        }
        SessionEnd::OutputClosed(e) => {
            tracing::debug!(error = %e, "output closed");
            io.signal_exit(ExitStatus::OUTPUT_CLOSED);
        }
        SessionEnd::InputFailed(e) => {
            tracing::warn!(error = %e, "input failed");
            io.signal_exit(ExitStatus::OUTPUT_CLOSED);
        }
    }
}

fn session_loop<D: Dispatcher>(
    shell: &Shell<D>,
    io: &mut SessionIoContext,
    runtime: &mut SessionRuntimeContext,
) -> SessionEnd {
    if let Some(banner) = shell.config.effective_banner() {
        if let Err(e) = io.write_line(banner) {
            return SessionEnd::OutputClosed(e);
        }
    }

    loop {
        if let Err(e) = io.write_str(&shell.config.prompt) {
            return SessionEnd::OutputClosed(e);
        }
        let line = match io.read_line() {
            Ok(ReadLine::Line(line)) => line,
            Ok(ReadLine::Eof) => return SessionEnd::EndOfInput,
            Ok(ReadLine::Interrupted) => return SessionEnd::Interrupted,
            Err(e) => return SessionEnd::InputFailed(e),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let written = match execute(shell, line, io, runtime) {
            Ok(Step::Exit) => return SessionEnd::ExitRequested,
            Ok(Step::Render(text)) if text.is_empty() => Ok(()),
            Ok(Step::Render(text)) => io.write_line(&text),
            Err(ShellError::Command(CommandError::Prompt(e))) if e.is_teardown() => {
                return match e {
                    PromptError::Interrupted => SessionEnd::Interrupted,
                    _ => SessionEnd::EndOfInput,
                };
            }
            Err(e) => {
                tracing::warn!(command = line, error = %e, "command failed");
                let color = runtime.terminal().supports_color();
                io.write_line(&style::red(&format!("Error: {e}"), color))
            }
        };
        if let Err(e) = written {
            return SessionEnd::OutputClosed(e);
        }
    }
}

/// Evaluate one line and render its result through the pipeline.
///
/// A panic in the command or in any post-processor becomes
/// [`ShellError::Panicked`].
fn execute<D: Dispatcher>(
    shell: &Shell<D>,
    line: &str,
    io: &mut SessionIoContext,
    runtime: &mut SessionRuntimeContext,
) -> Result<Step, ShellError> {
    panic::catch_unwind(AssertUnwindSafe(|| evaluate_and_render(shell, line, io, runtime)))
        .map_err(|payload| ShellError::Panicked(panic_message(payload.as_ref())))?
}

fn evaluate_and_render<D: Dispatcher>(
    shell: &Shell<D>,
    line: &str,
    io: &mut SessionIoContext,
    runtime: &mut SessionRuntimeContext,
) -> Result<Step, ShellError> {
    let (command, spec) = split_pipeline(line)?;
    if command.is_empty() {
        return Err(PipelineError::Syntax("missing command before '|'".to_string()).into());
    }

    let evaluation = match builtins::evaluate(&command, shell.invoker.registry(), runtime.terminal()) {
        Some(evaluation) => evaluation,
        None => {
            let mut ctx = CommandContext::new(io, runtime);
            shell.dispatcher.evaluate(&command, &mut ctx)?
        }
    };

    match evaluation {
        Evaluation::Exit => Ok(Step::Exit),
        Evaluation::Value(value) => {
            tracing::trace!(kind = value.kind(), stages = spec.stages().len(), "rendering result");
            Ok(Step::Render(shell.invoker.apply(&value, &spec)?))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
