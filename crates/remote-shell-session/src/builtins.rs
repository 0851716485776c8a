//! Commands answered by the shell itself, ahead of the dispatcher.

use std::fmt::Write as _;

use remote_shell_core::{CommandValue, Evaluation, TerminalAttributes};
use remote_shell_postprocess::TransformerRegistry;

use crate::style;

/// Evaluate `command` if it names a built-in.
pub(crate) fn evaluate(
    command: &str,
    registry: &TransformerRegistry,
    terminal: &TerminalAttributes,
) -> Option<Evaluation> {
    match command.split_whitespace().next()? {
        "exit" | "quit" => Some(Evaluation::Exit),
        "postprocessors" => Some(CommandValue::Text(list_postprocessors(registry, terminal)).into()),
        _ => None,
    }
}

/// Render the available transformers, sorted by name.
pub(crate) fn list_postprocessors(
    registry: &TransformerRegistry,
    terminal: &TerminalAttributes,
) -> String {
    let color = terminal.supports_color();
    let mut out = style::bold("Available Post-Processors", color);
    out.push('\n');
    for info in registry.list() {
        let _ = write!(
            out,
            "\n\t{} {} - {}",
            style::bold(&format!("{}:", info.name), color),
            info.input_kind,
            info.description
        );
    }
    out
}
