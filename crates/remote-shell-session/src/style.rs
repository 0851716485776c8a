//! ANSI styling, emitted only for colour-capable terminals.

const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

pub(crate) fn bold(text: &str, color: bool) -> String {
    paint(BOLD, text, color)
}

pub(crate) fn red(text: &str, color: bool) -> String {
    paint(RED, text, color)
}

fn paint(code: &str, text: &str, color: bool) -> String {
    if color {
        format!("{code}{text}{RESET}")
    } else {
        text.to_string()
    }
}
