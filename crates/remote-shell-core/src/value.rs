//! Typed command results and their default text rendering.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw value returned by a command before post-processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CommandValue {
    /// No output.
    Empty,
    /// Plain text.
    Text(String),
    /// Ordered lines of text.
    Lines(Vec<String>),
    /// Structured data.
    Json(Value),
}

impl CommandValue {
    /// Short name of the value kind, used in listings and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Text(_) => "text",
            Self::Lines(_) => "lines",
            Self::Json(_) => "json",
        }
    }

    /// Default text rendering.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(text) => text.clone(),
            Self::Lines(lines) => lines.join("\n"),
            Self::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
        }
    }
}

impl fmt::Display for CommandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<String> for CommandValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for CommandValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<String>> for CommandValue {
    fn from(lines: Vec<String>) -> Self {
        Self::Lines(lines)
    }
}

impl From<Value> for CommandValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<()> for CommandValue {
    fn from((): ()) -> Self {
        Self::Empty
    }
}
