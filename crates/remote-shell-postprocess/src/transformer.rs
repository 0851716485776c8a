//! Output transformer contract.

use std::{fmt, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of text a transformer expects as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Any text.
    Text,
    /// Text holding a JSON document.
    Json,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Error raised by a transformer while rewriting output.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A named, stateless output rewriter.
///
/// Implementations must return the input unchanged when `args` carries no
/// meaningful argument (see [`effective_args`]).
pub trait OutputTransformer: Send + Sync {
    /// Unique, case-sensitive name used after the pipe delimiter.
    fn name(&self) -> &'static str;

    /// One-line description for listings.
    fn description(&self) -> &'static str;

    /// Kind of input this transformer understands.
    fn input_kind(&self) -> InputKind {
        InputKind::Text
    }

    /// Rewrite `input` according to `args`.
    ///
    /// # Errors
    /// Returns error if the arguments or input are unusable.
    fn apply(&self, input: &str, args: &[String]) -> Result<String, TransformError>;
}

/// Arguments with empty strings removed.
///
/// An empty result means the transformer must act as identity.
#[must_use]
pub fn effective_args(args: &[String]) -> Vec<&str> {
    args.iter()
        .map(String::as_str)
        .filter(|arg| !arg.is_empty())
        .collect()
}

/// Listing entry for a registered transformer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformerInfo {
    pub name: String,
    pub input_kind: InputKind,
    pub description: String,
}

impl TransformerInfo {
    #[must_use]
    pub fn of(transformer: &dyn OutputTransformer) -> Self {
        Self {
            name: transformer.name().to_string(),
            input_kind: transformer.input_kind(),
            description: transformer.description().to_string(),
        }
    }
}
