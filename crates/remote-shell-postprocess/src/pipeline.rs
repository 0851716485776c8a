//! Pipe-segment parsing and pipeline application.

use std::{borrow::Cow, sync::Arc};

use remote_shell_core::CommandValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{registry::TransformerRegistry, transformer::TransformError};

const PIPE: char = '|';
const HASH: char = '#';

/// Pipeline failure. Any failure discards the whole rendering.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unknown post-processor: {0}")]
    UnknownTransformer(String),
    #[error("Post-processor '{name}' failed: {source}")]
    Transformer {
        name: String,
        #[source]
        source: TransformError,
    },
    #[error("Invalid pipe syntax: {0}")]
    Syntax(String),
}

/// One `| name args...` segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl PipelineStage {
    #[must_use]
    pub fn new<I>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered transformer stages for one command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelineSpec {
    stages: Vec<PipelineStage>,
}

impl PipelineSpec {
    /// A spec that applies no transformer.
    #[must_use]
    pub const fn empty() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage.
    #[must_use]
    pub fn then(mut self, stage: PipelineStage) -> Self {
        self.stages.push(stage);
        self
    }

    #[must_use]
    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl FromIterator<PipelineStage> for PipelineSpec {
    fn from_iter<T: IntoIterator<Item = PipelineStage>>(iter: T) -> Self {
        Self {
            stages: iter.into_iter().collect(),
        }
    }
}

/// Split a command line into the command and its trailing pipe segments.
///
/// `|` separates segments unless it appears inside single or double
/// quotes. The command part is returned verbatim (trimmed); every other
/// segment is tokenised shell-style into a transformer name and arguments.
/// `#` is an ordinary character, so `grep #42` filters on `#42`.
///
/// # Errors
/// Returns error on an empty segment or unbalanced quotes.
pub fn split_pipeline(line: &str) -> Result<(String, PipelineSpec), PipelineError> {
    let segments = split_unquoted(line)?;
    let mut segments = segments.into_iter();
    let command = segments.next().unwrap_or_default().trim().to_string();

    let stages = segments
        .map(|segment| {
            let mut words = shlex::split(&escape_hashes(segment))
                .ok_or_else(|| PipelineError::Syntax(format!("cannot parse '{}'", segment.trim())))?
                .into_iter();
            let name = words.next().ok_or_else(|| {
                PipelineError::Syntax("missing post-processor name after '|'".to_string())
            })?;
            Ok(PipelineStage {
                name,
                args: words.collect(),
            })
        })
        .collect::<Result<PipelineSpec, PipelineError>>()?;

    Ok((command, stages))
}

fn split_unquoted(line: &str) -> Result<Vec<&str>, PipelineError> {
    let mut segments = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (idx, ch) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, ch) {
            (Some('\''), '\'') | (Some('"'), '"') => quote = None,
            (Some('"') | None, '\\') => escaped = true,
            (None, '\'' | '"') => quote = Some(ch),
            (None, PIPE) => {
                segments.push(&line[start..idx]);
                start = idx + PIPE.len_utf8();
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(PipelineError::Syntax("unbalanced quotes".to_string()));
    }
    segments.push(&line[start..]);
    Ok(segments)
}

/// Backslash-escape every unquoted `#` so the tokenizer keeps it as text
/// rather than starting a comment.
fn escape_hashes(segment: &str) -> Cow<'_, str> {
    if !segment.contains(HASH) {
        return Cow::Borrowed(segment);
    }

    let mut escaped = String::with_capacity(segment.len() + 4);
    let mut quote: Option<char> = None;
    let mut backslash = false;
    for ch in segment.chars() {
        if backslash {
            backslash = false;
        } else {
            match (quote, ch) {
                (Some('\''), '\'') | (Some('"'), '"') => quote = None,
                (Some('"') | None, '\\') => backslash = true,
                (None, '\'' | '"') => quote = Some(ch),
                (None, HASH) => escaped.push('\\'),
                _ => {}
            }
        }
        escaped.push(ch);
    }
    Cow::Owned(escaped)
}

/// Applies pipeline specs against a shared registry.
#[derive(Debug, Clone)]
pub struct PipelineInvoker {
    registry: Arc<TransformerRegistry>,
}

impl PipelineInvoker {
    #[must_use]
    pub const fn new(registry: Arc<TransformerRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &TransformerRegistry {
        &self.registry
    }

    /// Render `value` and run it through every stage of `spec`, in order.
    ///
    /// Every stage name is resolved before any transformer runs, so an
    /// unknown name never leaves partial output behind.
    ///
    /// # Errors
    /// Returns error if a stage is unknown or a transformer fails.
    pub fn apply(&self, value: &CommandValue, spec: &PipelineSpec) -> Result<String, PipelineError> {
        let resolved = spec
            .stages()
            .iter()
            .map(|stage| {
                self.registry
                    .lookup(&stage.name)
                    .map(|transformer| (stage, transformer))
                    .ok_or_else(|| PipelineError::UnknownTransformer(stage.name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        resolved
            .into_iter()
            .try_fold(value.render(), |text, (stage, transformer)| {
                tracing::trace!(transformer = %stage.name, args = ?stage.args, "applying post-processor");
                transformer
                    .apply(&text, &stage.args)
                    .map_err(|source| PipelineError::Transformer {
                        name: stage.name.clone(),
                        source,
                    })
            })
    }
}
