//! Literal highlighter.

use crate::transformer::{OutputTransformer, TransformError, effective_args};

const HIGHLIGHT: &str = "\x1b[1;33m";
const RESET: &str = "\x1b[0m";

/// Wraps every occurrence of the arguments in bold yellow.
///
/// At each position the longest matching argument wins; matches never
/// overlap.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighlightTransformer;

impl OutputTransformer for HighlightTransformer {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn description(&self) -> &'static str {
        "Highlight the given words in the output"
    }

    fn apply(&self, input: &str, args: &[String]) -> Result<String, TransformError> {
        let patterns = effective_args(args);
        if patterns.is_empty() {
            return Ok(input.to_string());
        }

        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(ch) = rest.chars().next() {
            let hit = patterns
                .iter()
                .filter(|p| rest.starts_with(**p))
                .max_by_key(|p| p.len());
            if let Some(pattern) = hit {
                out.push_str(HIGHLIGHT);
                out.push_str(pattern);
                out.push_str(RESET);
                rest = &rest[pattern.len()..];
            } else {
                out.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
        Ok(out)
    }
}
