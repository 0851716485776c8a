//! Line filter.

use crate::transformer::{OutputTransformer, TransformError, effective_args};

/// Keeps the lines containing any of the arguments, numbered by their
/// position in the original output.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrepTransformer;

impl OutputTransformer for GrepTransformer {
    fn name(&self) -> &'static str {
        "grep"
    }

    fn description(&self) -> &'static str {
        "Keep lines containing any of the given words"
    }

    fn apply(&self, input: &str, args: &[String]) -> Result<String, TransformError> {
        let patterns = effective_args(args);
        if patterns.is_empty() {
            return Ok(input.to_string());
        }

        let kept: Vec<String> = input
            .lines()
            .enumerate()
            .filter(|(_, line)| patterns.iter().any(|p| line.contains(p)))
            .map(|(idx, line)| format!("{}. {line}", idx + 1))
            .collect();
        Ok(kept.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST: &str = "test\ntoto\ntiti\ntest";

    fn grep(args: &[&str]) -> String {
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        GrepTransformer.apply(TEST, &args).unwrap()
    }

    #[test]
    fn test_identity_without_arguments() {
        assert_eq!(grep(&[]), TEST);
        assert_eq!(grep(&[""]), TEST);
    }

    #[test]
    fn test_single_pattern() {
        assert_eq!(grep(&["test"]), "1. test\n4. test");
        assert_eq!(grep(&["toto"]), "2. toto");
    }

    #[test]
    fn test_patterns_are_or_combined() {
        assert_eq!(grep(&["test", "toto"]), "1. test\n2. toto\n4. test");
    }

    #[test]
    fn test_case_sensitive_substring() {
        assert_eq!(grep(&["TEST"]), "");
        assert_eq!(grep(&["it"]), "3. titi");
    }

    #[test]
    fn test_crlf_input() {
        let args = vec!["b".to_string()];
        assert_eq!(GrepTransformer.apply("a\r\nb\r\n", &args).unwrap(), "2. b");
    }
}
