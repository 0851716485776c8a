//! JSON pointer extraction.

use serde_json::Value;

use crate::transformer::{InputKind, OutputTransformer, TransformError, effective_args};

/// Extracts the value at a JSON pointer (`/items/0/name`) from JSON output.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPointerTransformer;

impl OutputTransformer for JsonPointerTransformer {
    fn name(&self) -> &'static str {
        "json"
    }

    fn description(&self) -> &'static str {
        "Extract the value at a JSON pointer"
    }

    fn input_kind(&self) -> InputKind {
        InputKind::Json
    }

    fn apply(&self, input: &str, args: &[String]) -> Result<String, TransformError> {
        let pointer = match effective_args(args).as_slice() {
            [] => return Ok(input.to_string()),
            [pointer] => *pointer,
            _ => {
                return Err(TransformError::InvalidArguments(
                    "expected a single JSON pointer".to_string(),
                ));
            }
        };
        if !pointer.starts_with('/') {
            return Err(TransformError::InvalidArguments(format!(
                "JSON pointer must start with '/': {pointer}"
            )));
        }

        let document: Value = serde_json::from_str(input)?;
        match document.pointer(pointer) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(value) => Ok(serde_json::to_string_pretty(value)?),
            None => Err(TransformError::InvalidInput(format!(
                "no value at pointer {pointer}"
            ))),
        }
    }
}
