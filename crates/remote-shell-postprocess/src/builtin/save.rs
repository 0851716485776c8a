//! Save output to a file.

use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use crate::transformer::{OutputTransformer, TransformError, effective_args};

/// Writes the output to the file named by the first argument.
///
/// The name is resolved against the output directory; absolute paths and
/// `..` components are rejected.
#[derive(Debug, Clone)]
pub struct SaveTransformer {
    output_dir: PathBuf,
}

impl SaveTransformer {
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, TransformError> {
        let relative = Path::new(name);
        let confined = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !confined || relative.file_name().is_none() {
            return Err(TransformError::InvalidArguments(format!(
                "'{name}' must be a file name inside the output directory"
            )));
        }
        Ok(self.output_dir.join(relative))
    }
}

impl Default for SaveTransformer {
    fn default() -> Self {
        Self::new(".")
    }
}

impl OutputTransformer for SaveTransformer {
    fn name(&self) -> &'static str {
        "save"
    }

    fn description(&self) -> &'static str {
        "Save the output to the given file"
    }

    fn apply(&self, input: &str, args: &[String]) -> Result<String, TransformError> {
        let path = match effective_args(args).as_slice() {
            [] => return Ok(input.to_string()),
            [name] => self.resolve(name)?,
            _ => {
                return Err(TransformError::InvalidArguments(
                    "expected a single file path".to_string(),
                ));
            }
        };

        fs::write(&path, input)?;
        tracing::debug!(path = %path.display(), bytes = input.len(), "saved command output");
        Ok(format!("Result saved to file: {}", path.display()))
    }
}
