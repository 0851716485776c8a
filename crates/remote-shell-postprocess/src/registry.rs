//! Startup-time registry of output transformers.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use thiserror::Error;

use crate::{
    builtin::{GrepTransformer, HighlightTransformer, JsonPointerTransformer, SaveTransformer},
    transformer::{OutputTransformer, TransformerInfo},
};

/// Registry configuration error.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate transformer name: {0}")]
    DuplicateName(String),
    #[error("Transformer name must be a non-empty word without '|': {0:?}")]
    InvalidName(String),
}

/// Name-keyed set of transformers.
///
/// Built once at startup and shared read-only (usually behind an `Arc`)
/// by every session thread.
#[derive(Clone, Default)]
pub struct TransformerRegistry {
    transformers: BTreeMap<&'static str, Arc<dyn OutputTransformer>>,
}

impl TransformerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in transformer.
    ///
    /// # Errors
    /// Returns error if two built-ins share a name.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        Self::from_transformers(builtins())
    }

    /// Registry holding every built-in transformer, with `save` writing
    /// under `output_dir`.
    ///
    /// # Errors
    /// Returns error if two built-ins share a name.
    pub fn with_builtins_saving_to(output_dir: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        Self::from_transformers(builtins_saving_to(output_dir))
    }

    /// Build a registry from a discovered set of transformers.
    ///
    /// # Errors
    /// Returns error on the first duplicate or invalid name.
    pub fn from_transformers<I>(transformers: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = Arc<dyn OutputTransformer>>,
    {
        let mut registry = Self::new();
        for transformer in transformers {
            registry.register(transformer)?;
        }
        Ok(registry)
    }

    /// Add a transformer.
    ///
    /// # Errors
    /// Returns error if the name is already taken or unusable in a pipe.
    pub fn register(&mut self, transformer: Arc<dyn OutputTransformer>) -> Result<(), RegistryError> {
        let name = transformer.name();
        if name.is_empty() || name.contains('|') || name.contains(char::is_whitespace) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if self.transformers.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        tracing::debug!(transformer = name, "registered output transformer");
        self.transformers.insert(name, transformer);
        Ok(())
    }

    /// Find a transformer by exact name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Arc<dyn OutputTransformer>> {
        self.transformers.get(name)
    }

    /// All transformers, ordered by name.
    #[must_use]
    pub fn list(&self) -> Vec<TransformerInfo> {
        self.transformers
            .values()
            .map(|t| TransformerInfo::of(t.as_ref()))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl std::fmt::Debug for TransformerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.transformers.keys()).finish()
    }
}

/// Every transformer shipped with this crate; `save` writes under the
/// working directory.
#[must_use]
pub fn builtins() -> Vec<Arc<dyn OutputTransformer>> {
    builtins_saving_to(".")
}

/// Every transformer shipped with this crate, with `save` confined to
/// `output_dir`.
#[must_use]
pub fn builtins_saving_to(output_dir: impl Into<PathBuf>) -> Vec<Arc<dyn OutputTransformer>> {
    vec![
        Arc::new(GrepTransformer),
        Arc::new(HighlightTransformer),
        Arc::new(JsonPointerTransformer),
        Arc::new(SaveTransformer::new(output_dir)),
    ]
}
