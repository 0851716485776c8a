//! Session configuration.

use serde::{Deserialize, Serialize};

const DEFAULT_BANNER: &str = "Remote shell ready. Type 'postprocessors' to list output filters, 'exit' to quit.";

/// Behaviour shared by every session started by a manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prompt written before each read.
    pub prompt: String,
    /// Text shown when a session starts.
    pub banner: Option<String>,
    pub display_banner: bool,
    /// Session threads are named `<prefix>-<connection id>`.
    pub thread_name_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompt: "shell> ".to_string(),
            banner: Some(DEFAULT_BANNER.to_string()),
            display_banner: true,
            thread_name_prefix: "shell-session".to_string(),
        }
    }
}

impl SessionConfig {
    /// Override the prompt.
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Override the banner.
    #[must_use]
    pub fn banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = Some(banner.into());
        self
    }

    /// Enable or disable the banner.
    #[must_use]
    pub const fn display_banner(mut self, display: bool) -> Self {
        self.display_banner = display;
        self
    }

    /// Banner to show, if any.
    #[must_use]
    pub fn effective_banner(&self) -> Option<&str> {
        self.banner
            .as_deref()
            .filter(|banner| self.display_banner && !banner.is_empty())
    }
}
