//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling chat behavior.

use std::path::PathBuf;
use std::time::Duration;

use arrrg_derive::CommandLine;

use crate::credentials::CredentialStore;
use crate::error::Result;
use crate::models::ModelCatalog;

/// Command-line arguments for the multichat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to start with.
    #[arrrg(optional, "Model to use, by name or API id (default: first in catalog)", "MODEL")]
    pub model: Option<String>,

    /// YAML model catalog.
    #[arrrg(optional, "YAML file listing the selectable models", "FILE")]
    pub models: Option<String>,

    /// YAML secrets file.
    #[arrrg(optional, "YAML file mapping credential keys to API keys (default: secrets.yaml)", "FILE")]
    pub secrets: Option<String>,

    /// Base URL of the completion service.
    #[arrrg(optional, "Base URL of the completion API (default: https://openrouter.ai/api/v1/)", "URL")]
    pub base_url: Option<String>,

    /// Image to attach from the start.
    #[arrrg(optional, "Image (jpg, jpeg, png) to attach to prompts", "FILE")]
    pub image: Option<String>,

    /// Request log.
    #[arrrg(optional, "Append every request and streamed fragment to FILE", "FILE")]
    pub log_file: Option<String>,

    /// Request timeout.
    #[arrrg(optional, "Request timeout in seconds (default: none)", "SECONDS")]
    pub timeout_secs: Option<u32>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Model to select at startup; `None` selects the catalog default.
    pub model: Option<String>,

    /// Model catalog file; `None` uses the built-in catalog.
    pub models_path: Option<PathBuf>,

    /// Secrets file; `None` looks for `secrets.yaml` in the working directory.
    pub secrets_path: Option<PathBuf>,

    /// Base URL override for the completion service.
    pub base_url: Option<String>,

    /// Image to attach at startup.
    pub image_path: Option<PathBuf>,

    /// File that receives a log of requests and fragments.
    pub log_path: Option<PathBuf>,

    /// Request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: first catalog entry
    /// - Catalog: built-in
    /// - Secrets: `secrets.yaml` if present, then the environment
    /// - Timeout: none
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: None,
            models_path: None,
            secrets_path: None,
            base_url: None,
            image_path: None,
            log_path: None,
            timeout: None,
            use_color: true,
        }
    }

    /// Sets the model to start with.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the model catalog file.
    pub fn with_models_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.models_path = Some(path.into());
        self
    }

    /// Sets the secrets file.
    pub fn with_secrets_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.secrets_path = Some(path.into());
        self
    }

    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Sets the startup image.
    pub fn with_image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    /// Sets the request log file.
    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Load the model catalog this configuration names.
    pub fn load_catalog(&self) -> Result<ModelCatalog> {
        match &self.models_path {
            Some(path) => ModelCatalog::from_path(path),
            None => Ok(ModelCatalog::builtin()),
        }
    }

    /// Load the credential store this configuration names.
    pub fn load_credentials(&self) -> Result<CredentialStore> {
        match &self.secrets_path {
            Some(path) => CredentialStore::from_path(path),
            None => CredentialStore::discover(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        ChatConfig {
            model: args.model,
            models_path: args.models.map(PathBuf::from),
            secrets_path: args.secrets.map(PathBuf::from),
            base_url: args.base_url,
            image_path: args.image.map(PathBuf::from),
            log_path: args.log_file.map(PathBuf::from),
            timeout: args.timeout_secs.map(|secs| Duration::from_secs(u64::from(secs))),
            use_color: !args.no_color,
        }
    }
}
