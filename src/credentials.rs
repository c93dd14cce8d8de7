//! Resolution of per-model API keys.
//!
//! Keys are looked up by a model's `credential_key`, first in a YAML secrets
//! file (a flat `KEY: value` map) and then in the process environment.  An
//! absent or blank value is a configuration error.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::ModelDescriptor;

/// Default secrets file consulted when present in the working directory.
pub const DEFAULT_SECRETS_FILE: &str = "secrets.yaml";

/// A resolved API key.  Its `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// The secret value, for placing in a request header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Where API keys come from.
#[derive(Clone, Default)]
pub struct CredentialStore {
    secrets: HashMap<String, String>,
    ignore_environment: bool,
}

impl CredentialStore {
    /// A store backed only by the process environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse secrets from YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let secrets: Option<HashMap<String, String>> = serde_yaml::from_str(yaml)
            .map_err(|e| Error::configuration(format!("invalid secrets file: {e}"), None))?;
        Ok(Self {
            secrets: secrets.unwrap_or_default(),
            ignore_environment: false,
        })
    }

    /// Load secrets from a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|e| {
            Error::configuration(
                format!("cannot read secrets file {}: {e}", path.display()),
                None,
            )
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Load `secrets.yaml` from the working directory if it exists.
    pub fn discover() -> Result<Self> {
        let path = Path::new(DEFAULT_SECRETS_FILE);
        if path.exists() {
            Self::from_path(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Add or replace a secret.
    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }

    /// Stop consulting the process environment.
    pub fn without_environment(mut self) -> Self {
        self.ignore_environment = true;
        self
    }

    /// Resolve the key for `model`.
    pub fn resolve(&self, model: &ModelDescriptor) -> Result<Credential> {
        let key = model.credential_key.as_str();
        let from_file = self.secrets.get(key).cloned();
        let from_env = if self.ignore_environment {
            None
        } else {
            env::var(key).ok()
        };
        from_file
            .into_iter()
            .chain(from_env)
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .map(Credential)
            .ok_or_else(|| {
                Error::configuration(
                    format!("the API key for {} is not configured", model.display_name),
                    Some(key.to_string()),
                )
            })
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.secrets.keys().collect();
        keys.sort();
        f.debug_struct("CredentialStore")
            .field("keys", &keys)
            .field("ignore_environment", &self.ignore_environment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(key: &str) -> ModelDescriptor {
        ModelDescriptor::new("Test", "test/model", key)
    }

    #[test]
    fn resolves_from_secrets() {
        let store = CredentialStore::new()
            .without_environment()
            .with_secret("MULTICHAT_TEST_KEY_A", "sk-a");
        let credential = store.resolve(&model("MULTICHAT_TEST_KEY_A")).unwrap();
        assert_eq!(credential.expose(), "sk-a");
        assert_eq!(format!("{credential:?}"), "Credential(<redacted>)");
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let store = CredentialStore::new().without_environment();
        let err = store.resolve(&model("MULTICHAT_TEST_KEY_MISSING")).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.configuration_key(), Some("MULTICHAT_TEST_KEY_MISSING"));
        assert!(err.to_string().contains("Test"));
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let store = CredentialStore::new()
            .without_environment()
            .with_secret("MULTICHAT_TEST_KEY_BLANK", "   ");
        assert!(store.resolve(&model("MULTICHAT_TEST_KEY_BLANK")).is_err());
    }

    #[test]
    fn yaml_secrets() {
        let store = CredentialStore::from_yaml_str("MOLMO_KEY: sk-molmo\nMIMO_KEY: sk-mimo\n")
            .unwrap()
            .without_environment();
        assert_eq!(store.resolve(&model("MIMO_KEY")).unwrap().expose(), "sk-mimo");
        assert!(!format!("{store:?}").contains("sk-"));
        assert!(CredentialStore::from_yaml_str("- not\n- a map\n").is_err());
    }

    #[test]
    fn environment_fallback() {
        let store = CredentialStore::new();
        // PATH is set in any test environment; a model could name it as its key.
        assert!(store.resolve(&model("PATH")).is_ok());
        assert!(store.without_environment().resolve(&model("PATH")).is_err());
    }
}
