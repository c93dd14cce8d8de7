use std::fmt;

use serde::{Deserialize, Serialize};

/// Static metadata identifying a selectable backend model and its capabilities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Name shown to the user and accepted by `/model`.
    pub display_name: String,

    /// Model identifier sent to the completion service.
    pub api_model_id: String,

    /// Whether the model accepts an attached image.
    #[serde(default)]
    pub supports_image_input: bool,

    /// One-paragraph description shown when the model is selected.
    #[serde(default)]
    pub description: String,

    /// Name of the secret holding this model's API key.
    pub credential_key: String,
}

impl ModelDescriptor {
    /// Create a new descriptor.
    pub fn new(
        display_name: impl Into<String>,
        api_model_id: impl Into<String>,
        credential_key: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            api_model_id: api_model_id.into(),
            supports_image_input: false,
            description: String::new(),
            credential_key: credential_key.into(),
        }
    }

    /// Mark the model as accepting image input.
    pub fn with_image_input(mut self, supports_image_input: bool) -> Self {
        self.supports_image_input = supports_image_input;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns true if `name` names this model, by display name or API id.
    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        self.display_name.eq_ignore_ascii_case(name) || self.api_model_id == name
    }
}

impl fmt::Display for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.api_model_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_display_name_or_id() {
        let model = ModelDescriptor::new("MiMo", "mistralai/mistral-7b-instruct:free", "MIMO_KEY");
        assert!(model.matches("mimo"));
        assert!(model.matches("  MiMo "));
        assert!(model.matches("mistralai/mistral-7b-instruct:free"));
        assert!(!model.matches("Molmo 2 8B"));
    }

    #[test]
    fn yaml_defaults() {
        let yaml = "display_name: Tiny\napi_model_id: tiny/1\ncredential_key: TINY_KEY\n";
        let model: ModelDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert!(!model.supports_image_input);
        assert!(model.description.is_empty());
        assert_eq!(model.to_string(), "Tiny (tiny/1)");
    }
}
