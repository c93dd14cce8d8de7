//! The catalog of selectable models.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::ModelDescriptor;

/// An ordered, non-empty list of model descriptors.
///
/// The first descriptor is the default selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CatalogFile")]
pub struct ModelCatalog {
    models: Vec<ModelDescriptor>,
}

/// The on-disk shape of a catalog, before validation.
#[derive(Deserialize)]
struct CatalogFile {
    models: Vec<ModelDescriptor>,
}

impl TryFrom<CatalogFile> for ModelCatalog {
    type Error = Error;

    fn try_from(file: CatalogFile) -> Result<Self> {
        Self::new(file.models)
    }
}

impl ModelCatalog {
    /// Create a catalog, rejecting empty lists and duplicate names.
    pub fn new(models: Vec<ModelDescriptor>) -> Result<Self> {
        if models.is_empty() {
            return Err(Error::configuration("model catalog is empty", None));
        }
        for (idx, model) in models.iter().enumerate() {
            if model.api_model_id.trim().is_empty() {
                return Err(Error::configuration(
                    format!("model {:?} has no api_model_id", model.display_name),
                    None,
                ));
            }
            if model.credential_key.trim().is_empty() {
                return Err(Error::configuration(
                    format!("model {:?} has no credential_key", model.display_name),
                    None,
                ));
            }
            if models[..idx]
                .iter()
                .any(|prior| prior.display_name.eq_ignore_ascii_case(&model.display_name))
            {
                return Err(Error::configuration(
                    format!("duplicate model name {:?}", model.display_name),
                    None,
                ));
            }
        }
        Ok(Self { models })
    }

    /// The built-in catalog: an image-capable model and a fast text model.
    pub fn builtin() -> Self {
        Self {
            models: vec![
                ModelDescriptor::new("Molmo 2 8B", "allenai/molmo-2-8b:free", "MOLMO_KEY")
                    .with_image_input(true)
                    .with_description(
                        "A multimodal model that understands and analyzes images with high \
                         precision. Suited to computer vision and detailed descriptions.",
                    ),
                ModelDescriptor::new("MiMo", "mistralai/mistral-7b-instruct:free", "MIMO_KEY")
                    .with_description(
                        "A model tuned for fast, efficient text. Good at logical reasoning, \
                         writing, and fluid conversation.",
                    ),
            ],
        }
    }

    /// Parse a catalog from YAML of the form `models: [...]`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let parsed: CatalogFile = serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration(format!("invalid model catalog: {e}"), None)
        })?;
        Self::new(parsed.models)
    }

    /// Load a catalog from a YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|e| {
            Error::configuration(
                format!("cannot read model catalog {}: {e}", path.display()),
                None,
            )
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// The default selection.
    pub fn default_model(&self) -> &ModelDescriptor {
        &self.models[0]
    }

    /// Look up a model by display name (case-insensitive) or API id.
    pub fn find(&self, name: &str) -> Option<&ModelDescriptor> {
        self.models.iter().find(|model| model.matches(name))
    }

    /// Look up a model, failing with a configuration error naming the choices.
    pub fn require(&self, name: &str) -> Result<&ModelDescriptor> {
        self.find(name).ok_or_else(|| {
            let names = self
                .models
                .iter()
                .map(|m| m.display_name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            Error::configuration(
                format!("unknown model {name:?}; choose one of: {names}"),
                Some(name.to_string()),
            )
        })
    }

    /// Iterate the descriptors in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelDescriptor> {
        self.models.iter()
    }

    /// Number of models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Always false for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
