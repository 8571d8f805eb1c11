//! Text encodings of a grammar model
//!
//! Grammars are written and read back as YAML or JSON. The bundled
//! interchange envelope fragment uses the YAML form.

use crate::model::Edimap;
use crate::{Error, Result};
use std::path::Path;
use tracing::trace;

impl Edimap {
    /// Load a grammar from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::invalid_format(format!("JSON parse error: {}", e)))
    }

    /// Load a grammar from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::invalid_format(format!("YAML parse error: {}", e)))
    }

    /// Load a grammar from a file, choosing the format by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        trace!("Loading grammar from file: {:?}", path);
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;

        if path
            .extension()
            .map(|e| e == "yaml" || e == "yml")
            .unwrap_or(false)
        {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    /// Render the grammar as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::invalid_format(format!("JSON write error: {}", e)))
    }

    /// Render the grammar as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| Error::invalid_format(format!("YAML write error: {}", e)))
    }
}
