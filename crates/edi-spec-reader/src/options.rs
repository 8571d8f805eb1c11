//! Reader configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for reading a directory release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    /// Reference segment definitions through an import of the definitions
    /// grammar instead of inlining their fields into every message
    pub use_import: bool,
    /// Use segment codes (`BGM`) as segment tags instead of encoded names
    /// (`Beginning_of_message`)
    pub use_short_name: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            use_import: false,
            use_short_name: true,
        }
    }
}

impl ReaderOptions {
    pub fn with_import(mut self, use_import: bool) -> Self {
        self.use_import = use_import;
        self
    }

    pub fn with_short_name(mut self, use_short_name: bool) -> Self {
        self.use_short_name = use_short_name;
        self
    }

    /// Load options from YAML text. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("YAML parse error: {}", e)))
    }

    /// Load options from JSON text. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("JSON parse error: {}", e)))
    }
}
