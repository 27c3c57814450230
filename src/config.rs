//! Runtime configuration
//!
//! Handed over by the extension host as JSON. Every field has a default,
//! so `{}` is a valid configuration.

use crate::capture::MarkerSet;
use crate::error::{EdityError, Result};
use crate::key::KeyPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdityConfig {
    /// Wiki API endpoint the transport talks to
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,

    /// How page URLs are reduced to document keys
    #[serde(default)]
    pub key: KeyPolicy,

    /// Editor markers stripped from captured `after` fragments
    #[serde(default)]
    pub markers: MarkerSet,

    /// Pages and domains that may not be edited
    #[serde(default)]
    pub protected: Vec<String>,

    /// Summary used when the user leaves it blank
    #[serde(default = "default_summary")]
    pub default_summary: String,
}

fn default_api_endpoint() -> String {
    "https://edity.org/api.php".to_string()
}

fn default_summary() -> String {
    String::new()
}

impl Default for EdityConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            key: KeyPolicy::default(),
            markers: MarkerSet::default(),
            protected: Vec::new(),
            default_summary: default_summary(),
        }
    }
}

impl EdityConfig {
    /// Parse and validate a JSON configuration
    ///
    /// Only a JSON object is accepted; other shapes would otherwise
    /// deserialize as an all-defaults configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(EdityError::Config("configuration must be a JSON object".to_string()));
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.api_endpoint).map_err(|e| {
            EdityError::Config(format!("api_endpoint {:?}: {}", self.api_endpoint, e))
        })?;
        if self.markers.attributes.iter().any(|a| a.trim().is_empty()) {
            return Err(EdityError::Config("empty marker attribute name".to_string()));
        }
        Ok(())
    }
}
