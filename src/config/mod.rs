//! Editor configuration
//!
//! Configuration is plain JSON deserialized with serde; every field is
//! optional and falls back to the built-in defaults.

mod defaults;

pub use defaults::*;

use serde::Deserialize;

use crate::error::Result;

/// Registry behavior and symbolizer templates
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    /// Prefix for generated rule names ("Rule 1", "Rule 2", ...)
    pub rule_name_prefix: String,
    /// Class count staged for interval classification
    pub default_class_count: u32,
    /// Colors staged for automatic classification
    pub default_palette: Vec<String>,
    pub symbolizers: SymbolizerDefaults,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            rule_name_prefix: "Rule".to_string(),
            default_class_count: 5,
            default_palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            symbolizers: SymbolizerDefaults::default(),
        }
    }
}

impl EditorConfig {
    /// Load configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
