//! Style, rule and symbolizer model
//!
//! This module defines the persisted style format and its JSON
//! serialization.

mod symbolizer;
mod validator;

pub use symbolizer::*;
pub use validator::*;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Ordered collection of rules.
///
/// Order matters: every rule whose scale range and filter match a feature
/// applies, later rules after earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl Style {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Deserialize and validate a style
    pub fn from_json(json: &str) -> Result<Self> {
        let style: Style = serde_json::from_str(json)?;
        validate(&style)?;
        Ok(style)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Index of the rule called `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.rules.iter().position(|rule| rule.name == name)
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }
}

/// Named, scale-bounded, optionally filtered group of symbolizers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Scale denominator upper bound (exclusive); 0 means unbounded
    #[serde(default)]
    pub max_scale: f64,
    /// Scale denominator lower bound (inclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_scale: Option<f64>,
    /// CQL filter text; `None` matches every feature
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub symbolizers: Vec<Symbolizer>,
}

impl Rule {
    /// Empty rule: no symbolizers, null filter
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            description: String::new(),
            max_scale: 0.0,
            min_scale: None,
            filter: None,
            symbolizers: Vec::new(),
        }
    }

    pub fn with_symbolizer(mut self, symbolizer: Symbolizer) -> Self {
        self.symbolizers.push(symbolizer);
        self
    }

    /// Whether the rule draws at scale denominator `scale`
    pub fn is_visible_at(&self, scale: f64) -> bool {
        let above_min = self.min_scale.map_or(true, |min| scale >= min);
        let below_max = self.max_scale <= 0.0 || scale < self.max_scale;
        above_min && below_max
    }

    /// Whether any symbolizer is cell-tagged
    pub fn has_cell_symbolizer(&self) -> bool {
        self.symbolizers.iter().any(Symbolizer::is_cell)
    }

    pub fn has_palette_symbolizer(&self) -> bool {
        self.symbolizers
            .iter()
            .any(|s| matches!(s, Symbolizer::RasterPalette(_)))
    }
}
