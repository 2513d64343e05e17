//! Automatic classification requests
//!
//! The classifier itself is an external collaborator; the registry only
//! stages the request and installs whatever rule list comes back.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::style::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClassificationMethod {
    EqualInterval,
    Quantile,
    NaturalBreaks,
    Unique,
}

/// Geometry the generated rules will symbolize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Point,
    Line,
    Polygon,
}

/// Parameters sent to the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRequest {
    pub attribute: String,
    /// Number of classes; `None` for unique-value classification
    pub interval_count: Option<u32>,
    pub method: ClassificationMethod,
    pub symbol_kind: SymbolKind,
    pub colors: Vec<String>,
}

impl ClassificationRequest {
    pub fn intervals(attribute: impl Into<String>, count: u32, colors: Vec<String>) -> Self {
        Self {
            attribute: attribute.into(),
            interval_count: Some(count),
            method: ClassificationMethod::EqualInterval,
            symbol_kind: SymbolKind::Polygon,
            colors,
        }
    }

    pub fn unique(attribute: impl Into<String>, colors: Vec<String>) -> Self {
        Self {
            attribute: attribute.into(),
            interval_count: None,
            method: ClassificationMethod::Unique,
            symbol_kind: SymbolKind::Polygon,
            colors,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// External automatic-classification service.
///
/// Returns the complete replacement rule list for the style.
pub trait Classifier {
    fn classify(&self, request: &ClassificationRequest) -> Result<Vec<Rule>>;
}

impl<F> Classifier for F
where
    F: Fn(&ClassificationRequest) -> Result<Vec<Rule>>,
{
    fn classify(&self, request: &ClassificationRequest) -> Result<Vec<Rule>> {
        self(request)
    }
}
