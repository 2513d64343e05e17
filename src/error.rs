//! Error types for the style rule engine

use thiserror::Error;

/// Main error type for the style rule engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StyleError {
    /// The filter text could not be turned into predicate rows.
    /// Callers fall back to raw-text editing instead of dropping the expression.
    #[error("Filter parse failed: {0}")]
    ParseFailed(String),

    #[error("Invalid style: {0}")]
    InvalidStyle(String),

    #[error("Duplicate rule name: {0}")]
    DuplicateRuleName(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Classification failed: {0}")]
    ClassificationFailed(String),

    #[error("No active rule")]
    NoActiveRule,
}

impl From<serde_json::Error> for StyleError {
    fn from(err: serde_json::Error) -> Self {
        StyleError::DeserializationError(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<StyleError> for pyo3::PyErr {
    fn from(err: StyleError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyKeyError, PyRuntimeError, PyValueError};

        match err {
            StyleError::ParseFailed(msg) => {
                PyValueError::new_err(format!("Filter parse failed: {}", msg))
            }
            StyleError::InvalidStyle(msg) => PyValueError::new_err(format!("Invalid style: {}", msg)),
            StyleError::DuplicateRuleName(name) => {
                PyKeyError::new_err(format!("Duplicate rule name: {}", name))
            }
            StyleError::DeserializationError(msg) => {
                PyValueError::new_err(format!("Deserialization error: {}", msg))
            }
            StyleError::ClassificationFailed(msg) => {
                PyRuntimeError::new_err(format!("Classification failed: {}", msg))
            }
            StyleError::NoActiveRule => PyRuntimeError::new_err("No active rule"),
        }
    }
}

/// Result type alias for the style rule engine
pub type Result<T> = std::result::Result<T, StyleError>;
