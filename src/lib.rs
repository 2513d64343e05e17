//! Style Rule Core - filter engine and rule registry for map styles
//!
//! This crate compiles editable predicate rows into CQL filter text, parses
//! filter text back into rows, evaluates filters against feature properties,
//! and tracks the rule and symbolizer being edited within a style. Python
//! bindings are available behind the `python` feature via PyO3.

pub mod config;
pub mod error;
pub mod filter;
pub mod registry;
pub mod style;

#[cfg(feature = "python")]
mod bindings {
    use pyo3::prelude::*;
    use pyo3::types::PyList;

    use crate::error::StyleError;
    use crate::filter;
    use crate::registry::session::{extract_rows, rows_to_list};
    use crate::registry::StyleSession;

    // ========================================================================
    // Python Functions
    // ========================================================================

    /// Compile predicate rows into CQL text
    ///
    /// # Arguments
    /// * `rows` - List of `{attribute, comparator, value, connective}` dicts
    ///
    /// # Returns
    /// The filter text, or None when no row produces a clause
    #[pyfunction]
    fn compile_filter(rows: &Bound<'_, PyList>) -> PyResult<Option<String>> {
        let rows = extract_rows(rows)?;
        Ok(filter::compile(&rows))
    }

    /// Parse CQL text into predicate rows
    ///
    /// Returns None when the text cannot be represented as rows; the caller
    /// should keep the text and edit it raw.
    #[pyfunction]
    fn parse_filter<'py>(py: Python<'py>, text: &str) -> PyResult<Option<Bound<'py, PyList>>> {
        match filter::parse_rows(text) {
            Ok(rows) => rows_to_list(py, &rows).map(Some),
            Err(StyleError::ParseFailed(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Python Module
    // ========================================================================

    #[pymodule]
    fn style_rule_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(compile_filter, m)?)?;
        m.add_function(wrap_pyfunction!(parse_filter, m)?)?;
        m.add_class::<StyleSession>()?;
        Ok(())
    }
}
