//! StyleSession - Python handle on a style being edited
//!
//! The style lives in Rust memory; Python drives the registry through
//! methods and reads back JSON or filter rows when it needs them.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyAny, PyDict, PyList};

use crate::config::EditorConfig;
use crate::error::StyleError;
use crate::filter::{Comparator, Connective, PredicateRow, PredicateRows};
use crate::registry::{AddRuleOutcome, MoveDirection, RuleKind, StyleEditor};
use crate::style::{Style, SymbolizerKind};

// ============================================================================
// Row conversion
// ============================================================================

/// Extract predicate rows from a list of dicts
/// `{"attribute", "comparator", "value", "connective"}`; missing keys default.
pub(crate) fn extract_rows(list: &Bound<'_, PyList>) -> PyResult<Vec<PredicateRow>> {
    let mut rows = Vec::with_capacity(list.len());

    for item in list.iter() {
        let attribute = get_opt(&item, "attribute")?.unwrap_or_default();
        let value = get_opt(&item, "value")?.unwrap_or_default();

        let comparator = match get_opt(&item, "comparator")? {
            None => Comparator::default(),
            Some(name) => Comparator::from_name(&name)
                .or_else(|| Comparator::from_token(&name))
                .ok_or_else(|| PyValueError::new_err(format!("Unknown comparator: {}", name)))?,
        };

        let connective = match get_opt(&item, "connective")? {
            None => Connective::None,
            Some(text) => Connective::parse(&text)
                .ok_or_else(|| PyValueError::new_err(format!("Unknown connective: {}", text)))?,
        };

        rows.push(PredicateRow {
            attribute,
            comparator,
            value,
            connective,
        });
    }

    Ok(rows)
}

fn get_opt(obj: &Bound<'_, PyAny>, key: &str) -> PyResult<Option<String>> {
    match obj.get_item(key) {
        Ok(value) if value.is_none() => Ok(None),
        Ok(value) => Ok(Some(value.extract::<String>()?)),
        Err(_) => Ok(None),
    }
}

/// Convert rows into a list of dicts
pub(crate) fn rows_to_list<'py>(
    py: Python<'py>,
    rows: &[PredicateRow],
) -> PyResult<Bound<'py, PyList>> {
    let mut dicts = Vec::with_capacity(rows.len());
    for row in rows {
        let dict = PyDict::new(py);
        dict.set_item("attribute", &row.attribute)?;
        dict.set_item("comparator", row.comparator.name())?;
        dict.set_item("value", &row.value)?;
        dict.set_item("connective", row.connective.as_str())?;
        dicts.push(dict);
    }
    PyList::new(py, dicts)
}

fn parse_kind<T: std::str::FromStr<Err = String>>(text: &str) -> PyResult<T> {
    text.parse().map_err(PyValueError::new_err)
}

// ============================================================================
// StyleSession PyClass
// ============================================================================

/// Stateful style editing session
#[pyclass]
pub struct StyleSession {
    editor: StyleEditor,
}

#[pymethods]
impl StyleSession {
    /// Start an empty style
    #[new]
    fn new(name: &str) -> Self {
        Self {
            editor: StyleEditor::new(Style::new(name)),
        }
    }

    /// Load a style (and optional editor config) from JSON
    #[staticmethod]
    #[pyo3(signature = (json, config=None))]
    fn from_json(json: &str, config: Option<&str>) -> PyResult<Self> {
        let config = match config {
            Some(text) => EditorConfig::from_json(text)?,
            None => EditorConfig::default(),
        };
        Ok(Self {
            editor: StyleEditor::from_json(json, config)?,
        })
    }

    fn to_json(&self) -> PyResult<String> {
        Ok(self.editor.to_json()?)
    }

    #[getter]
    fn rule_names(&self) -> Vec<String> {
        self.editor.rules().iter().map(|r| r.name.clone()).collect()
    }

    #[getter]
    fn active_index(&self) -> Option<usize> {
        self.editor.active_index()
    }

    /// Add a rule of `kind`; returns its index, or None when the kind only
    /// stages a classification
    fn add_rule(&mut self, kind: &str) -> PyResult<Option<usize>> {
        let kind: RuleKind = parse_kind(kind)?;
        Ok(match self.editor.add_rule(kind) {
            AddRuleOutcome::Created { index, .. } => Some(index),
            AddRuleOutcome::Staged => None,
        })
    }

    /// Select a rule; returns the editor it routes to
    fn select_rule(&mut self, index: usize) -> Option<&'static str> {
        self.editor.select_rule(index).map(|kind| kind.as_str())
    }

    fn deselect_rule(&mut self) {
        self.editor.deselect_rule();
    }

    #[pyo3(signature = (index, up=true))]
    fn move_rule(&mut self, index: usize, up: bool) -> bool {
        let direction = if up {
            MoveDirection::Up
        } else {
            MoveDirection::Down
        };
        self.editor.move_rule(index, direction)
    }

    fn delete_rule(&mut self, index: usize) -> bool {
        self.editor.delete_rule(index).is_some()
    }

    fn delete_all_rules(&mut self) {
        self.editor.delete_all_rules();
    }

    /// Add a symbolizer to the active rule
    ///
    /// Raises RuntimeError when no rule is selected
    fn add_symbolizer(&mut self, kind: &str) -> PyResult<usize> {
        let kind: SymbolizerKind = parse_kind(kind)?;
        self.editor
            .add_symbolizer(kind)
            .ok_or_else(|| StyleError::NoActiveRule.into())
    }

    fn remove_symbolizer(&mut self, index: usize) -> bool {
        self.editor.remove_symbolizer(index).is_some()
    }

    fn active_editor(&self) -> Option<&'static str> {
        self.editor.active_editor().map(|kind| kind.as_str())
    }

    /// Filter text of the active rule
    #[getter]
    fn filter(&self) -> Option<String> {
        self.editor.active_rule().and_then(|rule| rule.filter.clone())
    }

    /// Rows of the active rule's filter, or None when it must be edited as
    /// raw text
    fn filter_rows<'py>(&self, py: Python<'py>) -> PyResult<Option<Bound<'py, PyList>>> {
        let filter = self.editor.filter_editor();
        if filter.is_raw() {
            return Ok(None);
        }
        rows_to_list(py, filter.rows().as_slice()).map(Some)
    }

    /// Replace the active rule's filter with compiled rows
    fn set_filter_rows(&mut self, rows: &Bound<'_, PyList>) -> PyResult<Option<String>> {
        let rows = PredicateRows::from(extract_rows(rows)?);
        let filter = self.editor.filter_editor_mut();
        *filter.rows_mut() = rows;
        filter.use_rows();
        Ok(self.editor.commit_filter()?)
    }

    /// Replace the active rule's filter with raw text
    fn set_filter_text(&mut self, text: &str) -> PyResult<Option<String>> {
        self.editor.filter_editor_mut().set_raw_text(text);
        Ok(self.editor.commit_filter()?)
    }

    fn __len__(&self) -> usize {
        self.editor.rules().len()
    }
}
