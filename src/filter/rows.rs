//! Editable list of predicate rows

use crate::filter::ast::{Connective, PredicateRow};
use serde::{Deserialize, Serialize};

/// Ordered, index-addressable predicate rows.
///
/// Row `i`'s connective joins it to row `i + 1`. No validation happens
/// here; malformed rows are the compiler's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredicateRows {
    rows: Vec<PredicateRow>,
}

impl PredicateRows {
    pub fn new() -> Self {
        Self::default()
    }

    /// A list holding one placeholder row
    pub fn with_placeholder() -> Self {
        let mut rows = Self::new();
        rows.append_row();
        rows
    }

    /// Append a default `{"", EQ, "", ""}` row and return its index
    pub fn append_row(&mut self) -> usize {
        self.rows.push(PredicateRow::default());
        self.rows.len() - 1
    }

    /// Drop every row after `index`
    pub fn truncate_after(&mut self, index: usize) {
        self.rows.truncate(index.saturating_add(1));
    }

    /// Set the connective of row `index`.
    ///
    /// Clearing a connective makes all later rows unreachable, so they are
    /// discarded. Returns false when `index` is out of range.
    pub fn set_connective(&mut self, index: usize, connective: Connective) -> bool {
        let Some(row) = self.rows.get_mut(index) else {
            return false;
        };
        row.connective = connective;
        if connective.is_none() {
            self.truncate_after(index);
        }
        true
    }

    pub fn get(&self, index: usize) -> Option<&PredicateRow> {
        self.rows.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PredicateRow> {
        self.rows.get_mut(index)
    }

    pub fn as_slice(&self) -> &[PredicateRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PredicateRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_vec(self) -> Vec<PredicateRow> {
        self.rows
    }
}

impl From<Vec<PredicateRow>> for PredicateRows {
    fn from(rows: Vec<PredicateRow>) -> Self {
        Self { rows }
    }
}

impl<'a> IntoIterator for &'a PredicateRows {
    type Item = &'a PredicateRow;
    type IntoIter = std::slice::Iter<'a, PredicateRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
