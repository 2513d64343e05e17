//! Filter editing state for the active rule

use tracing::warn;

use crate::error::Result;
use crate::filter::{compile, parse_rows, PredicateRows};

/// How the active rule's filter is being edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterMode {
    /// Structured predicate rows
    Rows,
    /// Raw CQL text the row editor cannot represent
    RawText(String),
}

/// Rows-or-raw-text editor for one filter.
///
/// A failed parse switches to raw text and leaves the rows untouched, so the
/// stored expression is never replaced by a guess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEditor {
    rows: PredicateRows,
    mode: FilterMode,
}

impl Default for FilterEditor {
    fn default() -> Self {
        Self {
            rows: PredicateRows::with_placeholder(),
            mode: FilterMode::Rows,
        }
    }
}

impl FilterEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a stored filter.
    ///
    /// `None` resets to a single placeholder row. Text that does not parse
    /// into rows switches to raw-text mode and returns the parse error.
    pub fn load(&mut self, expression: Option<&str>) -> Result<()> {
        let Some(text) = expression.filter(|t| !t.trim().is_empty()) else {
            *self = Self::default();
            return Ok(());
        };

        match parse_rows(text) {
            Ok(rows) => {
                self.rows = rows.into();
                self.mode = FilterMode::Rows;
                Ok(())
            }
            Err(e) => {
                warn!(filter = text, error = %e, "falling back to raw filter text");
                self.mode = FilterMode::RawText(text.to_string());
                Err(e)
            }
        }
    }

    pub fn rows(&self) -> &PredicateRows {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut PredicateRows {
        &mut self.rows
    }

    pub fn mode(&self) -> &FilterMode {
        &self.mode
    }

    pub fn is_raw(&self) -> bool {
        matches!(self.mode, FilterMode::RawText(_))
    }

    /// Switch to raw-text editing with `text`
    pub fn set_raw_text(&mut self, text: impl Into<String>) {
        self.mode = FilterMode::RawText(text.into());
    }

    /// Back to row editing, keeping the current rows
    pub fn use_rows(&mut self) {
        self.mode = FilterMode::Rows;
    }

    /// The expression to store on the rule; `None` is the null filter
    pub fn expression(&self) -> Option<String> {
        match &self.mode {
            FilterMode::Rows => compile(self.rows.as_slice()),
            FilterMode::RawText(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
        }
    }
}
