//! Rule kinds and editor routing

use std::fmt;
use std::str::FromStr;

use crate::style::Rule;

/// How a new classification is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Empty rule edited by hand
    Manual,
    /// Classes over numeric intervals, built by the external classifier
    AutoInterval,
    /// One class per distinct value, built by the external classifier
    AutoUnique,
    RasterPalette,
    RasterCell,
}

impl RuleKind {
    pub fn is_automatic(self) -> bool {
        matches!(self, RuleKind::AutoInterval | RuleKind::AutoUnique)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RuleKind::Manual => "manual",
            RuleKind::AutoInterval => "auto-interval",
            RuleKind::AutoUnique => "auto-unique",
            RuleKind::RasterPalette => "raster-palette",
            RuleKind::RasterCell => "raster-cell",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(RuleKind::Manual),
            "auto-interval" => Ok(RuleKind::AutoInterval),
            "auto-unique" => Ok(RuleKind::AutoUnique),
            "raster-palette" => Ok(RuleKind::RasterPalette),
            "raster-cell" => Ok(RuleKind::RasterCell),
            other => Err(format!("Unknown rule kind: {}", other)),
        }
    }
}

/// Which editor handles a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorKind {
    Generic,
    RasterPalette,
    RasterCell,
}

impl EditorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EditorKind::Generic => "generic",
            EditorKind::RasterPalette => "raster-palette",
            EditorKind::RasterCell => "raster-cell",
        }
    }
}

/// Route a rule to its editor by inspecting its symbolizers.
///
/// A cell symbolizer anywhere in the list wins, even next to palette
/// symbolizers. Rules with neither go to the generic editor.
pub fn editor_for(rule: &Rule) -> EditorKind {
    if rule.has_cell_symbolizer() {
        EditorKind::RasterCell
    } else if rule.has_palette_symbolizer() {
        EditorKind::RasterPalette
    } else {
        EditorKind::Generic
    }
}
