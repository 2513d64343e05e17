//! Structural checks run when a style is loaded

use ahash::AHashSet;

use crate::error::{Result, StyleError};
use crate::style::{Rule, Style};

/// Validate a style.
///
/// Filters are not parsed here: text the row editor cannot
/// represent still has to load so it can be edited as raw text.
pub fn validate(style: &Style) -> Result<()> {
    if style.name.trim().is_empty() {
        return Err(StyleError::InvalidStyle("style name is empty".to_string()));
    }

    let mut seen = AHashSet::with_capacity(style.rules.len());
    for rule in &style.rules {
        validate_rule(rule)?;
        if !seen.insert(rule.name.as_str()) {
            return Err(StyleError::DuplicateRuleName(rule.name.clone()));
        }
    }
    Ok(())
}

fn validate_rule(rule: &Rule) -> Result<()> {
    if rule.name.is_empty() {
        return Err(StyleError::InvalidStyle("rule name is empty".to_string()));
    }

    if !rule.max_scale.is_finite() || rule.max_scale < 0.0 {
        return Err(StyleError::InvalidStyle(format!(
            "rule {}: maxScale must be a non-negative number",
            rule.name
        )));
    }

    if let Some(min) = rule.min_scale {
        if !min.is_finite() || min < 0.0 {
            return Err(StyleError::InvalidStyle(format!(
                "rule {}: minScale must be a non-negative number",
                rule.name
            )));
        }
        if rule.max_scale > 0.0 && min > rule.max_scale {
            return Err(StyleError::InvalidStyle(format!(
                "rule {}: minScale {} exceeds maxScale {}",
                rule.name, min, rule.max_scale
            )));
        }
    }
    Ok(())
}
