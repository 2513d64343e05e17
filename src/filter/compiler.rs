//! Predicate rows to CQL text

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::filter::ast::{
    Comparator, Comparison, Connective, FilterNode, FilterValue, PredicateRow,
};
use crate::filter::parser::{is_bare_bound, is_keyword};

static PLAIN_IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.:]*$").expect("identifier pattern is valid")
});

/// Compile rows into CQL text.
///
/// Returns `None` (the null filter) when no row produces a clause.
pub fn compile(rows: &[PredicateRow]) -> Option<String> {
    build_tree(rows).map(|tree| tree.to_string())
}

/// Build the left-leaning filter tree encoded by `rows`.
///
/// Unset rows and malformed BETWEEN rows are skipped. Each clause joins the
/// chain with the connective of the row right before it; an empty connective
/// ends the chain. The value of an IS_NULL row is ignored.
pub fn build_tree(rows: &[PredicateRow]) -> Option<FilterNode> {
    let mut tree: Option<FilterNode> = None;

    for (index, row) in rows.iter().enumerate() {
        let joining = match index {
            0 => Connective::None,
            _ => rows[index - 1].connective,
        };
        if tree.is_some() && joining.is_none() {
            break;
        }

        let Some(comparison) = row_to_comparison(row, index) else {
            continue;
        };
        let node = FilterNode::Comparison(comparison);

        tree = Some(match tree {
            None => node,
            Some(left) => match joining {
                Connective::And => FilterNode::and(left, node),
                Connective::Or => FilterNode::or(left, node),
                Connective::Not => FilterNode::and(left, FilterNode::negate(node)),
                Connective::None => unreachable!("chain terminated above"),
            },
        });
    }

    tree
}

fn row_to_comparison(row: &PredicateRow, index: usize) -> Option<Comparison> {
    if row.is_unset() {
        return None;
    }

    let value = match row.comparator {
        Comparator::Between => match split_range(&row.value) {
            Some((lower, upper)) => FilterValue::Range { lower, upper },
            None => {
                debug!(index, value = %row.value, "skipping malformed BETWEEN row");
                return None;
            }
        },
        Comparator::IsNull => FilterValue::Null,
        _ => FilterValue::Literal(row.value.clone()),
    };

    Some(Comparison {
        attribute: row.attribute.clone(),
        comparator: row.comparator,
        value,
    })
}

/// Split `lo,hi` into trimmed bounds that can be written unquoted
pub(crate) fn split_range(value: &str) -> Option<(String, String)> {
    let (lower, upper) = value.split_once(',')?;
    let (lower, upper) = (lower.trim(), upper.trim());
    if !is_bare_bound(lower) || !is_bare_bound(upper) {
        return None;
    }
    Some((lower.to_string(), upper.to_string()))
}

/// Escape a literal for single-quoted output.
///
/// A quote becomes `\'`. Backslashes right before a quote are written two
/// extra times (`\\\'` for a backslash then a quote), so the parser can
/// tell them apart from the double-escaped `\\'` form.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    let mut backslashes = 0;

    for c in value.chars() {
        match c {
            '\\' => backslashes += 1,
            '\'' => {
                let run = if backslashes == 0 { 1 } else { backslashes + 2 };
                out.extend(std::iter::repeat('\\').take(run));
                out.push('\'');
                backslashes = 0;
            }
            _ => {
                out.extend(std::iter::repeat('\\').take(backslashes));
                out.push(c);
                backslashes = 0;
            }
        }
    }

    out.extend(std::iter::repeat('\\').take(backslashes));
    out
}

fn write_attribute(f: &mut fmt::Formatter<'_>, attribute: &str) -> fmt::Result {
    if PLAIN_IDENTIFIER.is_match(attribute) && !is_keyword(attribute) {
        f.write_str(attribute)
    } else {
        write!(f, "\"{}\"", attribute.replace('"', "\"\""))
    }
}

/// Bounds are unquoted unless they would not read back as one word
fn write_bound(f: &mut fmt::Formatter<'_>, bound: &str) -> fmt::Result {
    if is_bare_bound(bound) {
        f.write_str(bound)
    } else {
        write!(f, "'{}'", escape_literal(bound))
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_attribute(f, &self.attribute)?;
        match &self.value {
            FilterValue::Range { lower, upper } => {
                f.write_str(" BETWEEN ")?;
                write_bound(f, lower)?;
                f.write_str(" AND ")?;
                write_bound(f, upper)
            }
            FilterValue::Null => f.write_str(" IS NULL"),
            FilterValue::Literal(_) if self.comparator == Comparator::IsNull => {
                f.write_str(" IS NULL")
            }
            FilterValue::Literal(value) => write!(
                f,
                " {} '{}'",
                self.comparator.as_cql(),
                escape_literal(value)
            ),
        }
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (head, links) = self.chain();
        write_operand(f, head)?;
        for (op, right) in links {
            write!(f, " {} ", op.as_cql())?;
            write_operand(f, right)?;
        }
        Ok(())
    }
}

/// One chain operand; a logical operand is a group
fn write_operand(f: &mut fmt::Formatter<'_>, node: &FilterNode) -> fmt::Result {
    match node {
        FilterNode::Comparison(cmp) => fmt::Display::fmt(cmp, f),
        FilterNode::Logical { .. } => write!(f, "({})", node),
        FilterNode::Not(inner) => {
            f.write_str("NOT ")?;
            write_operand(f, inner)
        }
    }
}
