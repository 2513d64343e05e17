//! Filter data model: predicate rows and the filter tree

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Comparator {
    /// Equal (=)
    #[default]
    Eq,
    /// Not equal (!=)
    Neq,
    /// Less than (<)
    Lt,
    /// Greater than (>)
    Gt,
    /// Less than or equal (<=)
    Lte,
    /// Greater than or equal (>=)
    Gte,
    /// Inclusive range (BETWEEN lo AND hi)
    Between,
    /// Wildcard match (LIKE)
    Like,
    /// Case-insensitive wildcard match (ILIKE)
    Ilike,
    /// Null check (IS NULL)
    IsNull,
}

impl Comparator {
    pub const ALL: [Comparator; 10] = [
        Comparator::Eq,
        Comparator::Neq,
        Comparator::Lt,
        Comparator::Gt,
        Comparator::Lte,
        Comparator::Gte,
        Comparator::Between,
        Comparator::Like,
        Comparator::Ilike,
        Comparator::IsNull,
    ];

    /// Canonical CQL spelling
    pub fn as_cql(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Neq => "!=",
            Comparator::Lt => "<",
            Comparator::Gt => ">",
            Comparator::Lte => "<=",
            Comparator::Gte => ">=",
            Comparator::Between => "BETWEEN",
            Comparator::Like => "LIKE",
            Comparator::Ilike => "ILIKE",
            Comparator::IsNull => "IS NULL",
        }
    }

    /// Enum name as used in row JSON (`EQ`, `IS_NULL`, ...)
    pub fn name(self) -> &'static str {
        match self {
            Comparator::Eq => "EQ",
            Comparator::Neq => "NEQ",
            Comparator::Lt => "LT",
            Comparator::Gt => "GT",
            Comparator::Lte => "LTE",
            Comparator::Gte => "GTE",
            Comparator::Between => "BETWEEN",
            Comparator::Like => "LIKE",
            Comparator::Ilike => "ILIKE",
            Comparator::IsNull => "IS_NULL",
        }
    }

    /// Inverse of [`Comparator::name`], case-insensitive
    pub fn from_name(name: &str) -> Option<Comparator> {
        Comparator::ALL
            .into_iter()
            .find(|cmp| cmp.name().eq_ignore_ascii_case(name))
    }

    /// Map a wire-level operator token to a comparator.
    ///
    /// Accepts the canonical spellings plus the filter-object aliases
    /// `==`, `..` and `~`. Keywords are matched case-insensitively.
    pub fn from_token(token: &str) -> Option<Comparator> {
        let cmp = match token {
            "=" | "==" => Comparator::Eq,
            "!=" | "<>" => Comparator::Neq,
            "<" => Comparator::Lt,
            ">" => Comparator::Gt,
            "<=" => Comparator::Lte,
            ">=" => Comparator::Gte,
            ".." => Comparator::Between,
            "~" => Comparator::Like,
            other => match other.to_ascii_uppercase().as_str() {
                "BETWEEN" => Comparator::Between,
                "LIKE" => Comparator::Like,
                "ILIKE" => Comparator::Ilike,
                "IS NULL" | "NULL" => Comparator::IsNull,
                _ => return None,
            },
        };
        Some(cmp)
    }
}

/// Boolean operator joining a row to the next one.
/// `None` terminates the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Connective {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
    /// AND NOT: negates the following row
    #[serde(rename = "NOT")]
    Not,
}

impl Connective {
    pub fn is_none(self) -> bool {
        matches!(self, Connective::None)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Connective::None => "",
            Connective::And => "AND",
            Connective::Or => "OR",
            Connective::Not => "NOT",
        }
    }

    /// Case-insensitive parse; the empty string is `None`
    pub fn parse(text: &str) -> Option<Connective> {
        match text.trim().to_ascii_uppercase().as_str() {
            "" => Some(Connective::None),
            "AND" => Some(Connective::And),
            "OR" => Some(Connective::Or),
            "NOT" => Some(Connective::Not),
            _ => None,
        }
    }
}

/// A single editable condition
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PredicateRow {
    /// Empty means an unset placeholder row
    pub attribute: String,
    pub comparator: Comparator,
    /// `lo,hi` for BETWEEN, ignored for IS_NULL, otherwise the literal
    pub value: String,
    /// Operator joining this row to the next
    pub connective: Connective,
}

impl PredicateRow {
    pub fn new(
        attribute: impl Into<String>,
        comparator: Comparator,
        value: impl Into<String>,
        connective: Connective,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            comparator,
            value: value.into(),
            connective,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.attribute.is_empty()
    }
}

/// Logical operators in the filter tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_cql(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Literal(String),
    Range { lower: String, upper: String },
    Null,
}

/// Single comparison like `pop > '10'`
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub attribute: String,
    pub comparator: Comparator,
    pub value: FilterValue,
}

impl Comparison {
    /// Row-level value encoding (`lo,hi` for ranges, empty for null checks)
    pub fn row_value(&self) -> String {
        match &self.value {
            FilterValue::Literal(v) => v.clone(),
            FilterValue::Range { lower, upper } => format!("{},{}", lower, upper),
            FilterValue::Null => String::new(),
        }
    }
}

/// Filter tree node
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Comparison(Comparison),
    Logical {
        op: LogicalOp,
        left: Box<FilterNode>,
        right: Box<FilterNode>,
    },
    Not(Box<FilterNode>),
}

impl FilterNode {
    pub fn and(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Logical {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn negate(inner: FilterNode) -> Self {
        FilterNode::Not(Box::new(inner))
    }

    /// Number of comparisons in the tree
    pub fn comparison_count(&self) -> usize {
        let mut count = 0;
        let mut pending: SmallVec<[&FilterNode; 8]> = SmallVec::new();
        pending.push(self);

        while let Some(node) = pending.pop() {
            match node {
                FilterNode::Comparison(_) => count += 1,
                FilterNode::Logical { left, right, .. } => {
                    pending.push(left);
                    pending.push(right);
                }
                FilterNode::Not(inner) => pending.push(inner),
            }
        }
        count
    }

    /// Split a left-leaning chain into its first operand and the
    /// `(op, right operand)` links that follow it, in source order
    pub fn chain(&self) -> (&FilterNode, SmallVec<[(LogicalOp, &FilterNode); 8]>) {
        let mut links = SmallVec::new();
        let mut head = self;
        while let FilterNode::Logical { op, left, right } = head {
            links.push((*op, right.as_ref()));
            head = left;
        }
        links.reverse();
        (head, links)
    }
}
