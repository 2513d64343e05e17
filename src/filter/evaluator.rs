//! Filter evaluation against feature properties

use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::filter::ast::{Comparator, Comparison, FilterNode, FilterValue, LogicalOp};
use crate::filter::cache::PatternCache;

/// Feature attribute map, as found in a GeoJSON `properties` member
pub type Properties = Map<String, Value>;

/// Evaluate a filter tree against a feature's properties
pub fn check(node: &FilterNode, properties: &Properties, patterns: &mut PatternCache) -> bool {
    let (head, links) = node.chain();
    let mut result = check_operand(head, properties, patterns);

    for (op, right) in links {
        result = match op {
            LogicalOp::And => result && check_operand(right, properties, patterns),
            LogicalOp::Or => result || check_operand(right, properties, patterns),
        };
    }
    result
}

fn check_operand(node: &FilterNode, properties: &Properties, patterns: &mut PatternCache) -> bool {
    match node {
        FilterNode::Comparison(cmp) => check_comparison(cmp, properties, patterns),
        FilterNode::Logical { .. } => check(node, properties, patterns),
        FilterNode::Not(inner) => !check_operand(inner, properties, patterns),
    }
}

fn check_comparison(cmp: &Comparison, properties: &Properties, patterns: &mut PatternCache) -> bool {
    let actual = properties.get(&cmp.attribute).filter(|v| !v.is_null());

    if cmp.comparator == Comparator::IsNull {
        return actual.is_none();
    }
    let Some(actual) = actual else {
        return false;
    };

    match (&cmp.value, cmp.comparator) {
        (FilterValue::Range { lower, upper }, _) => {
            matches!(compare(actual, lower), Some(Ordering::Greater | Ordering::Equal))
                && matches!(compare(actual, upper), Some(Ordering::Less | Ordering::Equal))
        }
        (FilterValue::Literal(pattern), Comparator::Like | Comparator::Ilike) => {
            let Some(text) = as_text(actual) else {
                return false;
            };
            patterns.is_match(pattern, cmp.comparator == Comparator::Ilike, &text)
        }
        (FilterValue::Literal(literal), comparator) => {
            let Some(ordering) = compare(actual, literal) else {
                return false;
            };
            match comparator {
                Comparator::Eq => ordering == Ordering::Equal,
                Comparator::Neq => ordering != Ordering::Equal,
                Comparator::Lt => ordering == Ordering::Less,
                Comparator::Gt => ordering == Ordering::Greater,
                Comparator::Lte => ordering != Ordering::Greater,
                Comparator::Gte => ordering != Ordering::Less,
                _ => false,
            }
        }
        (FilterValue::Null, _) => false,
    }
}

/// Numeric ordering when both sides are numeric, string ordering otherwise
fn compare(actual: &Value, literal: &str) -> Option<Ordering> {
    if let (Some(a), Ok(b)) = (as_number(actual), literal.trim().parse::<f64>()) {
        return a.partial_cmp(&b);
    }
    as_text(actual).map(|text| text.as_ref().cmp(literal))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parser::parse;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        match value {
            Value::Object(map) => map,
            _ => panic!("Expected object"),
        }
    }

    fn eval(filter: &str, value: Value) -> bool {
        let node = parse(filter).unwrap();
        check(&node, &props(value), &mut PatternCache::default())
    }

    #[test]
    fn test_numeric_comparison() {
        let feature = json!({"pop": 1500, "area": "12.5"});
        assert!(eval("pop > '1000'", feature.clone()));
        assert!(eval("pop >= 1500", feature.clone()));
        assert!(!eval("pop < 1000", feature.clone()));
        assert!(eval("area <= 12.5", feature.clone()));
        // Numeric, not lexicographic: "9" < "10"
        assert!(eval("pop > '900'", feature));
    }

    #[test]
    fn test_string_comparison() {
        let feature = json!({"name": "O'Brien", "kind": "city"});
        assert!(eval("name = 'O\\'Brien'", feature.clone()));
        assert!(eval("kind != 'town'", feature.clone()));
        assert!(eval("kind < 'town'", feature));
    }

    #[test]
    fn test_between_inclusive() {
        let feature = json!({"pop": 20});
        assert!(eval("pop BETWEEN 10 AND 20", feature.clone()));
        assert!(!eval("pop BETWEEN 21 AND 30", feature));
    }

    #[test]
    fn test_like_and_ilike() {
        let feature = json!({"name": "Springfield"});
        assert!(eval("name LIKE 'Spring%'", feature.clone()));
        assert!(eval("name LIKE '_pringfiel_'", feature.clone()));
        assert!(!eval("name LIKE 'spring%'", feature.clone()));
        assert!(eval("name ILIKE 'spring%'", feature.clone()));
        // Regex metacharacters are literal
        assert!(!eval("name LIKE 'S.*'", feature));
    }

    #[test]
    fn test_null_handling() {
        let feature = json!({"a": null, "b": 1});
        assert!(eval("a IS NULL", feature.clone()));
        assert!(eval("missing IS NULL", feature.clone()));
        assert!(!eval("b IS NULL", feature.clone()));
        assert!(!eval("missing = '1'", feature.clone()));
        assert!(!eval("a != '1'", feature));
    }

    #[test]
    fn test_logical_chain_is_left_associative() {
        // (a OR b) AND c
        let feature = json!({"a": 1, "b": 0, "c": 0});
        assert!(!eval("a = 1 OR b = 1 AND c = 1", feature.clone()));
        assert!(eval("a = 1 OR (b = 1 AND c = 1)", feature.clone()));
        assert!(eval("a = 1 AND NOT b = 1", feature));
    }
}
