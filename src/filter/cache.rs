//! Parse and pattern caches for repeated filter evaluation

use ahash::AHashMap;
use regex::Regex;
use tracing::warn;

use crate::filter::ast::FilterNode;
use crate::filter::evaluator::{check, Properties};
use crate::filter::parser;
use crate::style::{Rule, Style};

/// Compiled LIKE/ILIKE patterns keyed by (pattern, case-insensitive)
#[derive(Debug, Default)]
pub struct PatternCache {
    patterns: AHashMap<(String, bool), Option<Regex>>,
}

impl PatternCache {
    /// Match `text` against a CQL wildcard pattern
    pub fn is_match(&mut self, pattern: &str, case_insensitive: bool, text: &str) -> bool {
        let key = (pattern.to_string(), case_insensitive);
        let regex = self
            .patterns
            .entry(key)
            .or_insert_with(|| Regex::new(&like_to_regex(pattern, case_insensitive)).ok());

        regex.as_ref().is_some_and(|re| re.is_match(text))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Translate `%` / `_` wildcards into an anchored regex.
/// A backslash makes the next character literal.
fn like_to_regex(pattern: &str, case_insensitive: bool) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str(if case_insensitive { "(?is)^" } else { "(?s)^" });

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(&next.to_string()));
                } else {
                    out.push_str(r"\\");
                }
            }
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
    }

    out.push('$');
    out
}

fn parse_or_warn(filter: &str) -> Option<FilterNode> {
    match parser::parse(filter) {
        Ok(node) => Some(node),
        Err(e) => {
            warn!(filter, error = %e, "filter does not parse, rule never matches");
            None
        }
    }
}

/// Matches features against the rules of a style.
///
/// Holds parsed filters and compiled patterns so repeated matching over many
/// features parses each filter once. Owned by the caller; nothing is global.
#[derive(Debug, Default)]
pub struct RuleMatcher {
    filters: AHashMap<String, Option<FilterNode>>,
    patterns: PatternCache,
}

impl RuleMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or parse a filter; `None` when the text does not parse
    pub fn get_or_parse(&mut self, filter: &str) -> Option<&FilterNode> {
        if !self.filters.contains_key(filter) {
            self.filters.insert(filter.to_string(), parse_or_warn(filter));
        }
        self.filters.get(filter).and_then(Option::as_ref)
    }

    /// Check one rule: scale range first, then filter (a null filter matches)
    pub fn rule_matches(&mut self, rule: &Rule, properties: &Properties, scale: Option<f64>) -> bool {
        if let Some(scale) = scale {
            if !rule.is_visible_at(scale) {
                return false;
            }
        }

        let Some(filter) = rule.filter.as_deref() else {
            return true;
        };
        if !self.filters.contains_key(filter) {
            self.filters.insert(filter.to_string(), parse_or_warn(filter));
        }

        let Self { filters, patterns } = self;
        filters
            .get(filter)
            .and_then(Option::as_ref)
            .is_some_and(|node| check(node, properties, patterns))
    }

    /// Every rule matching the feature, in style order.
    /// Rules are not exclusive: a feature can match several.
    pub fn matching_rules<'s>(
        &mut self,
        style: &'s Style,
        properties: &Properties,
        scale: Option<f64>,
    ) -> Vec<&'s Rule> {
        style
            .rules
            .iter()
            .filter(|rule| self.rule_matches(rule, properties, scale))
            .collect()
    }

    pub fn cached_filters(&self) -> usize {
        self.filters.len()
    }

    pub fn clear(&mut self) {
        self.filters.clear();
        self.patterns = PatternCache::default();
    }
}
