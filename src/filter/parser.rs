//! CQL filter text parser

use smallvec::SmallVec;

use crate::error::{Result, StyleError};
use crate::filter::ast::{
    Comparator, Comparison, Connective, FilterNode, FilterValue, LogicalOp, PredicateRow,
};

const KEYWORDS: [&str; 8] = ["AND", "OR", "NOT", "BETWEEN", "LIKE", "ILIKE", "IS", "NULL"];

/// Operator symbols, longest first
const SYMBOLS: [&str; 9] = ["==", "!=", "<>", "<=", ">=", "=", "<", ">", "~"];

/// Deepest parenthesis/NOT nesting accepted
pub const MAX_NESTING: usize = 256;

/// Most comparisons accepted in one filter
pub const MAX_PREDICATES: usize = 256;

/// Readings tried when backslash-quote runs make literal ends ambiguous
const MAX_READINGS: usize = 256;

/// Ambiguous literals open at once while trying readings
const MAX_BRANCHES: usize = 64;

pub(crate) fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|kw| kw.eq_ignore_ascii_case(word))
}

/// Whether `bound` can be written unquoted as a BETWEEN bound and read back
/// unchanged, including through the `lo,hi` row encoding
pub(crate) fn is_bare_bound(bound: &str) -> bool {
    !bound.is_empty()
        && !is_keyword(bound)
        && bound.chars().all(|c| c != ',' && is_word_char(c))
}

/// Parse filter text into a filter tree.
///
/// Logical operators chain left-associatively with no precedence between
/// AND and OR; parentheses group explicitly. Nesting deeper than
/// [`MAX_NESTING`] or more than [`MAX_PREDICATES`] comparisons is
/// `ParseFailed`.
pub fn parse(expression: &str) -> Result<FilterNode> {
    let expression = expression.trim();
    if expression.is_empty() {
        return Err(StyleError::ParseFailed("Empty filter".to_string()));
    }

    let mut tokenizer = Tokenizer {
        expression,
        readings: 0,
        branches: 0,
    };
    tokenizer.parse_from(0, Tokens::new())
}

/// Parse filter text into predicate rows.
///
/// Only trees the row editor can represent are accepted: a left-leaning chain
/// whose right operands are single comparisons (or `AND NOT` a comparison),
/// with BETWEEN bounds that survive the `lo,hi` encoding. Anything else is
/// `ParseFailed`.
pub fn parse_rows(expression: &str) -> Result<Vec<PredicateRow>> {
    let tree = parse(expression)?;
    to_rows(&tree)
}

/// Flatten a left-leaning filter tree into rows, in source order
pub fn to_rows(node: &FilterNode) -> Result<Vec<PredicateRow>> {
    let (head, links) = node.chain();
    let mut rows = Vec::with_capacity(links.len() + 1);

    match head {
        FilterNode::Comparison(cmp) => rows.push(comparison_row(cmp)?),
        _ => {
            return Err(StyleError::ParseFailed(
                "NOT without a preceding clause".to_string(),
            ))
        }
    }

    for (op, right) in links {
        let (connective, cmp) = match (op, right) {
            (LogicalOp::And, FilterNode::Comparison(cmp)) => (Connective::And, cmp),
            (LogicalOp::Or, FilterNode::Comparison(cmp)) => (Connective::Or, cmp),
            (LogicalOp::And, FilterNode::Not(inner)) => match inner.as_ref() {
                FilterNode::Comparison(cmp) => (Connective::Not, cmp),
                _ => {
                    return Err(StyleError::ParseFailed(
                        "NOT applied to a group".to_string(),
                    ))
                }
            },
            (LogicalOp::Or, FilterNode::Not(_)) => {
                return Err(StyleError::ParseFailed("OR NOT is not supported".to_string()))
            }
            (_, FilterNode::Logical { .. }) => {
                return Err(StyleError::ParseFailed(
                    "Right-nested logical expression".to_string(),
                ))
            }
        };

        if let Some(last) = rows.last_mut() {
            last.connective = connective;
        }
        rows.push(comparison_row(cmp)?);
    }

    Ok(rows)
}

fn comparison_row(cmp: &Comparison) -> Result<PredicateRow> {
    if let FilterValue::Range { lower, upper } = &cmp.value {
        if let Some(bound) = [lower, upper].into_iter().find(|b| !is_bare_bound(b)) {
            return Err(StyleError::ParseFailed(format!(
                "BETWEEN bound {:?} on {} cannot be edited as a row",
                bound, cmp.attribute
            )));
        }
    }

    Ok(PredicateRow {
        attribute: cmp.attribute.clone(),
        comparator: cmp.comparator,
        value: cmp.row_value(),
        connective: Connective::None,
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Bare word: attribute, unquoted literal or keyword
    Word(String),
    /// Double-quoted attribute name
    Ident(String),
    /// Single-quoted literal, already unescaped
    Literal(String),
    Symbol(&'static str),
    OpenParen,
    CloseParen,
}

type Tokens = SmallVec<[Token; 16]>;

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '\'' | '"' | '=' | '!' | '<' | '>' | '~')
}

/// Tokenizes and parses together.
///
/// A backslash run before a quote is either an escaped quote or a literal
/// that ends in backslashes. Each such quote that could end the literal opens
/// a branch; ending the literal is tried first and the first reading that
/// parses wins.
struct Tokenizer<'a> {
    expression: &'a str,
    readings: usize,
    branches: usize,
}

impl<'a> Tokenizer<'a> {
    fn parse_from(&mut self, mut pos: usize, mut tokens: Tokens) -> Result<FilterNode> {
        let expression = self.expression;

        while let Some(c) = expression[pos..].chars().next() {
            match c {
                c if c.is_whitespace() => pos += c.len_utf8(),
                '(' => {
                    tokens.push(Token::OpenParen);
                    pos += 1;
                }
                ')' => {
                    tokens.push(Token::CloseParen);
                    pos += 1;
                }
                '\'' => {
                    let mut readings = read_literal(expression, pos + 1)?;
                    if readings.len() > 1 {
                        return self.branch(readings, tokens);
                    }
                    if let Some((value, end)) = readings.pop() {
                        tokens.push(Token::Literal(value));
                        pos = end;
                    }
                }
                '"' => {
                    let (ident, end) = read_quoted_ident(expression, pos + 1)?;
                    tokens.push(Token::Ident(ident));
                    pos = end;
                }
                '=' | '!' | '<' | '>' | '~' => {
                    let rest = &expression[pos..];
                    let symbol = SYMBOLS
                        .iter()
                        .find(|s| rest.starts_with(**s))
                        .ok_or_else(|| {
                            StyleError::ParseFailed(format!("Unknown operator at: {}", rest))
                        })?;
                    tokens.push(Token::Symbol(*symbol));
                    pos += symbol.len();
                }
                _ => {
                    let rest = &expression[pos..];
                    let len = rest.find(|c| !is_word_char(c)).unwrap_or(rest.len());
                    tokens.push(Token::Word(rest[..len].to_string()));
                    pos += len;
                }
            }
        }

        self.readings += 1;
        if self.readings > MAX_READINGS {
            return Err(StyleError::ParseFailed(format!(
                "Too many ambiguous quotes in: {}",
                expression
            )));
        }
        parse_tokens(&tokens, expression)
    }

    fn branch(&mut self, readings: Vec<(String, usize)>, tokens: Tokens) -> Result<FilterNode> {
        self.branches += 1;
        if self.branches > MAX_BRANCHES {
            return Err(StyleError::ParseFailed(format!(
                "Too many ambiguous quotes in: {}",
                self.expression
            )));
        }

        let mut last_error = None;
        for (value, end) in readings {
            let mut branch = tokens.clone();
            branch.push(Token::Literal(value));
            match self.parse_from(end, branch) {
                Ok(node) => return Ok(node),
                Err(e) => last_error = Some(e),
            }
        }
        self.branches -= 1;

        Err(last_error.unwrap_or_else(|| {
            StyleError::ParseFailed(format!("Unterminated literal in: {}", self.expression))
        }))
    }
}

fn parse_tokens(tokens: &[Token], expression: &str) -> Result<FilterNode> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        predicates: 0,
    };
    let node = parser.parse_expression()?;

    if let Some(token) = parser.peek() {
        return Err(StyleError::ParseFailed(format!(
            "Unexpected token {:?} in: {}",
            token, expression
        )));
    }
    Ok(node)
}

/// Whether a quote followed by `rest` can close a literal: the filter ends,
/// a group closes or the next connective follows
fn can_close(rest: &str) -> bool {
    let rest = rest.trim_start();
    if rest.is_empty() || rest.starts_with(')') {
        return true;
    }
    ["AND", "OR"].iter().any(|kw| {
        rest.get(..kw.len()).is_some_and(|head| head.eq_ignore_ascii_case(kw))
            && rest[kw.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_whitespace() || c == '(')
    })
}

/// Read a single-quoted literal starting after its opening quote.
///
/// A run of `n` backslashes before a quote is an escaped quote: one or two
/// backslashes (`\'`, or the double-escaped `\\'`) stand for the quote alone,
/// longer runs keep `n - 2` backslashes in front of it. SQL-style `''` is
/// also a quote. Returns every way the literal can end, as `(value, end)`,
/// earliest first; the last entry is an unescaped closing quote if any.
fn read_literal(expression: &str, start: usize) -> Result<Vec<(String, usize)>> {
    let mut readings = Vec::new();
    let mut value = String::new();
    let mut chars = expression[start..].char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => {
                let mut run = 1;
                while chars.next_if(|&(_, c)| c == '\\').is_some() {
                    run += 1;
                }
                match chars.next_if(|&(_, c)| c == '\'') {
                    Some((quote, _)) => {
                        let end = start + quote + 1;
                        if can_close(&expression[end..]) {
                            let mut closed = value.clone();
                            closed.extend(std::iter::repeat('\\').take(run));
                            readings.push((closed, end));
                        }
                        value.extend(std::iter::repeat('\\').take(run.saturating_sub(2)));
                        value.push('\'');
                    }
                    None => value.extend(std::iter::repeat('\\').take(run)),
                }
            }
            '\'' => {
                if chars.next_if(|&(_, c)| c == '\'').is_some() {
                    value.push('\'');
                } else {
                    readings.push((value, start + offset + 1));
                    return Ok(readings);
                }
            }
            _ => value.push(c),
        }
    }

    if readings.is_empty() {
        return Err(StyleError::ParseFailed(format!(
            "Unterminated literal in: {}",
            expression
        )));
    }
    Ok(readings)
}

fn read_quoted_ident(expression: &str, start: usize) -> Result<(String, usize)> {
    let mut ident = String::new();
    let mut chars = expression[start..].char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        if c == '"' {
            if chars.next_if(|&(_, c)| c == '"').is_some() {
                ident.push('"');
                continue;
            }
            return Ok((ident, start + offset + 1));
        }
        ident.push(c);
    }

    Err(StyleError::ParseFailed(format!(
        "Unterminated identifier in: {}",
        expression
    )))
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    predicates: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }

    fn unexpected(&self, expected: &str) -> StyleError {
        match self.peek() {
            Some(token) => StyleError::ParseFailed(format!(
                "Expected {} but found {:?}",
                expected, token
            )),
            None => StyleError::ParseFailed(format!("Expected {} but input ended", expected)),
        }
    }

    fn parse_expression(&mut self) -> Result<FilterNode> {
        let mut left = self.parse_unary()?;

        loop {
            let op = if self.peek_keyword("AND") {
                LogicalOp::And
            } else if self.peek_keyword("OR") {
                LogicalOp::Or
            } else {
                return Ok(left);
            };
            self.pos += 1;

            let right = self.parse_unary()?;
            left = FilterNode::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<FilterNode> {
        let nested = self.peek_keyword("NOT") || matches!(self.peek(), Some(Token::OpenParen));
        if !nested {
            return self.parse_comparison().map(FilterNode::Comparison);
        }

        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(StyleError::ParseFailed(format!(
                "Filter nests deeper than {} levels",
                MAX_NESTING
            )));
        }

        let node = if self.peek_keyword("NOT") {
            self.pos += 1;
            FilterNode::negate(self.parse_unary()?)
        } else {
            self.pos += 1;
            let inner = self.parse_expression()?;
            match self.next() {
                Some(Token::CloseParen) => inner,
                _ => return Err(StyleError::ParseFailed("Unbalanced parentheses".to_string())),
            }
        };

        self.depth -= 1;
        Ok(node)
    }

    fn parse_comparison(&mut self) -> Result<Comparison> {
        self.predicates += 1;
        if self.predicates > MAX_PREDICATES {
            return Err(StyleError::ParseFailed(format!(
                "Filter has more than {} comparisons",
                MAX_PREDICATES
            )));
        }

        let attribute = match self.peek() {
            Some(Token::Word(w)) if !is_keyword(w) => w.clone(),
            Some(Token::Ident(name)) => name.clone(),
            _ => return Err(self.unexpected("attribute")),
        };
        self.pos += 1;

        let comparator = match self.next() {
            Some(Token::Symbol(symbol)) => Comparator::from_token(symbol),
            Some(Token::Word(w)) if w.eq_ignore_ascii_case("IS") => {
                self.expect_keyword("NULL")?;
                return Ok(Comparison {
                    attribute,
                    comparator: Comparator::IsNull,
                    value: FilterValue::Null,
                });
            }
            Some(Token::Word(w)) => Comparator::from_token(w),
            _ => None,
        };
        let comparator = match comparator {
            Some(cmp) if cmp != Comparator::IsNull => cmp,
            _ => {
                return Err(StyleError::ParseFailed(format!(
                    "Unsupported comparison on {}",
                    attribute
                )))
            }
        };

        let value = if comparator == Comparator::Between {
            let lower = self.parse_literal()?;
            self.expect_keyword("AND")?;
            let upper = self.parse_literal()?;
            FilterValue::Range { lower, upper }
        } else {
            FilterValue::Literal(self.parse_literal()?)
        };

        Ok(Comparison {
            attribute,
            comparator,
            value,
        })
    }

    fn parse_literal(&mut self) -> Result<String> {
        match self.peek() {
            Some(Token::Literal(value)) => {
                self.pos += 1;
                Ok(value.clone())
            }
            Some(Token::Word(w)) if !is_keyword(w) => {
                self.pos += 1;
                Ok(w.clone())
            }
            _ => Err(self.unexpected("literal")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(attr: &str, cmp: Comparator, value: &str, conn: Connective) -> PredicateRow {
        PredicateRow::new(attr, cmp, value, conn)
    }

    #[test]
    fn test_parse_simple_comparison() {
        let node = parse("pop > '10'").unwrap();
        match node {
            FilterNode::Comparison(cmp) => {
                assert_eq!(cmp.attribute, "pop");
                assert_eq!(cmp.comparator, Comparator::Gt);
                assert_eq!(cmp.value, FilterValue::Literal("10".to_string()));
            }
            _ => panic!("Expected comparison"),
        }
    }

    #[test]
    fn test_parse_all_comparators() {
        let cases = [
            ("a = 'x'", Comparator::Eq),
            ("a == 'x'", Comparator::Eq),
            ("a != 'x'", Comparator::Neq),
            ("a <> 'x'", Comparator::Neq),
            ("a < 'x'", Comparator::Lt),
            ("a > 'x'", Comparator::Gt),
            ("a <= 'x'", Comparator::Lte),
            ("a >= 'x'", Comparator::Gte),
            ("a LIKE 'x%'", Comparator::Like),
            ("a ~ 'x%'", Comparator::Like),
            ("a ilike 'x%'", Comparator::Ilike),
            ("a BETWEEN 1 AND 2", Comparator::Between),
            ("a .. 1 AND 2", Comparator::Between),
            ("a IS NULL", Comparator::IsNull),
        ];

        for (text, expected) in cases {
            let rows = parse_rows(text).unwrap();
            assert_eq!(rows.len(), 1, "Failed for: {}", text);
            assert_eq!(rows[0].comparator, expected, "Failed for: {}", text);
        }
    }

    #[test]
    fn test_parse_rows_two_row_chain() {
        let rows = parse_rows("a = '1' AND b > '5'").unwrap();
        assert_eq!(
            rows,
            vec![
                row("a", Comparator::Eq, "1", Connective::And),
                row("b", Comparator::Gt, "5", Connective::None),
            ]
        );
    }

    #[test]
    fn test_parse_between_value() {
        let rows = parse_rows("pop BETWEEN 10 AND 20").unwrap();
        assert_eq!(rows, vec![row("pop", Comparator::Between, "10,20", Connective::None)]);
    }

    #[test]
    fn test_between_and_chain() {
        let rows = parse_rows("pop BETWEEN 10 AND 20 and kind = 'city'").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, "10,20");
        assert_eq!(rows[0].connective, Connective::And);
        assert_eq!(rows[1].value, "city");
    }

    #[test]
    fn test_escaped_quotes() {
        let rows = parse_rows("name = 'O\\'Brien'").unwrap();
        assert_eq!(rows[0].value, "O'Brien");

        let double = parse_rows("name = 'O\\\\'Brien'").unwrap();
        assert_eq!(double[0].value, "O'Brien");

        let sql = parse_rows("name = 'O''Brien'").unwrap();
        assert_eq!(sql[0].value, "O'Brien");

        let plain = parse_rows("path = 'C:\\dir'").unwrap();
        assert_eq!(plain[0].value, "C:\\dir");
    }

    #[test]
    fn test_not_connective() {
        let rows = parse_rows("a = '1' AND NOT b = '2' or c IS NULL").unwrap();
        assert_eq!(
            rows,
            vec![
                row("a", Comparator::Eq, "1", Connective::Not),
                row("b", Comparator::Eq, "2", Connective::Or),
                row("c", Comparator::IsNull, "", Connective::None),
            ]
        );
    }

    #[test]
    fn test_left_grouping_is_accepted() {
        let rows = parse_rows("(a = '1' OR b = '2') AND c = '3'").unwrap();
        assert_eq!(rows[0].connective, Connective::Or);
        assert_eq!(rows[1].connective, Connective::And);
        assert_eq!(rows[2].connective, Connective::None);
    }

    #[test]
    fn test_right_nested_fails() {
        let text = "a = '1' AND (b = '2' AND c = '3')";
        assert!(parse(text).is_ok());
        assert!(matches!(parse_rows(text), Err(StyleError::ParseFailed(_))));
    }

    #[test]
    fn test_unrepresentable_shapes_fail() {
        for text in [
            "NOT a = '1'",
            "a = '1' OR NOT b = '2'",
            "a = '1' AND NOT (b = '2' OR c = '3')",
        ] {
            assert!(parse_rows(text).is_err(), "Expected failure for: {}", text);
        }
    }

    #[test]
    fn test_invalid_text_fails() {
        for text in [
            "",
            "   ",
            "a",
            "a = ",
            "a = 'open",
            "(a = '1'",
            "a = '1')",
            "a IS NOT NULL",
            "a ! 'x'",
            "a = '1' XOR b = '2'",
            "INTERSECTS(the_geom, POINT(1 2))",
        ] {
            assert!(
                matches!(parse_rows(text), Err(StyleError::ParseFailed(_))),
                "Expected failure for: {:?}",
                text
            );
        }
    }

    #[test]
    fn test_unquoted_and_quoted_identifiers() {
        let rows = parse_rows("\"land use\" = residential AND pop >= 100").unwrap();
        assert_eq!(rows[0].attribute, "land use");
        assert_eq!(rows[0].value, "residential");
        assert_eq!(rows[1].value, "100");
    }

    #[test]
    fn test_between_bounds_that_need_quotes_fail() {
        for text in [
            "pop BETWEEN '1,5' AND '2'",
            "d BETWEEN '2020-01-01 00:00' AND '2021-01-01 00:00'",
            "a BETWEEN 'and' AND 'z'",
            "a BETWEEN '(1' AND '2'",
            "a BETWEEN 'it''s' AND 'z'",
        ] {
            assert!(parse(text).is_ok(), "Expected tree for: {}", text);
            assert!(
                matches!(parse_rows(text), Err(StyleError::ParseFailed(_))),
                "Expected failure for: {}",
                text
            );
        }

        // Quoted bounds that are plain words are fine
        let rows = parse_rows("d BETWEEN '2020-01-01' AND '2021-01-01'").unwrap();
        assert_eq!(rows[0].value, "2020-01-01,2021-01-01");
    }

    #[test]
    fn test_quoted_between_bounds_display_quoted() {
        let text = "d BETWEEN '2020-01-01 00:00' AND 5";
        let node = parse(text).unwrap();
        assert_eq!(node.to_string(), text);
        assert_eq!(parse(&node.to_string()).unwrap(), node);
    }

    #[test]
    fn test_trailing_backslash_closes_literal() {
        let rows = parse_rows("path = 'C:\\'").unwrap();
        assert_eq!(rows, vec![row("path", Comparator::Eq, "C:\\", Connective::None)]);

        let rows = parse_rows("a = '\\' OR b = '\\'").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, "\\");
        assert_eq!(rows[1].value, "\\");

        let rows = parse_rows("(a = 'x\\') AND b = 'it\\'s\\'").unwrap();
        assert_eq!(rows[0].value, "x\\");
        assert_eq!(rows[1].value, "it's\\");
    }

    #[test]
    fn test_backslash_before_quote_run_lengths() {
        let rows = parse_rows("a = 'x\\\\\\'y'").unwrap();
        assert_eq!(rows[0].value, "x\\'y");

        let rows = parse_rows("a = 'x\\\\'y'").unwrap();
        assert_eq!(rows[0].value, "x'y");
    }

    #[test]
    fn test_deep_nesting_fails_cleanly() {
        let depth = 2000;
        let text = format!("{}a = '1'{}", "(".repeat(depth), ")".repeat(depth));
        assert!(matches!(parse(&text), Err(StyleError::ParseFailed(_))));

        let nots = format!("{}a = '1'", "NOT ".repeat(depth));
        assert!(matches!(parse(&nots), Err(StyleError::ParseFailed(_))));

        let shallow = format!("{}a = '1'{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(parse(&shallow).is_ok());
    }

    #[test]
    fn test_long_chain_fails_cleanly() {
        let clause = |n: usize| vec!["a = '1'"; n].join(" AND ");

        assert!(matches!(
            parse_rows(&clause(5000)),
            Err(StyleError::ParseFailed(_))
        ));
        assert_eq!(parse_rows(&clause(MAX_PREDICATES)).unwrap().len(), MAX_PREDICATES);
    }
}
