//! Filter evaluation and ordering over JSON rows.
//!
//! Comparisons follow PostgreSQL three-valued logic: any comparison involving
//! NULL is not true, so `Ne` never matches a NULL column. Ordering puts NULLs
//! last ascending and first descending.

use crate::query_builder::{LogicalOperator, QueryCondition, QueryFilter, QueryOperator, SortOrder};
use crate::traits::Row;
use chrono::DateTime;
use serde_json::Value;
use std::cmp::Ordering;

/// Value of `field` in `row`; an `alias.` qualifier is ignored
pub fn field_value<'a>(row: &'a Row, field: &str) -> Option<&'a Value> {
    let column = field.rsplit('.').next().unwrap_or(field);
    row.get(column).filter(|v| !v.is_null())
}

pub fn matches(filter: &QueryFilter, row: &Row) -> bool {
    match filter {
        QueryFilter::Condition(condition) => matches_condition(condition, row),
        QueryFilter::Group { operator, filters } => match operator {
            LogicalOperator::And => filters.iter().all(|f| matches(f, row)),
            LogicalOperator::Or => filters.iter().any(|f| matches(f, row)),
        },
    }
}

pub fn matches_all(filters: &[QueryFilter], row: &Row) -> bool {
    filters.iter().all(|f| matches(f, row))
}

fn matches_condition(condition: &QueryCondition, row: &Row) -> bool {
    let actual = field_value(row, &condition.field);

    match (&condition.operator, &condition.value) {
        (QueryOperator::IsNull, _) | (QueryOperator::Eq, None) => actual.is_none(),
        (QueryOperator::IsNotNull, _) | (QueryOperator::Ne, None) => actual.is_some(),
        (_, None) => false,
        (operator, Some(expected)) => {
            let Some(actual) = actual else {
                return false;
            };
            if expected.is_null() {
                return false;
            }
            match operator {
                QueryOperator::Eq => values_equal(actual, expected),
                QueryOperator::Ne => !values_equal(actual, expected),
                QueryOperator::Gt => compare_values(actual, expected) == Some(Ordering::Greater),
                QueryOperator::Gte => matches!(
                    compare_values(actual, expected),
                    Some(Ordering::Greater | Ordering::Equal)
                ),
                QueryOperator::Lt => compare_values(actual, expected) == Some(Ordering::Less),
                QueryOperator::Lte => matches!(
                    compare_values(actual, expected),
                    Some(Ordering::Less | Ordering::Equal)
                ),
                QueryOperator::Like | QueryOperator::ILike => match (actual, expected) {
                    (Value::String(text), Value::String(pattern)) => like_match(
                        text,
                        pattern,
                        *operator == QueryOperator::ILike,
                    ),
                    _ => false,
                },
                QueryOperator::In => match expected {
                    Value::Array(items) => items.iter().any(|i| values_equal(actual, i)),
                    _ => false,
                },
                QueryOperator::NotIn => match expected {
                    Value::Array(items) => !items.iter().any(|i| values_equal(actual, i)),
                    _ => true,
                },
                QueryOperator::IsNull | QueryOperator::IsNotNull => false,
            }
        }
    }
}

/// Equality the way PostgreSQL compares the typed column: numbers by value,
/// timestamps by instant, UUIDs case-insensitively.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Some(Ordering::Equal),
        (Value::String(x), Value::String(y)) => {
            x == y
                || ((is_timestamp(x) || is_uuid(x))
                    && compare_values(a, b) == Some(Ordering::Equal))
        }
        _ => a == b,
    }
}

fn is_timestamp(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
}

fn is_uuid(text: &str) -> bool {
    uuid::Uuid::parse_str(text).is_ok()
}

/// Ordering of two non-null values of the same kind; `None` when incomparable
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => Some(i.cmp(&j)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::String(x), Value::String(y)) => {
            if let (Ok(dx), Ok(dy)) = (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                return Some(dx.cmp(&dy));
            }
            if let (Ok(ux), Ok(uy)) = (uuid::Uuid::parse_str(x), uuid::Uuid::parse_str(y)) {
                return Some(ux.cmp(&uy));
            }
            Some(x.cmp(y))
        }
        _ => None,
    }
}

/// SQL LIKE: `%` matches any run, `_` one character, `\` escapes the next one
pub fn like_match(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    let fold = |s: &str| -> Vec<char> {
        if case_insensitive {
            s.to_lowercase().chars().collect()
        } else {
            s.chars().collect()
        }
    };
    let text = fold(text);

    enum Token {
        Any,
        One,
        Char(char),
    }
    let mut tokens = Vec::new();
    let mut chars = fold(pattern).into_iter();
    while let Some(c) = chars.next() {
        match c {
            '%' => tokens.push(Token::Any),
            '_' => tokens.push(Token::One),
            '\\' => tokens.push(Token::Char(chars.next().unwrap_or('\\'))),
            other => tokens.push(Token::Char(other)),
        }
    }

    // Iterative wildcard match with single backtrack point
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < text.len() {
        match tokens.get(p) {
            Some(Token::Any) => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(Token::One) => {
                t += 1;
                p += 1;
            }
            Some(Token::Char(c)) if *c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((bp, bt)) => {
                    p = bp + 1;
                    t = bt + 1;
                    backtrack = Some((bp, bt + 1));
                }
                None => return false,
            },
        }
    }
    tokens[p..].iter().all(|token| matches!(token, Token::Any))
}

/// Compare two rows by the given columns. NULL sorts as larger than every
/// value, so it lands last ascending and first descending.
pub fn compare_rows(a: &Row, b: &Row, order_by: &[(String, SortOrder)]) -> Ordering {
    for (field, order) in order_by {
        let ordering = match (field_value(a, field), field_value(b, field)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
        };
        let ordering = match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Stable sort
pub fn sort_rows(rows: &mut [Row], order_by: &[(String, SortOrder)]) {
    if order_by.is_empty() {
        return;
    }
    rows.sort_by(|a, b| compare_rows(a, b, order_by));
}
