//! The Condition Evaluator (§4.7): a small boolean expression language
//! over an event-context JSON object, used by declarative hook rules
//! to decide whether they match.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single comparison operator. Operator/value type mismatches (e.g.
/// `gt` against a string) evaluate to `false` rather than erroring —
/// a malformed rule should no-op, not crash the thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than (numeric).
    Gt,
    /// Greater than or equal (numeric).
    Gte,
    /// Less than (numeric).
    Lt,
    /// Less than or equal (numeric).
    Lte,
    /// Value is one of an array of candidates.
    In,
    /// String contains substring, or array contains value.
    Contains,
    /// String starts with prefix.
    StartsWith,
    /// String ends with suffix.
    EndsWith,
    /// String matches a regular expression.
    Regex,
    /// Path resolves to something other than JSON null/missing.
    Exists,
}

/// A condition over an event-context object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// A single `{path, op, value}` clause.
    Clause {
        /// Dotted path into the context object (e.g. `error_category`, `extra.tool_name`).
        path: String,
        /// The comparison operator.
        op: Op,
        /// The value to compare against. Ignored for `exists`.
        #[serde(default)]
        value: Value,
    },
    /// All sub-conditions must hold.
    All {
        /// Sub-conditions, all of which must evaluate true.
        all: Vec<Condition>,
    },
    /// At least one sub-condition must hold.
    Any {
        /// Sub-conditions, at least one of which must evaluate true.
        any: Vec<Condition>,
    },
    /// Negates a sub-condition.
    Not {
        /// The sub-condition to negate.
        not: Box<Condition>,
    },
}

/// Resolve a dotted path (`"a.b.c"`) against a JSON object. Missing
/// segments resolve to `Value::Null` rather than an error.
fn resolve_path<'a>(context: &'a Value, path: &str) -> &'a Value {
    let mut current = context;
    for segment in path.split('.') {
        current = match current.get(segment) {
            Some(v) => v,
            None => return &Value::Null,
        };
    }
    current
}

fn as_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn compare_numeric(lhs: &Value, rhs: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (as_f64(lhs), as_f64(rhs)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Evaluate a condition against a context object. Never panics or
/// returns an error — a condition that can't be meaningfully applied
/// (type mismatch, missing path, bad regex) evaluates to `false`.
pub fn evaluate(condition: &Condition, context: &Value) -> bool {
    match condition {
        Condition::All { all } => all.iter().all(|c| evaluate(c, context)),
        Condition::Any { any } => any.iter().any(|c| evaluate(c, context)),
        Condition::Not { not } => !evaluate(not, context),
        Condition::Clause { path, op, value } => {
            let resolved = resolve_path(context, path);
            match op {
                Op::Exists => !resolved.is_null(),
                Op::Eq => resolved == value,
                Op::Ne => resolved != value,
                Op::Gt => compare_numeric(resolved, value, |a, b| a > b),
                Op::Gte => compare_numeric(resolved, value, |a, b| a >= b),
                Op::Lt => compare_numeric(resolved, value, |a, b| a < b),
                Op::Lte => compare_numeric(resolved, value, |a, b| a <= b),
                Op::In => match value.as_array() {
                    Some(candidates) => candidates.contains(resolved),
                    None => false,
                },
                Op::Contains => match (resolved.as_str(), value.as_str()) {
                    (Some(haystack), Some(needle)) => haystack.contains(needle),
                    _ => match resolved.as_array() {
                        Some(items) => items.contains(value),
                        None => false,
                    },
                },
                Op::StartsWith => match (resolved.as_str(), value.as_str()) {
                    (Some(haystack), Some(prefix)) => haystack.starts_with(prefix),
                    _ => false,
                },
                Op::EndsWith => match (resolved.as_str(), value.as_str()) {
                    (Some(haystack), Some(suffix)) => haystack.ends_with(suffix),
                    _ => false,
                },
                Op::Regex => match (resolved.as_str(), value.as_str()) {
                    (Some(haystack), Some(pattern)) => {
                        Regex::new(pattern).map(|re| re.is_match(haystack)).unwrap_or(false)
                    }
                    _ => false,
                },
            }
        }
    }
}
