use std::{cmp::Ordering, fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Tokens that mark a cell as not available in addition to the empty string.
pub const DEFAULT_MISSING_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

static NUMERIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$").expect("valid numeric pattern")
});

/// A single present cell. Missing cells are `None` at the row level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

/// A row cell: `None` is the missing marker, independent of zero.
pub type Cell = Option<Value>;

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => format_number(*n),
        }
    }

    /// Total order used for grouping and sorting: numbers before text.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Number(_), Value::Text(_)) => Ordering::Less,
            (Value::Text(_), Value::Number(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

/// Orders cells with missing values last, as the ranking sort expects.
#[derive(Debug, Clone, Copy)]
pub struct ComparableCell<'a>(pub &'a Cell);

impl PartialEq for ComparableCell<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ComparableCell<'_> {}

impl Ord for ComparableCell<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(left), Some(right)) => left.total_cmp(right),
        }
    }
}

impl PartialOrd for ComparableCell<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owned grouping key with a total order; built only from present cells.
/// `-0.0` and `0.0` are the same key, matching join key equality.
#[derive(Debug, Clone)]
pub struct GroupKey(pub Value);

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GroupKey {}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (Value::Number(a), Value::Number(b)) => unsigned_zero(*a).total_cmp(&unsigned_zero(*b)),
            (left, right) => left.total_cmp(right),
        }
    }
}

fn unsigned_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn is_numeric_literal(value: &str) -> bool {
    NUMERIC_PATTERN.is_match(value)
}

/// Classifies one raw field: missing token, number, or text.
pub fn parse_cell<S: AsRef<str>>(raw: &str, missing_tokens: &[S]) -> Cell {
    let trimmed = raw.trim();
    if trimmed.is_empty() || missing_tokens.iter().any(|t| t.as_ref() == trimmed) {
        return None;
    }
    parse_number(trimmed)
        .map(Value::Number)
        .or_else(|| Some(Value::Text(raw.to_string())))
}

/// Parses a trimmed numeric literal, accepting signed infinities as well.
pub fn parse_number(value: &str) -> Option<f64> {
    if is_numeric_literal(value) {
        return value.parse().ok();
    }
    match value {
        "inf" | "+inf" | "Infinity" => Some(f64::INFINITY),
        "-inf" | "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

pub fn display_cell(cell: &Cell) -> String {
    cell.as_ref().map(Value::as_display).unwrap_or_default()
}
