//! Column derivation: unit scaling, inner joins, and ratio columns.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::debug;

use crate::{
    data::{Cell, Value},
    dataset::{ColumnKind, Dataset},
    error::DeriveError,
};

/// Positional key pairs: `left_on[i]` is matched against `right_on[i]`.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub left_on: Vec<String>,
    pub right_on: Vec<String>,
}

impl JoinSpec {
    pub fn new<L, R>(left_on: L, right_on: R) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            left_on: left_on.into_iter().map(Into::into).collect(),
            right_on: right_on.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RatioSpec {
    pub numerator: String,
    pub denominator: String,
    pub output: String,
}

impl RatioSpec {
    pub fn new(numerator: &str, denominator: &str, output: &str) -> Self {
        Self {
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
            output: output.to_string(),
        }
    }
}

/// Multiplies a numeric column by `factor`. With `output` the result is
/// appended as a new column; without it (or when it names `column` itself)
/// the column is replaced in place.
pub fn scale(
    dataset: &Dataset,
    column: &str,
    factor: f64,
    output: Option<&str>,
) -> Result<Dataset, DeriveError> {
    let idx = numeric_column(dataset, column, "input")?;
    let scaled = |cell: &Cell| -> Cell {
        cell.as_ref()
            .and_then(Value::as_number)
            .map(|n| Value::Number(n * factor))
    };

    let mut columns = dataset.columns().to_vec();
    let rows: Vec<Vec<Cell>> = match output.filter(|name| *name != column) {
        Some(name) => {
            columns.push(name.to_string());
            dataset
                .rows()
                .iter()
                .map(|row| {
                    let mut out = row.clone();
                    out.push(scaled(&row[idx]));
                    out
                })
                .collect()
        }
        None => dataset
            .rows()
            .iter()
            .map(|row| {
                let mut out = row.clone();
                out[idx] = scaled(&row[idx]);
                out
            })
            .collect(),
    };
    debug!("Scaled column '{column}' by {factor}");
    Ok(Dataset::from_parts(columns, rows)?)
}

/// Inner join. Output keeps left row order; each left row is followed by its
/// matches in right row order. Right key columns are dropped and clashing
/// right column names are prefixed with `right_`.
pub fn merge(left: &Dataset, right: &Dataset, spec: &JoinSpec) -> Result<Dataset, DeriveError> {
    if spec.left_on.is_empty() || spec.left_on.len() != spec.right_on.len() {
        return Err(DeriveError::KeyArity {
            left: spec.left_on.len(),
            right: spec.right_on.len(),
        });
    }
    let left_indices = column_indices(left, &spec.left_on, "left")?;
    let right_indices = column_indices(right, &spec.right_on, "right")?;

    let right_lookup = build_right_lookup(right, &right_indices);
    let (columns, right_columns) =
        build_output_headers(left.columns(), right.columns(), &right_indices);

    let mut rows = Vec::new();
    for row in left.rows() {
        let Some(key) = JoinKey::from_row(row, &left_indices) else {
            continue;
        };
        let Some(matches) = right_lookup.get(&key) else {
            continue;
        };
        for &right_row in matches {
            let mut combined = row.clone();
            combined.extend(
                right_columns
                    .iter()
                    .map(|&idx| right.rows()[right_row][idx].clone()),
            );
            rows.push(combined);
        }
    }

    debug!(
        "Merged {} left row(s) with {} right row(s) into {} row(s)",
        left.row_count(),
        right.row_count(),
        rows.len()
    );
    Ok(Dataset::from_parts(columns, rows)?)
}

/// Appends `numerator / denominator`. Missing operands and zero denominators
/// yield a missing cell.
pub fn ratio(dataset: &Dataset, spec: &RatioSpec) -> Result<Dataset, DeriveError> {
    let num_idx = numeric_column(dataset, &spec.numerator, "input")?;
    let den_idx = numeric_column(dataset, &spec.denominator, "input")?;

    let mut columns = dataset.columns().to_vec();
    columns.push(spec.output.clone());
    let rows = dataset
        .rows()
        .iter()
        .map(|row| {
            let numerator = row[num_idx].as_ref().and_then(Value::as_number);
            let denominator = row[den_idx].as_ref().and_then(Value::as_number);
            let value = match (numerator, denominator) {
                (Some(n), Some(d)) if d != 0.0 => Some(Value::Number(n / d)),
                _ => None,
            };
            let mut out = row.clone();
            out.push(value);
            out
        })
        .collect();
    Ok(Dataset::from_parts(columns, rows)?)
}

/// Joins two datasets and derives a ratio between a left and a right column,
/// e.g. waste volume per matched population figure.
pub fn merge_and_derive(
    left: &Dataset,
    right: &Dataset,
    join: &JoinSpec,
    ratio_spec: &RatioSpec,
) -> Result<Dataset, DeriveError> {
    let merged = merge(left, right, join)?;
    let resolved = RatioSpec {
        numerator: ratio_spec.numerator.clone(),
        denominator: renamed_right_column(left, right, join, &ratio_spec.denominator)
            .unwrap_or_else(|| ratio_spec.denominator.clone()),
        output: ratio_spec.output.clone(),
    };
    ratio(&merged, &resolved)
}

/// Name a right column carries after [`merge`], when it is kept at all.
fn renamed_right_column(
    left: &Dataset,
    right: &Dataset,
    join: &JoinSpec,
    name: &str,
) -> Option<String> {
    if !left.has_column(name) {
        return None;
    }
    let right_idx = right.column_index(name)?;
    let right_keys = join
        .right_on
        .iter()
        .filter_map(|k| right.column_index(k))
        .collect::<Vec<_>>();
    let (headers, right_columns) =
        build_output_headers(left.columns(), right.columns(), &right_keys);
    right_columns
        .iter()
        .position(|&idx| idx == right_idx)
        .map(|pos| headers[left.column_count() + pos].clone())
}

fn numeric_column(dataset: &Dataset, name: &str, side: &'static str) -> Result<usize, DeriveError> {
    let idx = dataset
        .column_index(name)
        .ok_or_else(|| DeriveError::UnknownColumn {
            column: name.to_string(),
            side,
        })?;
    if dataset.column_kind_at(idx) != ColumnKind::Numeric {
        return Err(DeriveError::NotNumeric(name.to_string()));
    }
    Ok(idx)
}

fn column_indices(
    dataset: &Dataset,
    columns: &[String],
    side: &'static str,
) -> Result<Vec<usize>, DeriveError> {
    columns
        .iter()
        .map(|name| {
            dataset
                .column_index(name)
                .ok_or_else(|| DeriveError::UnknownColumn {
                    column: name.clone(),
                    side,
                })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyAtom {
    Number(u64),
    Text(String),
}

/// Exact-equality join key. Rows with a missing key cell never match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct JoinKey(Vec<KeyAtom>);

impl JoinKey {
    fn from_row(row: &[Cell], indices: &[usize]) -> Option<Self> {
        indices
            .iter()
            .map(|&idx| {
                row[idx].as_ref().map(|value| match value {
                    // -0.0 and 0.0 compare equal, so they must hash equal too.
                    Value::Number(n) if *n == 0.0 => KeyAtom::Number(0.0f64.to_bits()),
                    Value::Number(n) => KeyAtom::Number(n.to_bits()),
                    Value::Text(s) => KeyAtom::Text(s.clone()),
                })
            })
            .collect::<Option<Vec<_>>>()
            .map(JoinKey)
    }
}

fn build_right_lookup(right: &Dataset, key_indices: &[usize]) -> HashMap<JoinKey, Vec<usize>> {
    right
        .rows()
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| JoinKey::from_row(row, key_indices).map(|key| (key, idx)))
        .into_group_map()
}

fn build_output_headers(
    left_headers: &[String],
    right_headers: &[String],
    right_key_indices: &[usize],
) -> (Vec<String>, Vec<usize>) {
    let mut headers = left_headers.to_vec();
    let mut seen: HashSet<String> = headers.iter().cloned().collect();
    let mut right_columns = Vec::new();

    for (idx, name) in right_headers.iter().enumerate() {
        if right_key_indices.contains(&idx) {
            continue;
        }
        let mut candidate = name.clone();
        if seen.contains(&candidate) {
            candidate = format!("right_{name}");
            let mut counter = 1usize;
            while seen.contains(&candidate) {
                candidate = format!("right_{name}_{counter}");
                counter += 1;
            }
        }
        seen.insert(candidate.clone());
        headers.push(candidate);
        right_columns.push(idx);
    }

    (headers, right_columns)
}
