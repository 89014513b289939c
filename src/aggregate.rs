//! Group-reduce, not-null filtering, and stable ranking.

use std::collections::BTreeMap;

use log::debug;

use crate::{
    data::{Cell, ComparableCell, GroupKey, Value},
    dataset::{ColumnKind, Dataset},
    error::AggregateError,
};

/// One mean per numeric column for every distinct present key, in ascending
/// key order. Text columns are dropped; rows with a missing key are skipped.
pub fn group_mean(dataset: &Dataset, key: &str) -> Result<Dataset, AggregateError> {
    let key_idx = dataset
        .column_index(key)
        .ok_or_else(|| AggregateError::UnknownColumn(key.to_string()))?;
    let numeric: Vec<usize> = (0..dataset.column_count())
        .filter(|&idx| idx != key_idx && dataset.column_kind_at(idx) == ColumnKind::Numeric)
        .collect();

    let mut groups: BTreeMap<GroupKey, Vec<MeanAccumulator>> = BTreeMap::new();
    let mut skipped = 0usize;
    for row in dataset.rows() {
        let Some(value) = row[key_idx].as_ref() else {
            skipped += 1;
            continue;
        };
        let accumulators = groups
            .entry(GroupKey(value.clone()))
            .or_insert_with(|| vec![MeanAccumulator::default(); numeric.len()]);
        for (acc, &idx) in accumulators.iter_mut().zip(&numeric) {
            if let Some(n) = row[idx].as_ref().and_then(Value::as_number) {
                acc.add(n);
            }
        }
    }
    if skipped > 0 {
        debug!("Skipped {skipped} row(s) with a missing '{key}'");
    }

    let mut columns = vec![key.to_string()];
    columns.extend(numeric.iter().map(|&idx| dataset.columns()[idx].clone()));
    let rows: Vec<Vec<Cell>> = groups
        .into_iter()
        .map(|(GroupKey(value), accumulators)| {
            std::iter::once(Some(value))
                .chain(
                    accumulators
                        .iter()
                        .map(|acc| acc.mean().map(Value::Number)),
                )
                .collect()
        })
        .collect();

    debug!(
        "Grouped {} row(s) by '{key}' into {} group(s) over {} numeric column(s)",
        dataset.row_count(),
        rows.len(),
        numeric.len()
    );
    Ok(Dataset::from_parts(columns, rows)?)
}

/// Rows whose `target` cell is present, stably sorted ascending by `sort_by`
/// (missing sort values last).
pub fn present_sorted(
    dataset: &Dataset,
    target: &str,
    sort_by: &str,
) -> Result<Dataset, AggregateError> {
    let target_idx = dataset
        .column_index(target)
        .ok_or_else(|| AggregateError::UnknownColumn(target.to_string()))?;
    let sort_idx = dataset
        .column_index(sort_by)
        .ok_or_else(|| AggregateError::UnknownColumn(sort_by.to_string()))?;

    let mut kept: Vec<&Vec<Cell>> = dataset
        .rows()
        .iter()
        .filter(|row| row[target_idx].is_some())
        .collect();
    // `sort_by` is stable, so ties keep their input order.
    kept.sort_by(|a, b| ComparableCell(&a[sort_idx]).cmp(&ComparableCell(&b[sort_idx])));

    debug!(
        "Kept {} of {} row(s) with '{target}' present, sorted by '{sort_by}'",
        kept.len(),
        dataset.row_count()
    );
    let rows = kept.into_iter().cloned().collect();
    Ok(Dataset::from_parts(dataset.columns().to_vec(), rows)?)
}

#[derive(Debug, Clone, Default)]
struct MeanAccumulator {
    sum: f64,
    count: usize,
}

impl MeanAccumulator {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.sum / self.count as f64)
        } else {
            None
        }
    }
}
