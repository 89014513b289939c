//! Wide-to-long reshaping.
//!
//! [`melt`] turns one column per category into one row per
//! (identifiers, category, value) triple. [`pivot`] goes the other way and is
//! mostly used to check that a melt lost nothing.

use std::collections::HashMap;

use log::debug;

use crate::{
    data::{Cell, Value, parse_number},
    dataset::Dataset,
    error::ReshapeError,
};

pub const DEFAULT_CATEGORY_COLUMN: &str = "category";
pub const DEFAULT_VALUE_COLUMN: &str = "value";

/// How an unpivoted column name becomes the category cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryLabel {
    #[default]
    Verbatim,
    /// Drop this many leading characters, then read the rest as a number
    /// (`y2005` -> `2005`).
    StripPrefix(usize),
}

#[derive(Debug, Clone)]
pub struct MeltSpec {
    pub id_columns: Vec<String>,
    /// Columns to unpivot, in output order. Empty means every non-identifier
    /// column in dataset order.
    pub value_columns: Vec<String>,
    pub category_column: String,
    pub value_column: String,
    pub label: CategoryLabel,
}

impl MeltSpec {
    pub fn new<I, V>(id_columns: I, value_columns: V) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        Self {
            id_columns: id_columns.into_iter().map(Into::into).collect(),
            value_columns: value_columns.into_iter().map(Into::into).collect(),
            category_column: DEFAULT_CATEGORY_COLUMN.to_string(),
            value_column: DEFAULT_VALUE_COLUMN.to_string(),
            label: CategoryLabel::Verbatim,
        }
    }

    pub fn named(mut self, category_column: &str, value_column: &str) -> Self {
        self.category_column = category_column.to_string();
        self.value_column = value_column.to_string();
        self
    }

    pub fn strip_prefix(mut self, chars: usize) -> Self {
        self.label = CategoryLabel::StripPrefix(chars);
        self
    }
}

pub fn melt(dataset: &Dataset, spec: &MeltSpec) -> Result<Dataset, ReshapeError> {
    let id_indices = spec
        .id_columns
        .iter()
        .map(|name| {
            dataset
                .column_index(name)
                .ok_or_else(|| ReshapeError::UnknownColumn(name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let value_names: Vec<&String> = if spec.value_columns.is_empty() {
        dataset
            .columns()
            .iter()
            .filter(|c| !spec.id_columns.contains(c))
            .collect()
    } else {
        spec.value_columns.iter().collect()
    };

    let mut value_indices = Vec::with_capacity(value_names.len());
    for name in &value_names {
        if spec.id_columns.contains(name) {
            return Err(ReshapeError::OverlappingColumn((*name).clone()));
        }
        let idx = dataset
            .column_index(name)
            .ok_or_else(|| ReshapeError::UnknownColumn((*name).clone()))?;
        value_indices.push(idx);
    }

    let categories = value_names
        .iter()
        .map(|name| category_cell(name, spec.label))
        .collect::<Result<Vec<_>, _>>()?;

    let mut columns = spec.id_columns.clone();
    columns.push(spec.category_column.clone());
    columns.push(spec.value_column.clone());

    let mut rows = Vec::with_capacity(dataset.row_count() * value_indices.len());
    for row in dataset.rows() {
        for (value_idx, category) in value_indices.iter().zip(&categories) {
            let mut out: Vec<Cell> = id_indices.iter().map(|&i| row[i].clone()).collect();
            out.push(Some(category.clone()));
            out.push(row[*value_idx].clone());
            rows.push(out);
        }
    }

    debug!(
        "Melted {} row(s) x {} value column(s) into {} row(s)",
        dataset.row_count(),
        value_indices.len(),
        rows.len()
    );
    Ok(Dataset::from_parts(columns, rows)?)
}

fn category_cell(name: &str, label: CategoryLabel) -> Result<Value, ReshapeError> {
    match label {
        CategoryLabel::Verbatim => Ok(Value::Text(name.to_string())),
        CategoryLabel::StripPrefix(strip) => name
            .char_indices()
            .nth(strip)
            .and_then(|(offset, _)| parse_number(name[offset..].trim()))
            .map(Value::Number)
            .ok_or_else(|| ReshapeError::CategoryNotNumeric {
                label: name.to_string(),
                strip,
            }),
    }
}

/// Long-to-wide: one row per distinct identifier tuple, one column per
/// category, both in first-seen order. Absent combinations are missing.
pub fn pivot(
    dataset: &Dataset,
    id_columns: &[&str],
    category_column: &str,
    value_column: &str,
) -> Result<Dataset, ReshapeError> {
    let lookup = |name: &str| {
        dataset
            .column_index(name)
            .ok_or_else(|| ReshapeError::UnknownColumn(name.to_string()))
    };
    let id_indices = id_columns
        .iter()
        .map(|name| lookup(*name))
        .collect::<Result<Vec<_>, _>>()?;
    let category_idx = lookup(category_column)?;
    let value_idx = lookup(value_column)?;

    let mut category_names: Vec<String> = Vec::new();
    let mut category_slots: HashMap<String, usize> = HashMap::new();
    let mut group_slots: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Cell>, Vec<Option<Cell>>)> = Vec::new();

    for row in dataset.rows() {
        let ids: Vec<Cell> = id_indices.iter().map(|&i| row[i].clone()).collect();
        let group_key = ids
            .iter()
            .map(|cell| format!("{cell:?}"))
            .collect::<Vec<_>>()
            .join("\u{1f}");
        let category = row[category_idx]
            .as_ref()
            .map(Value::as_display)
            .unwrap_or_default();

        let slot = *category_slots.entry(category.clone()).or_insert_with(|| {
            category_names.push(category.clone());
            category_names.len() - 1
        });
        let group = *group_slots.entry(group_key).or_insert_with(|| {
            groups.push((ids, Vec::new()));
            groups.len() - 1
        });

        let cells = &mut groups[group].1;
        if cells.len() <= slot {
            cells.resize(slot + 1, None);
        }
        if cells[slot].is_some() {
            return Err(ReshapeError::DuplicateCell { category });
        }
        cells[slot] = Some(row[value_idx].clone());
    }

    let mut columns: Vec<String> = id_columns.iter().map(|c| c.to_string()).collect();
    columns.extend(category_names.iter().cloned());
    let rows = groups
        .into_iter()
        .map(|(mut ids, cells)| {
            for slot in 0..category_names.len() {
                ids.push(cells.get(slot).cloned().flatten().flatten());
            }
            ids
        })
        .collect();
    Ok(Dataset::from_parts(columns, rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population() -> Dataset {
        Dataset::new(
            vec!["geo".into(), "y2000".into(), "y2001".into()],
            vec![
                vec![Some("NL".into()), Some(15.9.into()), Some(16.0.into())],
                vec![Some("BE".into()), Some(10.2.into()), None],
            ],
        )
        .unwrap()
    }

    #[test]
    fn strip_prefix_turns_labels_into_numbers() {
        let spec = MeltSpec::new(["geo"], ["y2000", "y2001"])
            .named("year", "population")
            .strip_prefix(1);
        let long = melt(&population(), &spec).unwrap();
        assert_eq!(long.columns(), ["geo", "year", "population"]);
        assert_eq!(long.rows()[1][1], Some(Value::Number(2001.0)));
        assert_eq!(long.rows()[3][2], None);
    }

    #[test]
    fn strip_prefix_rejects_non_numeric_remainder() {
        let spec = MeltSpec::new(["y2000"], ["geo"]).strip_prefix(1);
        let err = melt(&population(), &spec).unwrap_err();
        assert!(matches!(err, ReshapeError::CategoryNotNumeric { .. }));
    }

    #[test]
    fn strip_prefix_longer_than_label_fails() {
        assert!(category_cell("y", CategoryLabel::StripPrefix(1)).is_err());
        assert!(category_cell("y2", CategoryLabel::StripPrefix(1)).is_ok());
    }
}
