//! In-memory tabular dataset shared by every pipeline stage.
//!
//! A [`Dataset`] is an ordered list of uniquely named columns and an ordered
//! list of rows, each row holding exactly one [`Cell`] per column. Datasets
//! are never mutated after construction: every stage reads its inputs and
//! builds a fresh dataset for its output.

use std::{collections::HashSet, fmt::Write as _};

use sha2::{Digest, Sha256};

use crate::{
    data::{Cell, Value},
    error::DatasetError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Dataset {
    /// Builds a dataset, checking column uniqueness and row widths.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, DatasetError> {
        ensure_unique(&columns)?;
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DatasetError::RowWidth {
                    row: idx,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn empty(columns: Vec<String>) -> Result<Self, DatasetError> {
        Self::new(columns, Vec::new())
    }

    /// Used by stages that build rows to the width of `columns` themselves.
    pub(crate) fn from_parts(
        columns: Vec<String>,
        rows: Vec<Vec<Cell>>,
    ) -> Result<Self, DatasetError> {
        ensure_unique(&columns)?;
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Cells of one column in row order.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn column_kind_at(&self, idx: usize) -> ColumnKind {
        let all_numeric = self
            .rows
            .iter()
            .filter_map(|row| row[idx].as_ref())
            .all(Value::is_number);
        if all_numeric {
            ColumnKind::Numeric
        } else {
            ColumnKind::Text
        }
    }

    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        self.column_index(name).map(|idx| self.column_kind_at(idx))
    }

    /// Keeps the named columns in the order given.
    pub fn project(&self, names: &[&str]) -> Option<Dataset> {
        let indices = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Option<Vec<_>>>()?;
        let columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Dataset::from_parts(columns, rows).ok()
    }

    pub fn head(&self, limit: usize) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(limit).cloned().collect(),
        }
    }

    /// Hex SHA-256 over the column names and typed cells.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for column in &self.columns {
            hasher.update(b"c");
            hasher.update((column.len() as u64).to_le_bytes());
            hasher.update(column.as_bytes());
        }
        for row in &self.rows {
            hasher.update(b"r");
            for cell in row {
                match cell {
                    None => hasher.update(b"m"),
                    Some(Value::Number(n)) => {
                        hasher.update(b"n");
                        hasher.update(n.to_bits().to_le_bytes());
                    }
                    Some(Value::Text(s)) => {
                        hasher.update(b"t");
                        hasher.update((s.len() as u64).to_le_bytes());
                        hasher.update(s.as_bytes());
                    }
                }
            }
        }
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        hex
    }
}

fn ensure_unique(columns: &[String]) -> Result<(), DatasetError> {
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if !seen.insert(column.as_str()) {
            return Err(DatasetError::DuplicateColumn(column.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["country".into(), "2017".into()],
            vec![
                vec![Some("A".into()), None],
                vec![Some("B".into()), Some(30.0.into())],
            ],
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_duplicate_columns() {
        let err = Dataset::new(vec!["a".into(), "a".into()], Vec::new()).unwrap_err();
        assert_eq!(err, DatasetError::DuplicateColumn("a".into()));
    }

    #[test]
    fn new_rejects_ragged_rows() {
        let err = Dataset::new(vec!["a".into(), "b".into()], vec![vec![None]]).unwrap_err();
        assert_eq!(
            err,
            DatasetError::RowWidth {
                row: 0,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn column_kind_ignores_missing_cells() {
        let dataset = sample();
        assert_eq!(dataset.column_kind("2017"), Some(ColumnKind::Numeric));
        assert_eq!(dataset.column_kind("country"), Some(ColumnKind::Text));
        assert_eq!(dataset.column_kind("nope"), None);
    }

    #[test]
    fn fingerprint_distinguishes_missing_from_zero() {
        let with_missing = sample();
        let with_zero = Dataset::new(
            vec!["country".into(), "2017".into()],
            vec![
                vec![Some("A".into()), Some(0.0.into())],
                vec![Some("B".into()), Some(30.0.into())],
            ],
        )
        .unwrap();
        assert_ne!(with_missing.fingerprint(), with_zero.fingerprint());
        assert_eq!(with_missing.fingerprint(), sample().fingerprint());
    }

    #[test]
    fn project_reorders_columns() {
        let projected = sample().project(&["2017", "country"]).unwrap();
        assert_eq!(projected.columns(), ["2017", "country"]);
        assert_eq!(projected.rows()[1][0], Some(Value::Number(30.0)));
        assert!(sample().project(&["missing"]).is_none());
    }

    #[test]
    fn head_and_cell_lookups() {
        let dataset = sample();
        let head = dataset.head(1);
        assert_eq!(head.row_count(), 1);
        assert_eq!(head.columns(), dataset.columns());
        assert_eq!(dataset.cell(1, "2017"), Some(&Some(Value::Number(30.0))));
        assert_eq!(dataset.cell(5, "2017"), None);
        assert_eq!(dataset.column("country").map(|c| c.len()), Some(2));
    }
}
