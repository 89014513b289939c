//! Hand-off to the presentation layer.
//!
//! Charts look columns up by name and plot (x, y) pairs in row order, one
//! series per category. [`series`] builds exactly that shape; [`write_series`]
//! stores it as JSON and [`write_csv`] stores a whole dataset as delimited
//! text in the requested encoding.

use std::{collections::HashMap, fs, path::Path};

use encoding_rs::Encoding;
use log::info;
use serde::Serialize;

use crate::{
    data::{Value, display_cell},
    dataset::Dataset,
    error::ExportError,
    io_utils,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: Value,
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<Point>,
}

#[derive(Debug, Clone)]
pub struct SeriesSpec {
    pub x: String,
    pub y: String,
    /// One series per distinct value of this column, in first-seen order.
    pub group_by: Option<String>,
}

pub fn series(dataset: &Dataset, spec: &SeriesSpec) -> Result<Vec<Series>, ExportError> {
    let lookup = |name: &str| {
        dataset
            .column_index(name)
            .ok_or_else(|| ExportError::UnknownColumn(name.to_string()))
    };
    let x_idx = lookup(&spec.x)?;
    let y_idx = lookup(&spec.y)?;
    let group_idx = spec.group_by.as_deref().map(lookup).transpose()?;

    let mut out: Vec<Series> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();
    for (row_idx, row) in dataset.rows().iter().enumerate() {
        let Some(x) = row[x_idx].clone() else {
            continue;
        };
        let y = match &row[y_idx] {
            None => None,
            Some(Value::Number(n)) => Some(*n),
            Some(Value::Text(text)) => {
                return Err(ExportError::NotNumeric {
                    column: spec.y.clone(),
                    row: row_idx,
                    value: text.clone(),
                });
            }
        };
        let name = match group_idx {
            Some(idx) => display_cell(&row[idx]),
            None => spec.y.clone(),
        };
        let slot = *slots.entry(name.clone()).or_insert_with(|| {
            out.push(Series {
                name,
                points: Vec::new(),
            });
            out.len() - 1
        });
        out[slot].points.push(Point { x, y });
    }
    Ok(out)
}

pub fn write_series(series: &[Series], path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(series).map_err(|source| ExportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    write_bytes(path, json.as_bytes())?;
    info!("Wrote {} series to {:?}", series.len(), path);
    Ok(())
}

/// Renders a dataset as delimited text; missing cells become empty fields.
pub fn to_csv_string(dataset: &Dataset, delimiter: u8) -> Result<String, csv::Error> {
    let mut writer = io_utils::csv_writer(Vec::new(), delimiter);
    writer.write_record(dataset.columns())?;
    for row in dataset.rows() {
        writer.write_record(row.iter().map(display_cell))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn write_csv(
    dataset: &Dataset,
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<(), ExportError> {
    let text = to_csv_string(dataset, delimiter).map_err(|source| ExportError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    let bytes = io_utils::encode_text(&text, encoding).map_err(|err| ExportError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string()),
    })?;
    write_bytes(path, &bytes)?;
    info!(
        "Wrote {} row(s) to {:?} ({})",
        dataset.row_count(),
        path,
        encoding.name()
    );
    Ok(())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, bytes).map_err(io_err)
}
