//! Loads a delimited text file into a [`Dataset`].
//!
//! The header row names the columns. Every other field is trimmed for
//! classification only: a missing token becomes `None`, a numeric literal a
//! number, anything else keeps its original text. Rows whose width differs
//! from the header abort the load with the offending line number.

use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    data::{Cell, DEFAULT_MISSING_TOKENS, parse_cell},
    dataset::Dataset,
    error::IngestError,
    io_utils,
};

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub missing_tokens: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: io_utils::DEFAULT_CSV_DELIMITER,
            encoding: UTF_8,
            missing_tokens: DEFAULT_MISSING_TOKENS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl IngestOptions {
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Adds source-specific not-available tokens (e.g. `..` or `:`).
    pub fn with_missing_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for token in tokens {
            let token = token.into();
            if !self.missing_tokens.contains(&token) {
                self.missing_tokens.push(token);
            }
        }
        self
    }
}

pub fn ingest(path: &Path, options: &IngestOptions) -> Result<Dataset, IngestError> {
    debug!(
        "Ingesting {:?} (delimiter '{}', encoding {})",
        path,
        io_utils::printable_delimiter(options.delimiter),
        options.encoding.name()
    );
    let mut reader = io_utils::open_csv_reader_from_path(path, options.delimiter).map_err(
        |source| IngestError::Open {
            path: path.to_path_buf(),
            source,
        },
    )?;

    let header_record = reader
        .byte_headers()
        .map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            line: 1,
            source,
        })?
        .clone();
    if header_record.is_empty() {
        return Err(IngestError::MissingHeader {
            path: path.to_path_buf(),
        });
    }
    let headers = io_utils::decode_headers(&header_record, options.encoding).ok_or_else(|| {
        IngestError::Decode {
            path: path.to_path_buf(),
            line: 1,
            encoding: options.encoding.name(),
        }
    })?;
    let width = headers.len();

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    let mut record = csv::ByteRecord::new();
    loop {
        let more = reader
            .read_byte_record(&mut record)
            .map_err(|source| IngestError::Read {
                path: path.to_path_buf(),
                line: rows.len() as u64 + 2,
                source,
            })?;
        if !more {
            break;
        }
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(rows.len() as u64 + 2);
        if record.len() != width {
            return Err(IngestError::RowShape {
                path: path.to_path_buf(),
                line,
                expected: width,
                found: record.len(),
            });
        }
        let decoded =
            io_utils::decode_record(&record, options.encoding).ok_or_else(|| {
                IngestError::Decode {
                    path: path.to_path_buf(),
                    line,
                    encoding: options.encoding.name(),
                }
            })?;
        rows.push(
            decoded
                .iter()
                .map(|raw| parse_cell(raw, &options.missing_tokens))
                .collect(),
        );
    }

    let dataset = Dataset::new(headers, rows).map_err(|source| IngestError::Header {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "Ingested {} row(s) x {} column(s) from {:?}",
        dataset.row_count(),
        dataset.column_count(),
        path
    );
    Ok(dataset)
}
