//! I/O helpers for delimited input and output.
//!
//! - **Delimiter resolution**: extension-based defaults (`.tsv` -> tab,
//!   everything else -> comma) with manual override.
//! - **Encoding**: WHATWG labels resolved through `encoding_rs`, UTF-8 by
//!   default. Fields are decoded one at a time so a bad byte sequence is
//!   reported against its line.
//! - **Reader/writer construction** with the settings every stage shares.

use std::{
    fs::File,
    io::{BufReader, Read, Write},
    path::Path,
};

use anyhow::{Result, anyhow};
use encoding_rs::{Encoding, UTF_8};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const UTF8_BOM: char = '\u{feff}';

pub fn lookup_encoding(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => lookup_encoding(value).ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// `.tsv` and `.csv` pick their own delimiter; other extensions use `fallback`.
pub fn resolve_output_delimiter(path: &Path, provided: Option<u8>, fallback: u8) -> u8 {
    if let Some(delimiter) = provided {
        return delimiter;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        Some(ext) if ext.eq_ignore_ascii_case("csv") => DEFAULT_CSV_DELIMITER,
        _ => fallback,
    }
}

/// Rows of unequal width are let through so ingest can report them itself.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
) -> std::io::Result<csv::Reader<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(open_csv_reader(BufReader::new(file), delimiter))
}

pub fn csv_writer<W: Write>(writer: W, delimiter: u8) -> csv::Writer<W> {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(csv::QuoteStyle::Necessary)
        .double_quote(true);
    builder.from_writer(writer)
}

/// Decodes one field; `None` when the bytes are malformed for `encoding`.
pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    (!had_errors).then(|| text.into_owned())
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Option<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Decodes the header row, dropping a leading byte-order mark.
pub fn decode_headers(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> Option<Vec<String>> {
    let mut headers = decode_record(record, encoding)?;
    if let Some(first) = headers.first_mut()
        && first.starts_with(UTF8_BOM)
    {
        first.remove(0);
    }
    Some(headers)
}

/// Encodes UTF-8 text for output; fails when a character is unmappable.
pub fn encode_text(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>> {
    let (encoded, _, had_errors) = encoding.encode(text);
    if had_errors {
        Err(anyhow!("Failed to encode text using {}", encoding.name()))
    } else {
        Ok(encoded.into_owned())
    }
}

pub fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::WINDOWS_1252;

    #[test]
    fn resolve_input_delimiter_uses_extension_fallback() {
        assert_eq!(resolve_input_delimiter(Path::new("a.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("a.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("a.csv"), Some(b';')), b';');
    }

    #[test]
    fn resolve_output_delimiter_prefers_flag_then_extension() {
        assert_eq!(resolve_output_delimiter(Path::new("out.tsv"), None, b','), b'\t');
        assert_eq!(resolve_output_delimiter(Path::new("out.CSV"), None, b';'), b',');
        assert_eq!(resolve_output_delimiter(Path::new("out.txt"), None, b';'), b';');
        assert_eq!(resolve_output_delimiter(Path::new("out.tsv"), Some(b'|'), b','), b'|');
    }

    #[test]
    fn lookup_encoding_accepts_common_labels() {
        assert_eq!(lookup_encoding("latin1"), Some(WINDOWS_1252));
        assert_eq!(lookup_encoding(" UTF-8 "), Some(UTF_8));
        assert!(lookup_encoding("klingon").is_none());
    }

    #[test]
    fn decode_bytes_reports_invalid_utf8() {
        assert_eq!(decode_bytes(b"caf\xc3\xa9", UTF_8).as_deref(), Some("café"));
        assert!(decode_bytes(b"caf\xe9", UTF_8).is_none());
        assert_eq!(
            decode_bytes(b"caf\xe9", WINDOWS_1252).as_deref(),
            Some("café")
        );
    }

    #[test]
    fn encode_text_round_trips_latin1() {
        let bytes = encode_text("Curaçao", WINDOWS_1252).unwrap();
        assert_eq!(bytes, b"Cura\xe7ao");
    }
}
