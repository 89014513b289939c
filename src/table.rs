use std::borrow::Cow;
use std::fmt::Write as _;

use crate::{
    data::display_cell,
    dataset::{ColumnKind, Dataset},
};

const MISSING_MARKER: &str = "NaN";

/// Renders at most `limit` rows of `dataset` as an aligned text table.
/// Numeric columns are right-aligned and missing cells show as `NaN`.
pub fn render_dataset(dataset: &Dataset, limit: usize) -> String {
    let alignments = (0..dataset.column_count())
        .map(|idx| match dataset.column_kind_at(idx) {
            ColumnKind::Numeric => Align::Right,
            ColumnKind::Text => Align::Left,
        })
        .collect::<Vec<_>>();
    let rows = dataset
        .rows()
        .iter()
        .take(limit)
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Some(_) => display_cell(cell),
                    None => MISSING_MARKER.to_string(),
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    let mut output = render_table(dataset.columns(), &rows, &alignments);
    let hidden = dataset.row_count().saturating_sub(limit);
    if hidden > 0 {
        let _ = writeln!(output, "... {hidden} more row(s)");
    }
    output
}

pub fn print_dataset(dataset: &Dataset, limit: usize) {
    print!("{}", render_dataset(dataset, limit));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

fn render_table(headers: &[String], rows: &[Vec<String>], alignments: &[Align]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, alignments));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths, alignments));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, alignments));
    }
    output
}

fn format_row(values: &[String], widths: &[usize], alignments: &[Align]) -> String {
    let cells = values
        .iter()
        .zip(widths)
        .zip(alignments)
        .map(|((value, &width), align)| {
            let sanitized = sanitize_cell(value);
            let padding = " ".repeat(width.saturating_sub(display_width(&sanitized)));
            match align {
                Align::Left => format!("{sanitized}{padding}"),
                Align::Right => format!("{padding}{sanitized}"),
            }
        })
        .collect::<Vec<_>>();
    cells.join("  ").trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
