//! Plain-text result tables.
//!
//! Renders column headers and rows as left-aligned, pipe-delimited lines
//! with a dashed separator under the header.

use crate::db::Value;

const CELL_SEPARATOR: &str = " | ";
const RULE_SEPARATOR: &str = "-+-";

/// Formats `headers` and `rows` into display lines.
///
/// Returns the header line, the separator line, then one line per row.
/// Widths are measured in characters; NULL cells are empty.
pub fn format_table<S: AsRef<str>>(headers: &[S], rows: &[Vec<Value>]) -> Vec<String> {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(Value::to_display_string).collect())
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.as_ref().chars().count()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_line(headers.iter().map(|h| h.as_ref()), &widths));
    lines.push(
        widths
            .iter()
            .map(|&width| "-".repeat(width))
            .collect::<Vec<_>>()
            .join(RULE_SEPARATOR),
    );
    lines.extend(
        cells
            .iter()
            .map(|row| format_line(row.iter().map(String::as_str), &widths)),
    );
    lines
}

fn format_line<'a>(items: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    items
        .zip(widths)
        .map(|(item, &width)| format!("{item:<width$}"))
        .collect::<Vec<_>>()
        .join(CELL_SEPARATOR)
}

/// Row-count footer printed under a table, e.g. `(1 row)` or `(3 rows)`.
pub fn row_count_label(count: usize) -> String {
    if count == 1 {
        "(1 row)".to_string()
    } else {
        format!("({count} rows)")
    }
}
