//! reStructuredText grid tables with merged cells.
//!
//! Columns are laid out at fixed width. Between two data rows, the
//! separator under a column is dashed only when the cell below has content,
//! so blank cells visually merge with the row above.

use crate::error::{EvpropError, EvpropResult};

/// One table column: a header and its cells, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub header: String,
    pub cells: Vec<String>,
}

impl Column {
    pub fn new(header: impl Into<String>, cells: Vec<String>) -> Self {
        Self {
            header: header.into(),
            cells,
        }
    }
}

/// A rendered grid table, kept as lines until it is finalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridTable {
    widths: Vec<usize>,
    lines: Vec<String>,
}

#[inline]
fn width_of(text: &str) -> usize {
    text.chars().count()
}

#[inline]
fn has_content(cell: &str) -> bool {
    cell.chars().any(|c| c != ' ')
}

fn rule(widths: &[usize], fill: char) -> String {
    let segments: Vec<String> = widths.iter().map(|w| fill.to_string().repeat(w + 2)).collect();
    format!("+{}+", segments.join("+"))
}

fn row_line<'s>(widths: &[usize], cells: impl Iterator<Item = &'s str>) -> String {
    let padded: Vec<String> = widths
        .iter()
        .zip(cells)
        .map(|(w, cell)| format!("{cell:<w$}"))
        .collect();
    format!("| {} |", padded.join(" | "))
}

/// Separator above a row: dashes under non-blank cells, spaces elsewhere.
/// A junction becomes `+` when a dashed segment touches it.
fn separator_line<'s>(widths: &[usize], below: impl Iterator<Item = &'s str>) -> String {
    let dashed: Vec<bool> = below.map(has_content).collect();
    let mut line = String::new();
    for (idx, w) in widths.iter().enumerate() {
        let left = idx > 0 && dashed[idx - 1];
        line.push(if left || dashed[idx] { '+' } else { '|' });
        let fill = if dashed[idx] { "-" } else { " " };
        line.push_str(&fill.repeat(w + 2));
    }
    line.push(if dashed.last().copied().unwrap_or(false) { '+' } else { '|' });
    line
}

/// Lays out `columns` as a grid table.
///
/// An empty column gets a single blank cell. Every column must then have the
/// same number of cells; a mismatch is reported against `owner`.
pub fn render_grid(owner: &str, mut columns: Vec<Column>) -> EvpropResult<GridTable> {
    for column in &mut columns {
        if column.cells.is_empty() {
            column.cells.push(String::new());
        }
    }

    let rows = columns.first().map_or(0, |c| c.cells.len());
    if let Some(bad) = columns.iter().find(|c| c.cells.len() != rows) {
        return Err(EvpropError::ColumnMismatch {
            listener: owner.to_string(),
            column: bad.header.clone(),
            expected: rows,
            found: bad.cells.len(),
        });
    }

    let widths: Vec<usize> = columns
        .iter()
        .map(|c| {
            c.cells
                .iter()
                .map(|cell| width_of(cell))
                .chain(std::iter::once(width_of(&c.header)))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(2 * rows + 3);
    lines.push(rule(&widths, '-'));
    lines.push(row_line(&widths, columns.iter().map(|c| c.header.as_str())));
    lines.push(rule(&widths, '='));
    for row in 0..rows {
        lines.push(row_line(&widths, columns.iter().map(|c| c.cells[row].as_str())));
        if row + 1 < rows {
            lines.push(separator_line(&widths, columns.iter().map(|c| c.cells[row + 1].as_str())));
        }
    }
    lines.push(rule(&widths, '-'));

    Ok(GridTable { widths, lines })
}

impl GridTable {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Closes the rule under the last row whose first cell starts with
    /// `marker`, across the first `span` columns.
    ///
    /// Leaves the table untouched when no row matches or when that row is
    /// already followed by the bottom rule.
    pub fn close_rule_below_last(&mut self, marker: &str, span: usize) {
        let prefix = format!("| {marker}");
        let Some(row) = self.lines.iter().rposition(|l| l.starts_with(&prefix)) else {
            return;
        };
        let Some(separator) = self.lines.get_mut(row + 1) else {
            return;
        };
        if !separator.starts_with('|') {
            return;
        }

        let mut chars: Vec<char> = separator.chars().collect();
        let mut pos = 0;
        for (idx, w) in self.widths.iter().take(span).enumerate() {
            chars[pos] = '+';
            for c in chars.iter_mut().skip(pos + 1).take(w + 2) {
                *c = '-';
            }
            pos += w + 3;
            if idx + 1 == span.min(self.widths.len()) {
                chars[pos] = '+';
            }
        }
        *separator = chars.into_iter().collect();
    }

    /// Joins the lines; no trailing newline.
    pub fn into_string(self) -> String {
        self.lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(header: &str, cells: &[&str]) -> Column {
        Column::new(header, cells.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_merged_cells() {
        let table = render_grid("t", vec![col("A", &["x", ""]), col("Bee", &["1", "2"])]).unwrap();
        let expected = "\
+---+-----+
| A | Bee |
+===+=====+
| x | 1   |
|   +-----+
|   | 2   |
+---+-----+";
        assert_eq!(table.into_string(), expected);
    }

    #[test]
    fn test_empty_column_gets_blank_cell() {
        let table = render_grid("t", vec![col("A", &[]), col("B", &["b"])]).unwrap();
        assert_eq!(table.lines()[3], "|   | b |");
    }

    #[test]
    fn test_mismatch_is_integrity_error() {
        let err = render_grid("leds", vec![col("A", &["1", "2"]), col("B", &["1"])]).unwrap_err();
        assert!(err.is_integrity());
        assert!(matches!(
            err,
            EvpropError::ColumnMismatch { expected: 2, found: 1, .. }
        ));
    }

    #[test]
    fn test_width_counts_characters() {
        let table = render_grid("t", vec![col("A", &["ü"])]).unwrap();
        assert_eq!(table.lines()[0], "+---+");
        assert_eq!(table.lines()[3], "| ü |");
    }

    #[test]
    fn test_close_rule_below_last() {
        let mut table = render_grid(
            "t",
            vec![
                col("S", &["r1", "r2", ""]),
                col("E", &["e", "", ""]),
                col("M", &["m", "", ""]),
                col("O", &["", "", "o"]),
            ],
        )
        .unwrap();
        table.close_rule_below_last("r2", 2);
        let lines = table.lines();
        assert_eq!(lines[5], "| r2 |   |   |   |");
        assert_eq!(lines[6], "+----+---+   +---+");
    }

    #[test]
    fn test_close_rule_without_match_is_noop() {
        let mut table = render_grid("t", vec![col("A", &["x", ""])]).unwrap();
        let before = table.clone();
        table.close_rule_below_last(":ref:", 2);
        assert_eq!(table, before);
    }
}
