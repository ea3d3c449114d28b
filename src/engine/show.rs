//! Boxed tabular rendering of frames.

use std::fmt;

use super::Frame;

/// Rows rendered by `Display`.
pub const DEFAULT_SHOW_ROWS: usize = 20;

/// Cells longer than this are cut and suffixed with `...`.
const MAX_CELL_WIDTH: usize = 20;

fn truncate_cell(cell: String) -> String {
    if cell.chars().count() <= MAX_CELL_WIDTH {
        return cell;
    }
    let kept: String = cell.chars().take(MAX_CELL_WIDTH - 3).collect();
    format!("{}...", kept)
}

impl Frame {
    /// Render the first `num_rows` rows as a boxed table with right-aligned cells.
    pub fn show_string(&self, num_rows: usize) -> String {
        let header: Vec<String> = self.columns().iter().cloned().map(truncate_cell).collect();
        let body: Vec<Vec<String>> = self
            .rows()
            .iter()
            .take(num_rows)
            .map(|row| row.iter().map(|v| truncate_cell(v.to_string())).collect())
            .collect();

        let widths: Vec<usize> = header
            .iter()
            .enumerate()
            .map(|(i, h)| {
                body.iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
                    .max(3)
            })
            .collect();

        let separator: String = widths.iter().fold(String::from("+"), |mut acc, w| {
            acc.push_str(&"-".repeat(*w));
            acc.push('+');
            acc
        });
        let render_row = |cells: &[String]| -> String {
            let mut line = String::from("|");
            for (cell, w) in cells.iter().zip(&widths) {
                line.push_str(&format!("{:>width$}|", cell, width = w));
            }
            line
        };

        let mut out = String::new();
        out.push_str(&separator);
        out.push('\n');
        out.push_str(&render_row(&header));
        out.push('\n');
        out.push_str(&separator);
        out.push('\n');
        for row in &body {
            out.push_str(&render_row(row));
            out.push('\n');
        }
        out.push_str(&separator);
        out.push('\n');

        if self.count() > num_rows {
            let noun = if num_rows == 1 { "row" } else { "rows" };
            out.push_str(&format!("only showing top {} {}\n", num_rows, noun));
        }
        out
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.show_string(DEFAULT_SHOW_ROWS))
    }
}
