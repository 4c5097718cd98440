//! Plain-text tables for listings.

use unicode_width::UnicodeWidthStr;

const COLUMN_GAP: &str = "  ";

/// A header row plus data rows, rendered with aligned columns.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Render the header, an underline, and every row. Lines carry no
    /// trailing whitespace and there is no final newline.
    pub fn render(&self) -> String {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);

        let mut widths = vec![0usize; columns];
        for row in std::iter::once(&self.headers).chain(&self.rows) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        let underline: Vec<String> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, _)| "-".repeat(widths[i]))
            .collect();

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(render_row(&self.headers, &widths));
        lines.push(render_row(&underline, &widths));
        for row in &self.rows {
            lines.push(render_row(row, &widths));
        }
        lines.join("\n")
    }
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str(COLUMN_GAP);
        }
        line.push_str(cell);
        let pad = widths[i].saturating_sub(cell.width());
        line.extend(std::iter::repeat(' ').take(pad));
    }
    line.trim_end().to_string()
}
