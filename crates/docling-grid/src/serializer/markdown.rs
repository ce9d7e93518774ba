//! Markdown (pipe table) serialization and reading.
//!
//! Tables render like Python tabulate's `pipe` format: a header row, a dash
//! rule, then body rows. Column widths use Unicode display width so CJK text
//! stays aligned in monospace fonts.

use unicode_width::UnicodeWidthStr;

use crate::table::{ExtractedTable, Table};

/// Options for Markdown serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkdownOptions {
    /// Right-align integer, decimal, percentage and currency columns.
    ///
    /// Default: `true`.
    pub right_align_numeric: bool,

    /// Insert a `<!-- page N, table K -->` comment before each table.
    ///
    /// Default: `false`.
    pub table_comments: bool,
}

impl Default for MarkdownOptions {
    #[inline]
    fn default() -> Self {
        Self {
            right_align_numeric: true,
            table_comments: false,
        }
    }
}

/// Markdown serializer for extracted tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MarkdownSerializer {
    options: MarkdownOptions,
}

impl MarkdownSerializer {
    /// Create a new markdown serializer with default options
    #[inline]
    #[must_use = "creates serializer with default options"]
    pub const fn new() -> Self {
        Self {
            options: MarkdownOptions {
                right_align_numeric: true,
                table_comments: false,
            },
        }
    }

    /// Create a new markdown serializer with custom options
    #[inline]
    #[must_use = "creates serializer with custom options"]
    pub const fn with_options(options: MarkdownOptions) -> Self {
        Self { options }
    }

    /// Serialize several tables, separated by a blank line.
    #[must_use = "serialization returns markdown string"]
    pub fn serialize_tables(&self, tables: &[ExtractedTable]) -> String {
        tables
            .iter()
            .map(|extracted| {
                let body = self.serialize_table(&extracted.table);
                if self.options.table_comments {
                    format!(
                        "<!-- page {}, table {} -->\n{body}",
                        extracted.page_number, extracted.table_index
                    )
                } else {
                    body
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Serialize one table; no trailing newline.
    #[must_use = "serialization returns markdown string"]
    pub fn serialize_table(&self, table: &Table) -> String {
        let num_cols = table.num_cols();

        let headers: Vec<String> = table.headers.iter().map(|h| escape_cell(h)).collect();
        let body: Vec<Vec<String>> = table
            .rows
            .iter()
            .map(|row| row.iter().map(|value| escape_cell(&value.render())).collect())
            .collect();

        // width = max(header + 2, widest value), as tabulate does
        let mut col_widths: Vec<usize> = headers.iter().map(|h| h.width() + 2).collect();
        for row in &body {
            for (col_idx, text) in row.iter().enumerate().take(num_cols) {
                col_widths[col_idx] = col_widths[col_idx].max(text.width());
            }
        }

        let right_aligned: Vec<bool> = (0..num_cols)
            .map(|col| {
                self.options.right_align_numeric
                    && table
                        .profiles
                        .get(col)
                        .is_some_and(|p| p.column_type.is_numeric())
            })
            .collect();

        let render_row = |cells: &[String]| {
            let padded: Vec<String> = cells
                .iter()
                .enumerate()
                .map(|(idx, text)| format!(" {} ", pad(text, col_widths[idx], right_aligned[idx])))
                .collect();
            format!("|{}|", padded.join("|"))
        };

        let mut result = Vec::with_capacity(body.len() + 2);
        result.push(render_row(&headers));
        let separators: Vec<String> = col_widths
            .iter()
            .map(|&width| "-".repeat(width + 2))
            .collect();
        result.push(format!("|{}|", separators.join("|")));
        for row in &body {
            result.push(render_row(row));
        }

        result.join("\n")
    }
}

/// Pad to `width` display columns
fn pad(text: &str, width: usize, right: bool) -> String {
    let fill = " ".repeat(width.saturating_sub(text.width()));
    if right {
        format!("{fill}{text}")
    } else {
        format!("{text}{fill}")
    }
}

/// Escape `|` so it does not end the cell
#[must_use]
pub fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// Pipe table read back from Markdown; cells are unescaped, trimmed text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read every pipe table in `markdown`.
///
/// A table is a run of lines starting with `|` whose second line is a dash
/// rule. Other lines (comments, prose) separate tables.
#[must_use]
pub fn parse_markdown_tables(markdown: &str) -> Vec<MarkdownTable> {
    let mut tables = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in markdown.lines().map(str::trim) {
        if line.starts_with('|') {
            block.push(line);
            continue;
        }
        if let Some(table) = parse_block(&block) {
            tables.push(table);
        }
        block.clear();
    }
    if let Some(table) = parse_block(&block) {
        tables.push(table);
    }

    tables
}

fn parse_block(lines: &[&str]) -> Option<MarkdownTable> {
    let (header, rest) = lines.split_first()?;
    let (rule, body) = rest.split_first()?;
    let is_rule = rule
        .chars()
        .all(|c| matches!(c, '|' | '-' | ':' | ' '))
        && rule.contains('-');
    if !is_rule {
        return None;
    }
    Some(MarkdownTable {
        headers: split_row(header),
        rows: body.iter().map(|line| split_row(line)).collect(),
    })
}

/// Split `| a | b\|c |` into `["a", "b|c"]`
fn split_row(line: &str) -> Vec<String> {
    let inner = line.strip_prefix('|').unwrap_or(line);
    let inner = inner.strip_suffix('|').unwrap_or(inner);

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ColumnType, ColumnTypeProfile, TypedValue};

    fn sample_table() -> Table {
        Table {
            headers: vec!["Item".to_string(), "Qty".to_string()],
            header_detected: true,
            profiles: vec![
                ColumnTypeProfile::new(ColumnType::String, 2, 2),
                ColumnTypeProfile::new(ColumnType::Integer, 2, 2),
            ],
            rows: vec![
                vec![TypedValue::Text("Apples".to_string()), TypedValue::Integer(1200)],
                vec![TypedValue::Text("a|b".to_string()), TypedValue::Integer(15)],
            ],
            cells: Vec::new(),
        }
    }

    #[test]
    fn test_serialize_table_layout() {
        let markdown = MarkdownSerializer::new().serialize_table(&sample_table());
        let expected = "\
| Item   |   Qty |
|--------|-------|
| Apples |  1200 |
| a\\|b   |    15 |";
        assert_eq!(markdown, expected);
    }

    #[test]
    fn test_left_align_when_disabled() {
        let serializer = MarkdownSerializer::with_options(MarkdownOptions {
            right_align_numeric: false,
            ..MarkdownOptions::default()
        });
        let markdown = serializer.serialize_table(&sample_table());
        assert!(markdown.contains("| 1200  |"));
    }

    #[test]
    fn test_cjk_width_alignment() {
        let table = Table {
            headers: vec!["名前".to_string()],
            header_detected: true,
            profiles: vec![ColumnTypeProfile::new(ColumnType::String, 1, 1)],
            rows: vec![vec![TypedValue::Text("東京都".to_string())]],
            cells: Vec::new(),
        };
        let markdown = MarkdownSerializer::new().serialize_table(&table);
        let widths: Vec<usize> = markdown.lines().map(UnicodeWidthStr::width).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{markdown}");
    }

    #[test]
    fn test_parse_round_trip() {
        let markdown = MarkdownSerializer::new().serialize_table(&sample_table());
        let parsed = parse_markdown_tables(&markdown);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].headers, vec!["Item", "Qty"]);
        assert_eq!(parsed[0].rows[1], vec!["a|b", "15"]);
    }

    #[test]
    fn test_parse_multiple_tables_and_skip_prose() {
        let text = "intro\n| a |\n|---|\n| 1 |\n\n<!-- page 1, table 2 -->\n| b | c |\n|:--|--:|\n";
        let parsed = parse_markdown_tables(text);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].rows, vec![vec!["1".to_string()]]);
        assert_eq!(parsed[1].headers, vec!["b", "c"]);
        assert!(parsed[1].rows.is_empty());
    }

    #[test]
    fn test_split_row_keeps_empty_cells() {
        assert_eq!(split_row("|  | x |"), vec!["", "x"]);
    }
}
