//! Minimal CSV reading and writing for the tabular contracts
//!
//! Fields are comma separated; a field may be wrapped in double quotes, in
//! which case it can contain commas, line breaks and doubled (`""`) quotes.

use crate::errors::{ClusterError, ClusterResult};

/// A parsed CSV row together with the line it started on
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRecord {
    /// 1-based line number (the header is line 1)
    pub line: usize,
    /// Raw field values
    pub fields: Vec<String>,
}

impl CsvRecord {
    /// Field at a column index, `None` when the row is short
    pub fn get(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|s| s.as_str())
    }
}

/// A header row plus data rows
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CsvTable {
    /// Column names
    pub headers: Vec<String>,
    /// Data rows
    pub records: Vec<CsvRecord>,
}

impl CsvTable {
    /// Index of a column, matched case-insensitively and ignoring surrounding whitespace
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
    }

    /// Index of a column that must exist
    pub fn require_column(&self, name: &str) -> ClusterResult<usize> {
        self.column(name).ok_or_else(|| ClusterError::MalformedRecord {
            line: 1,
            reason: format!("missing column '{}' (found: {})", name, self.headers.join(", ")),
        })
    }
}

/// Parse CSV text whose first row is a header
pub fn parse_table(text: &str) -> ClusterResult<CsvTable> {
    let mut rows = parse_rows(text)?;
    if rows.is_empty() {
        return Ok(CsvTable::default());
    }

    let header = rows.remove(0);
    Ok(CsvTable {
        headers: header.fields,
        records: rows,
    })
}

/// Split CSV text into rows, skipping blank lines
fn parse_rows(text: &str) -> ClusterResult<Vec<CsvRecord>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                push_row(&mut rows, std::mem::take(&mut fields), row_start);
                line += 1;
                row_start = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ClusterError::MalformedRecord {
            line: row_start,
            reason: "unterminated quoted field".to_string(),
        });
    }

    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        push_row(&mut rows, fields, row_start);
    }

    Ok(rows)
}

fn push_row(rows: &mut Vec<CsvRecord>, fields: Vec<String>, line: usize) {
    let blank = fields.iter().all(|f| f.trim().is_empty());
    if !blank {
        rows.push(CsvRecord { line, fields });
    }
}

/// Quote a field when it contains a delimiter, quote or line break
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Append one row to a CSV buffer
pub fn push_record<S: AsRef<str>>(buffer: &mut String, fields: &[S]) {
    let line: Vec<String> = fields.iter().map(|f| escape_field(f.as_ref())).collect();
    buffer.push_str(&line.join(","));
    buffer.push('\n');
}
