use std::{fmt::Display, path::Path};

use crate::extract::ExtractError;

/// a comma-delimited text table with a header row. cells may be double
/// quoted with `""` escaping an inner quote: just enough csv for the hydride
/// index sheets this crate reads and writes, whose cells routinely contain
/// commas and semicolons
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let contents = crate::extract::read_out(&path)?;
        // spreadsheet exports love a byte-order mark
        let contents = contents.strip_prefix('\u{feff}').unwrap_or(&contents);
        let mut lines = contents.lines();
        let Some(header) = lines.next() else {
            return Ok(Self::default());
        };
        let headers = split_line(header);
        let mut rows = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let mut row = split_line(line);
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Self { headers, rows })
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ExtractError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_string()).map_err(|e| {
            ExtractError::WriteFileError(path.display().to_string(), e.kind())
        })
    }

    /// the position of the column named `name`
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn get(&self, row: usize, col: usize) -> &str {
        &self.rows[row][col]
    }

    /// append a column on the right. `cells` must hold one value per row
    pub fn push_column(&mut self, name: impl Into<String>, cells: Vec<String>) {
        debug_assert_eq!(cells.len(), self.rows.len());
        self.headers.push(name.into());
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.push(cell);
        }
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", join_line(&self.headers))?;
        for row in &self.rows {
            writeln!(f, "{}", join_line(row))?;
        }
        Ok(())
    }
}

/// tabular rendering for extractor records
pub trait Record {
    fn headers() -> Vec<String>;
    fn row(&self) -> Vec<String>;
}

pub fn tabulate<R: Record>(records: &[R]) -> Table {
    Table {
        headers: R::headers(),
        rows: records.iter().map(Record::row).collect(),
    }
}

/// an optional value as a cell, empty when absent
pub(crate) fn cell(v: Option<f64>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

fn quote(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_owned()
    }
}

fn join_line(cells: &[String]) -> String {
    cells.iter().map(|c| quote(c)).collect::<Vec<_>>().join(",")
}

/// split one line into cells, honoring double quotes. a quote opens a quoted
/// run only at the start of a cell; anywhere else it's literal
fn split_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cur = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    cur.push('"');
                } else {
                    quoted = false;
                }
            }
            '"' if cur.is_empty() => quoted = true,
            ',' if !quoted => cells.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    cells.push(cur);
    cells
}
