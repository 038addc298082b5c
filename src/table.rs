// src/table.rs
//
// In-memory tabular data: named columns, ordered rows of strings. This is
// the shape every stage after extraction works with, and what the
// aggregated dataset is serialized from.

use std::io::{self, Write};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a `Year` column holding `year` in every row.
    pub fn tag_year(mut self, year: i32) -> Table {
        self.columns.push("Year".to_string());
        let tag = year.to_string();
        for row in &mut self.rows {
            row.push(tag.clone());
        }
        self
    }

    /// Move every row of `other` onto the end of `self`. The caller is
    /// responsible for having checked that the column sets agree.
    pub fn extend_from(&mut self, other: Table) {
        self.rows.extend(other.rows);
    }

    /// Serialize as CSV: header row first, RFC-style quoting only where a
    /// cell needs it.
    pub fn write_csv<W: Write>(&self, mut w: W) -> io::Result<()> {
        write_row(&mut w, &self.columns)?;
        for row in &self.rows {
            write_row(&mut w, row)?;
        }
        Ok(())
    }
}

fn needs_quotes(field: &str) -> bool {
    field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r')
}

fn write_row<W: Write>(w: &mut W, row: &[String]) -> io::Result<()> {
    let mut first = true;
    for cell in row {
        if !first {
            write!(w, ",")?;
        } else {
            first = false;
        }
        if needs_quotes(cell) {
            let escaped = cell.replace('"', "\"\"");
            write!(w, "\"{}\"", escaped)?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}
