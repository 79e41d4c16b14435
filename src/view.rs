use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::domain::TVError;
use crate::table::Table;

/// Case insensitive literal substring test over the cells of a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    text: String,
    needle: String,
}

impl Predicate {
    /// Returns `None` for search text that is empty after trimming.
    pub fn new(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            needle: text.to_lowercase(),
        })
    }

    pub fn matches(&self, cells: &[String]) -> bool {
        cells.iter().any(|c| c.to_lowercase().contains(&self.needle))
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// One record resolved from a view row, columns in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub model_row: usize,
    pub fields: Vec<(String, String)>,
}

impl Record {
    /// The record as a single CSV line, quoting cells where needed.
    pub fn to_csv_line(&self) -> String {
        self.fields
            .iter()
            .map(|(_, value)| wrap_cell_content(value))
            .collect::<Vec<String>>()
            .join(",")
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.fields.iter() {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_escaping || needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}

/// Filtered projection of a [`Table`].
///
/// `rows` maps view rows to model rows. It is rebuilt from scratch whenever
/// the table or the filter changes and is always strictly increasing.
pub struct TableView {
    table: Arc<Table>,
    filter: Option<Predicate>,
    rows: Vec<usize>,
}

impl TableView {
    pub fn new(table: Arc<Table>) -> Self {
        let mut view = Self {
            table,
            filter: None,
            rows: Vec::new(),
        };
        view.rebuild();
        view
    }

    pub fn empty() -> Self {
        Self::new(Arc::new(Table::default()))
    }

    pub fn set_filter(&mut self, text: &str) {
        self.filter = Predicate::new(text);
        self.rebuild();
    }

    pub fn clear_filter(&mut self) {
        self.set_filter("");
    }

    pub fn filter_text(&self) -> Option<&str> {
        self.filter.as_ref().map(|p| p.text())
    }

    /// Replace the table, dropping any active filter.
    pub fn reload(&mut self, table: Arc<Table>) {
        self.table = table;
        self.filter = None;
        self.rebuild();
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.table.ncolumns()
    }

    pub fn columns(&self) -> &[String] {
        self.table.columns()
    }

    pub fn indices(&self) -> &[usize] {
        &self.rows
    }

    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn model_row(&self, view_row: usize) -> Result<usize, TVError> {
        self.rows
            .get(view_row)
            .copied()
            .ok_or_else(|| self.out_of_range(view_row, 0))
    }

    pub fn row_at(&self, view_row: usize) -> Result<&[String], TVError> {
        let model_row = self.model_row(view_row)?;
        Ok(&self.table.rows()[model_row])
    }

    pub fn cell_at(&self, view_row: usize, column: usize) -> Result<&str, TVError> {
        if column >= self.column_count() {
            return Err(self.out_of_range(view_row, column));
        }
        let row = self
            .row_at(view_row)
            .map_err(|_| self.out_of_range(view_row, column))?;
        Ok(&row[column])
    }

    pub fn detail_of(&self, view_row: usize) -> Result<Record, TVError> {
        let model_row = self.model_row(view_row)?;
        let fields = self
            .columns()
            .iter()
            .cloned()
            .zip(self.table.rows()[model_row].iter().cloned())
            .collect();
        Ok(Record { model_row, fields })
    }

    fn out_of_range(&self, row: usize, column: usize) -> TVError {
        TVError::IndexOutOfRange {
            row,
            rows: self.row_count(),
            column,
            columns: self.column_count(),
        }
    }

    fn rebuild(&mut self) {
        let rows = self.table.rows();
        self.rows = match &self.filter {
            None => (0..rows.len()).collect(),
            Some(predicate) => rows
                .iter()
                .enumerate()
                .filter(|(_, cells)| predicate.matches(cells))
                .map(|(idx, _)| idx)
                .collect(),
        };
        trace!(
            "Rebuilt view: {} of {} rows, filter {:?}",
            self.rows.len(),
            rows.len(),
            self.filter_text()
        );
    }
}
