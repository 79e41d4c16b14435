use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::domain::TVError;
use crate::table::{ParseOptions, Table};
use crate::view::{Record, TableView};

/// The data of one logged in user: the current source file and its view.
///
/// A failed load never touches the current view, so the previous data stays
/// usable.
pub struct Session {
    source: PathBuf,
    options: ParseOptions,
    view: TableView,
}

impl Session {
    pub fn new(source: PathBuf, options: ParseOptions) -> Self {
        Self {
            source,
            options,
            view: TableView::empty(),
        }
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load_or_reload(&mut self, path: &Path) -> Result<Arc<Table>, TVError> {
        let table = match Table::load(path, &self.options) {
            Ok(table) => Arc::new(table),
            Err(e) => {
                error!("Loading failed, keeping {} rows: {e}", self.view.table().nrows());
                return Err(e);
            }
        };
        self.source = path.to_path_buf();
        self.view.reload(Arc::clone(&table));
        info!("Session now shows {} records", table.nrows());
        Ok(table)
    }

    /// Load the current source file again.
    pub fn refresh(&mut self) -> Result<Arc<Table>, TVError> {
        let source = self.source.clone();
        self.load_or_reload(&source)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn view(&self) -> &TableView {
        &self.view
    }

    pub fn set_filter(&mut self, text: &str) {
        self.view.set_filter(text);
    }

    pub fn row_count(&self) -> usize {
        self.view.row_count()
    }

    pub fn cell_at(&self, view_row: usize, column: usize) -> Result<&str, TVError> {
        self.view.cell_at(view_row, column)
    }

    pub fn detail_of(&self, view_row: usize) -> Result<Record, TVError> {
        self.view.detail_of(view_row)
    }
}
