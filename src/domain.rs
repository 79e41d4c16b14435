use std::io;
use std::path::PathBuf;

use clap::Parser;
use derive_setters::Setters;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::table::{ParseOptions, Quoting, RowOverflow};

pub const DEFAULT_DATA_FILE: &str = "Crime_Investigation_Records.csv";
pub const DEFAULT_LOG_FILE: &str = "crv.log";

#[derive(Debug, Error)]
pub enum TVError {
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("CSV file not found at: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),
    #[error("CSV file is empty")]
    EmptyInput,
    #[error("Line {line} has {found} fields, the header only has {expected}")]
    MalformedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Cell ({row}, {column}) is outside of the view ({rows} rows, {columns} columns)")]
    IndexOutOfRange {
        row: usize,
        rows: usize,
        column: usize,
        columns: usize,
    },
    #[error("Loading failed: {0}")]
    LoadingFailed(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Could not set up logging: {0}")]
    Logging(String),
}

#[derive(Parser, Debug, Clone, Setters)]
#[command(name = "crv", version, about = "A tui viewer for crime investigation records.")]
pub struct TVConfig {
    /// Delimited text file that is loaded after login
    #[arg(value_name = "FILE", default_value = DEFAULT_DATA_FILE)]
    pub path: PathBuf,

    /// Field delimiter
    #[arg(short, long, default_value_t = ',')]
    pub delimiter: char,

    /// How fields are split. `plain` splits on every delimiter.
    #[arg(long, value_enum, default_value_t = Quoting::Plain)]
    pub quoting: Quoting,

    /// What to do with rows that have more fields than the header
    #[arg(long, value_enum, default_value_t = RowOverflow::Truncate)]
    pub overflow: RowOverflow,

    /// Maximal rendered width of a column
    #[arg(long, default_value_t = 40)]
    pub max_column_width: usize,

    /// Terminal event poll timeout in ms
    #[arg(long, default_value_t = 100)]
    pub event_poll_time: u64,

    /// Log file, defaults to crv.log in the temp directory
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

impl Default for TVConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATA_FILE),
            delimiter: ',',
            quoting: Quoting::Plain,
            overflow: RowOverflow::Truncate,
            max_column_width: 40,
            event_poll_time: 100,
            log_file: None,
        }
    }
}

impl TVConfig {
    /// Expand `~` and environment variables in the data file path.
    pub fn expand_path(self) -> Result<Self, TVError> {
        let raw = self.path.to_string_lossy().into_owned();
        let expanded = shellexpand::full(&raw).map_err(|e| TVError::InvalidPath(e.to_string()))?;
        let path = PathBuf::from(expanded.as_ref());
        Ok(self.path(path))
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_FILE))
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            delimiter: self.delimiter,
            quoting: self.quoting,
            overflow: self.overflow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    Username,
    Password,
    Search,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Enter,
    Exit,
    Search,
    ClearSearch,
    Refresh,
    Logout,
    CopyCell,
    CopyRow,
    ToggleIndex,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Navigation
  ←↓↑→ / hjkl     move selection
  PgUp / PgDn     move one page
  g / G           first / last record
  Enter           show record details
  i               toggle row index

Search
  /               search all columns (case insensitive)
  c               clear search
  Esc             clear search / close popup

Session
  r               reload file from disk
  y               copy selected cell
  Y               copy record as CSV line
  L               logout
  q / Ctrl-c      quit
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_default_config() {
        let parsed = TVConfig::try_parse_from(["crv"]).unwrap();
        let default = TVConfig::default();
        assert_eq!(parsed.path, default.path);
        assert_eq!(parsed.delimiter, default.delimiter);
        assert_eq!(parsed.quoting, default.quoting);
        assert_eq!(parsed.overflow, default.overflow);
        assert_eq!(parsed.max_column_width, default.max_column_width);
        assert_eq!(parsed.event_poll_time, default.event_poll_time);
        assert_eq!(parsed.log_file, None);
    }

    #[test]
    fn cli_overrides() {
        let parsed = TVConfig::try_parse_from([
            "crv",
            "records.tsv",
            "-d",
            ";",
            "--quoting",
            "quoted",
            "--overflow",
            "reject",
        ])
        .unwrap();
        assert_eq!(parsed.path, PathBuf::from("records.tsv"));
        let options = parsed.parse_options();
        assert_eq!(options.delimiter, ';');
        assert_eq!(options.quoting, Quoting::Quoted);
        assert_eq!(options.overflow, RowOverflow::Reject);
    }

    #[test]
    fn expand_path_keeps_plain_paths() {
        let config = TVConfig::default().path(PathBuf::from("data/records.csv"));
        let config = config.expand_path().unwrap();
        assert_eq!(config.path, PathBuf::from("data/records.csv"));
    }

    #[test]
    fn missing_file_error_mentions_path() {
        let err = TVError::SourceNotFound(PathBuf::from("nope.csv"));
        assert_eq!(err.to_string(), "CSV file not found at: nope.csv");
    }
}
