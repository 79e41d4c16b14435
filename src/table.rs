use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use clap::ValueEnum;
use tracing::{debug, info, instrument};

use crate::domain::TVError;

const BOM: char = '\u{feff}';
const QUOTE: char = '"';

/// How a line is split into fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Quoting {
    /// Split on every delimiter, a delimiter inside a value splits the value.
    #[default]
    Plain,
    /// Delimiters inside double quoted fields are kept, `""` is a literal quote.
    Quoted,
}

/// What happens to rows with more fields than the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RowOverflow {
    /// Drop the trailing extra fields.
    #[default]
    Truncate,
    /// Abort the whole load.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParseOptions {
    pub delimiter: char,
    pub quoting: Quoting,
    pub overflow: RowOverflow,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quoting: Quoting::Plain,
            overflow: RowOverflow::Truncate,
        }
    }
}

/// A fully parsed delimited file: header plus rows of string cells.
///
/// Every row has exactly as many cells as there are columns.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path, options: &ParseOptions) -> Result<Self, TVError> {
        let metadata = fs::metadata(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TVError::SourceNotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => TVError::PermissionDenied(path.to_path_buf()),
            _ => TVError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(TVError::LoadingFailed("Not a file!".into()));
        }

        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => TVError::PermissionDenied(path.to_path_buf()),
            _ => TVError::IoError(e),
        })?;
        let table = Self::parse(&text, options)?;
        info!(
            "Loaded {} rows with {} columns from {} bytes",
            table.nrows(),
            table.ncolumns(),
            metadata.len()
        );
        Ok(table)
    }

    pub fn parse(text: &str, options: &ParseOptions) -> Result<Self, TVError> {
        let text = text.strip_prefix(BOM).unwrap_or(text);
        let mut lines = text.lines();
        let header = lines.next().ok_or(TVError::EmptyInput)?;
        let columns = split_line(header, options);
        let width = columns.len();

        let mut rows = Vec::new();
        for (idx, line) in lines.enumerate() {
            let mut row = split_line(line, options);
            if row.len() > width {
                match options.overflow {
                    RowOverflow::Truncate => {
                        debug!("Truncating line {} from {} to {} fields", idx + 2, row.len(), width);
                        row.truncate(width);
                    }
                    RowOverflow::Reject => {
                        return Err(TVError::MalformedRow {
                            line: idx + 2,
                            expected: width,
                            found: row.len(),
                        });
                    }
                }
            }
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&[String]> {
        self.rows.get(idx).map(|r| r.as_slice())
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncolumns(&self) -> usize {
        self.columns.len()
    }
}

fn split_line(line: &str, options: &ParseOptions) -> Vec<String> {
    let fields: Vec<String> = match options.quoting {
        Quoting::Plain => line.split(options.delimiter).map(str::to_string).collect(),
        Quoting::Quoted => split_quoted(line, options.delimiter),
    };
    fields.into_iter().map(|f| f.trim().to_string()).collect()
}

fn split_quoted(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == QUOTE {
            if in_quotes && chars.peek() == Some(&QUOTE) {
                // Escaped quote
                current.push(QUOTE);
                chars.next();
            } else {
                in_quotes = !in_quotes;
            }
        } else if ch == delimiter && !in_quotes {
            fields.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(text: &str) -> Table {
        Table::parse(text, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn short_rows_are_padded() {
        let table = parse("Case_ID,Crime_Type,Date\nC1,Theft,2020-01-01\nC2,Assault\n");
        assert_eq!(table.columns(), ["Case_ID", "Crime_Type", "Date"]);
        assert_eq!(table.rows()[0], ["C1", "Theft", "2020-01-01"]);
        assert_eq!(table.rows()[1], ["C2", "Assault", ""]);
    }

    #[test]
    fn padding_keeps_field_positions() {
        let table = parse("a,b,c,d\n1\n,2\n");
        assert_eq!(table.rows()[0], ["1", "", "", ""]);
        assert_eq!(table.rows()[1], ["", "2", "", ""]);
    }

    #[test]
    fn every_row_has_header_width() {
        let table = parse("a,b,c\n1\n1,2\n1,2,3\n1,2,3,4,5\n\n");
        assert_eq!(table.nrows(), 5);
        assert!(table.rows().iter().all(|r| r.len() == table.ncolumns()));
    }

    #[test]
    fn long_rows_are_truncated_by_default() {
        let table = parse("a,b\n1,2,3,4\n");
        assert_eq!(table.rows()[0], ["1", "2"]);
    }

    #[test]
    fn long_rows_can_be_rejected() {
        let options = ParseOptions {
            overflow: RowOverflow::Reject,
            ..ParseOptions::default()
        };
        let err = Table::parse("a,b\n1,2\n1,2,3\n", &options).unwrap_err();
        assert!(matches!(
            err,
            TVError::MalformedRow {
                line: 3,
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn empty_text_is_an_error() {
        let err = Table::parse("", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, TVError::EmptyInput));
    }

    #[test]
    fn header_only_has_no_rows() {
        let table = parse("Case_ID,Crime_Type\n");
        assert_eq!(table.ncolumns(), 2);
        assert_eq!(table.nrows(), 0);
    }

    #[test]
    fn fields_are_trimmed() {
        let table = parse(" Case_ID , Crime_Type \n  C1 ,Theft  \n");
        assert_eq!(table.columns(), ["Case_ID", "Crime_Type"]);
        assert_eq!(table.rows()[0], ["C1", "Theft"]);
    }

    #[test]
    fn crlf_and_bom_are_handled() {
        let table = parse("\u{feff}id,type\r\n1,Theft\r\n2,Fraud\r\n");
        assert_eq!(table.columns(), ["id", "type"]);
        assert_eq!(table.rows()[1], ["2", "Fraud"]);
    }

    #[test]
    fn plain_split_breaks_quoted_values() {
        let table = parse("id,location\n1,\"Main St, 5\"\n");
        assert_eq!(table.rows()[0], ["1", "\"Main St"]);
    }

    #[test]
    fn quoted_split_keeps_delimiters() {
        let options = ParseOptions {
            quoting: Quoting::Quoted,
            ..ParseOptions::default()
        };
        let table = Table::parse("id,location,note\n1,\"Main St, 5\",\"said \"\"hi\"\"\"\n", &options).unwrap();
        assert_eq!(table.rows()[0], ["1", "Main St, 5", "said \"hi\""]);
    }

    #[test]
    fn custom_delimiter() {
        let options = ParseOptions {
            delimiter: ';',
            ..ParseOptions::default()
        };
        let table = Table::parse("a;b\n1,5;2\n", &options).unwrap();
        assert_eq!(table.rows()[0], ["1,5", "2"]);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        let err = Table::load(&path, &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, TVError::SourceNotFound(p) if p == path));
    }

    #[test]
    fn load_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Table::load(dir.path(), &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, TVError::LoadingFailed(_)));
    }

    #[test]
    fn load_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let err = Table::load(file.path(), &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, TVError::EmptyInput));
    }

    #[test]
    fn load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Case_ID,Crime_Type,Date").unwrap();
        writeln!(file, "C1,Theft,2020-01-01").unwrap();
        let table = Table::load(file.path(), &ParseOptions::default()).unwrap();
        assert_eq!(table.nrows(), 1);
        assert_eq!(table.row(0).unwrap(), ["C1", "Theft", "2020-01-01"]);
        assert_eq!(table.row(1), None);
    }

    #[test]
    fn load_fixture() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/crime_records.csv");
        let table = Table::load(&path, &ParseOptions::default()).unwrap();
        assert_eq!(table.columns()[0], "Case_ID");
        assert!(table.nrows() > 0);
        assert!(table.rows().iter().all(|r| r.len() == table.ncolumns()));
    }
}
