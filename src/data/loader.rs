//! CSV Data Loader Module
//! Reads a tabular source with Polars and validates it against the event schema.

use crate::data::record::{EventRecord, Table, REQUIRED_COLUMNS};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Source not found: {}", path.display())]
    SourceNotFound { path: PathBuf },
    #[error("Failed to read source: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing required columns: {}", missing.join(", "))]
    SchemaError { missing: Vec<String> },
    #[error("Row {row}, column '{column}': cannot parse {value:?} ({reason})")]
    ParseError {
        row: usize,
        column: String,
        value: String,
        reason: String,
    },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
}

/// Where the event table comes from.
#[derive(Debug, Clone)]
pub enum DataSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl DataSource {
    /// Drain a stream into an in-memory source.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, LoaderError> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        Ok(DataSource::Bytes(buf))
    }

    fn describe(&self) -> String {
        match self {
            DataSource::Path(path) => path.display().to_string(),
            DataSource::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }
}

impl From<&Path> for DataSource {
    fn from(path: &Path) -> Self {
        DataSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for DataSource {
    fn from(path: PathBuf) -> Self {
        DataSource::Path(path)
    }
}

impl From<Vec<u8>> for DataSource {
    fn from(bytes: Vec<u8>) -> Self {
        DataSource::Bytes(bytes)
    }
}

/// Options passed through to the CSV reader.
#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    pub separator: u8,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self { separator: b',' }
    }
}

/// Loads event tables. Holds no data between calls.
#[derive(Debug, Clone, Default)]
pub struct DataLoader {
    options: LoaderOptions,
}

impl DataLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Load a CSV file from disk.
    pub fn load_csv(&self, file_path: impl AsRef<Path>) -> Result<Table, LoaderError> {
        self.load(&DataSource::Path(file_path.as_ref().to_path_buf()))
    }

    /// Load CSV content already held in memory.
    pub fn load_bytes(&self, bytes: impl Into<Vec<u8>>) -> Result<Table, LoaderError> {
        self.load(&DataSource::Bytes(bytes.into()))
    }

    /// Read, validate and type the source.
    #[instrument(skip(self, source), fields(source = %source.describe()))]
    pub fn load(&self, source: &DataSource) -> Result<Table, LoaderError> {
        let bytes = match source {
            DataSource::Path(path) => std::fs::read(path).map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => LoaderError::SourceNotFound { path: path.clone() },
                _ => LoaderError::Io(e),
            })?,
            DataSource::Bytes(bytes) => bytes.clone(),
        };

        let df = self.read_frame(bytes)?;
        Self::validate_schema(&df)?;
        let table = Self::build_table(&df)?;

        info!(rows = table.len(), "Loaded event table");
        Ok(table)
    }

    /// Tokenize the CSV with every column kept as text.
    fn read_frame(&self, bytes: Vec<u8>) -> Result<DataFrame, LoaderError> {
        let separator = self.options.separator;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .map_parse_options(|opts| opts.with_separator(separator))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()?;
        debug!(height = df.height(), width = df.width(), "CSV tokenized");
        Ok(df)
    }

    fn validate_schema(df: &DataFrame) -> Result<(), LoaderError> {
        let present: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|required| !present.iter().any(|p| p == *required))
            .map(|s| s.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoaderError::SchemaError { missing })
        }
    }

    fn build_table(df: &DataFrame) -> Result<Table, LoaderError> {
        let text = |name: &str| -> Result<StringChunked, LoaderError> {
            let column = df.column(name)?;
            let series = column.as_materialized_series();
            Ok(series.str()?.clone())
        };

        let dates = text("date")?;
        let platforms = text("platform")?;
        let views = text("views")?;
        let likes = text("likes")?;
        let comments = text("comments")?;
        let shares = text("shares")?;

        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let row = i + 1;
            let platform = required_cell(platforms.get(i), row, "platform")?;
            rows.push(EventRecord {
                date: parse_date(required_cell(dates.get(i), row, "date")?, row)?,
                platform: platform.to_string(),
                views: parse_count(views.get(i), row, "views")?,
                likes: parse_count(likes.get(i), row, "likes")?,
                comments: parse_count(comments.get(i), row, "comments")?,
                shares: parse_count(shares.get(i), row, "shares")?,
            });
        }

        Ok(Table::new(rows))
    }
}

fn required_cell<'a>(cell: Option<&'a str>, row: usize, column: &str) -> Result<&'a str, LoaderError> {
    match cell.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(LoaderError::ParseError {
            row,
            column: column.to_string(),
            value: String::new(),
            reason: "missing value".to_string(),
        }),
    }
}

fn parse_count(cell: Option<&str>, row: usize, column: &str) -> Result<f64, LoaderError> {
    let raw = required_cell(cell, row, column)?;
    let fail = |reason: &str| LoaderError::ParseError {
        row,
        column: column.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let value: f64 = raw.parse().map_err(|_| fail("not a number"))?;
    if !value.is_finite() {
        return Err(fail("not a finite number"));
    }
    if value < 0.0 {
        return Err(fail("negative value"));
    }
    Ok(value)
}

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Parse a timezone-naive timestamp. Offsets are dropped, keeping local wall-clock time.
pub fn parse_date(raw: &str, row: usize) -> Result<NaiveDateTime, LoaderError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Ok(date.and_time(chrono::NaiveTime::MIN));
        }
    }

    Err(LoaderError::ParseError {
        row,
        column: "date".to_string(),
        value: raw.to_string(),
        reason: "unrecognized date-time format".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    const HEADER: &str = "date,platform,views,likes,comments,shares\n";

    #[test]
    fn test_load_bytes_typed_rows() {
        let csv = format!(
            "{HEADER}2024-01-01 09:30:00,Instagram,100,10,5,5\n2024-02-01,Twitter,0,1,1,1\n"
        );
        let table = DataLoader::new().load_bytes(csv).unwrap();

        assert_eq!(table.len(), 2);
        let first = &table.rows()[0];
        assert_eq!(first.platform, "Instagram");
        assert_eq!(first.date.hour(), 9);
        assert_eq!(first.views, 100.0);
        assert_eq!(table.rows()[1].date.month(), 2);
        assert_eq!(table.rows()[1].views, 0.0);
    }

    #[test]
    fn test_extra_columns_and_order_ignored() {
        let csv = "id,shares,comments,likes,views,platform,date\n\
                   7,1,2,3,40,Twitter,2024-03-05T14:00:00\n";
        let table = DataLoader::new().load_bytes(csv).unwrap();
        let row = &table.rows()[0];
        assert_eq!((row.likes, row.comments, row.shares), (3.0, 2.0, 1.0));
        assert_eq!(row.date.hour(), 14);
    }

    #[test]
    fn test_missing_columns_listed() {
        let csv = "date,platform,views\n2024-01-01,A,1\n";
        match DataLoader::new().load_bytes(csv) {
            Err(LoaderError::SchemaError { missing }) => {
                assert_eq!(missing, vec!["likes", "comments", "shares"]);
            }
            other => panic!("expected SchemaError, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_date_reports_row_and_column() {
        let csv = format!("{HEADER}2024-01-01,A,1,1,1,1\nyesterday,A,1,1,1,1\n");
        match DataLoader::new().load_bytes(csv) {
            Err(LoaderError::ParseError { row, column, value, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "date");
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_and_negative_counts() {
        let csv = format!("{HEADER}2024-01-01,A,lots,1,1,1\n");
        assert!(matches!(
            DataLoader::new().load_bytes(csv),
            Err(LoaderError::ParseError { ref column, .. }) if column == "views"
        ));

        let csv = format!("{HEADER}2024-01-01,A,10,1,-1,1\n");
        assert!(matches!(
            DataLoader::new().load_bytes(csv),
            Err(LoaderError::ParseError { ref column, .. }) if column == "comments"
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = DataLoader::new()
            .load_csv("definitely/not/here.csv")
            .unwrap_err();
        assert!(matches!(err, LoaderError::SourceNotFound { .. }));
    }

    #[test]
    fn test_custom_separator() {
        let csv = "date;platform;views;likes;comments;shares\n2024-01-01;A;10;1;2;3\n";
        let loader = DataLoader::with_options(LoaderOptions { separator: b';' });
        let table = loader.load_bytes(csv).unwrap();
        assert_eq!(table.rows()[0].shares, 3.0);
    }

    #[test]
    fn test_from_reader() {
        let csv = format!("{HEADER}2024-01-01,A,10,1,2,3\n");
        let source = DataSource::from_reader(csv.as_bytes()).unwrap();
        let table = DataLoader::new().load(&source).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_parse_date_formats() {
        let rfc = parse_date("2024-05-06T07:08:09+02:00", 1).unwrap();
        assert_eq!((rfc.hour(), rfc.day()), (7, 6));

        let slash = parse_date("2024/05/06 23:15", 1).unwrap();
        assert_eq!(slash.hour(), 23);

        let date_only = parse_date("2024-05-06", 1).unwrap();
        assert_eq!(date_only.hour(), 0);

        assert!(parse_date("06/05/2024", 1).is_err());
    }
}
