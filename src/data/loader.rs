//! CSV ingestion
//!
//! Loading does exactly one read and then cleans the frame in memory:
//! text columns are trimmed, temporal columns are parsed into polars `Date`
//! columns, and exact duplicate records are dropped (first occurrence kept).

use super::dates::{to_epoch_days, DateParser, ParsedDate};
use super::schema::TEMPORAL_COLUMNS;
use super::{Dataset, Schema};
use crate::error::{DataWarning, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Rows scanned to infer column types
const INFER_SCHEMA_ROWS: usize = 10_000;

/// Loader for raw transaction files
#[derive(Debug, Clone)]
pub struct DataLoader {
    parser: DateParser,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            parser: DateParser::default(),
        }
    }

    /// Read a comma-separated file and clean it into a [`Dataset`].
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        let start = Instant::now();

        let file = File::open(path)?;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .with_parse_options(CsvParseOptions::default().with_encoding(CsvEncoding::LossyUtf8))
            .into_reader_with_file_handle(file)
            .finish()?;

        info!(
            path = %path.display(),
            rows = df.height(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Read transaction file"
        );

        self.clean(df)
    }

    /// Trim text, parse dates and drop duplicate records of an in-memory frame.
    pub fn clean(&self, mut df: DataFrame) -> Result<Dataset> {
        let mut warnings = Vec::new();

        trim_text_columns(&mut df)?;
        self.parse_temporal_columns(&mut df, &mut warnings)?;

        let before = df.height();
        let df = drop_duplicate_rows(&df)?;
        let removed = before - df.height();
        if removed > 0 {
            info!(removed, remaining = df.height(), "Dropped duplicate records");
        }

        let schema = Schema::from_frame(&df);
        Ok(Dataset::from_parts(df, schema, warnings))
    }

    fn parse_temporal_columns(&self, df: &mut DataFrame, warnings: &mut Vec<DataWarning>) -> Result<()> {
        for name in TEMPORAL_COLUMNS {
            let text = match df.column(name) {
                Ok(column) if matches!(column.dtype(), DataType::Date) => continue,
                Ok(column) => column.cast(&DataType::String)?,
                Err(_) => continue,
            };

            let mut days: Vec<Option<i32>> = Vec::with_capacity(text.len());
            let mut lenient = 0usize;
            let mut unparseable = 0usize;

            for (row, value) in text.str()?.into_iter().enumerate() {
                let parsed = value.map_or(ParsedDate::Missing, |v| self.parser.parse(v));
                match parsed {
                    ParsedDate::Strict(date) => days.push(Some(to_epoch_days(date))),
                    ParsedDate::Lenient(date) => {
                        lenient += 1;
                        days.push(Some(to_epoch_days(date)));
                    }
                    ParsedDate::Missing => {
                        if let Some(raw) = value.filter(|v| !v.trim().is_empty()) {
                            debug!(column = name, row, value = raw, "Unparseable date");
                            unparseable += 1;
                            warnings.push(DataWarning::UnparseableDate {
                                column: name.to_string(),
                                row,
                                value: raw.to_string(),
                            });
                        }
                        days.push(None);
                    }
                }
            }

            if lenient > 0 {
                debug!(column = name, lenient, "Dates parsed with lenient fallback");
            }
            if unparseable > 0 {
                warn!(column = name, unparseable, "Unparseable dates recorded as missing");
            }

            let series = Series::new(name.into(), days).cast(&DataType::Date)?;
            df.with_column(series)?;
        }
        Ok(())
    }
}

/// Load a transaction file with the default loader.
pub fn read_superstore(path: impl AsRef<Path>) -> Result<Dataset> {
    DataLoader::new().load(path)
}

fn trim_text_columns(df: &mut DataFrame) -> Result<()> {
    let text_columns: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|c| matches!(c.dtype(), DataType::String))
        .map(|c| c.name().to_string())
        .collect();

    for name in text_columns {
        let trimmed: Vec<Option<String>> = df
            .column(&name)?
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.trim().to_string()))
            .collect();
        df.with_column(Series::new(name.as_str().into(), trimmed))?;
    }
    Ok(())
}

/// Keep the first occurrence of every distinct record, preserving order.
/// Rows compare by typed value; nulls compare equal to each other.
fn drop_duplicate_rows(df: &DataFrame) -> Result<DataFrame> {
    Ok(df.unique_stable(None, UniqueKeepStrategy::First, None)?)
}
