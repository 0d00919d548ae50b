//! Calendar features derived from temporal columns

use crate::data::dates::{from_epoch_days, to_epoch_days, DateParser};
use crate::error::Result;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// Date parts of the order date, one entry per record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateParts {
    pub years: Vec<Option<i32>>,
    pub months: Vec<Option<i32>>,
    /// Day of week, Monday = 0
    pub weekdays: Vec<Option<i32>>,
}

/// Days since the Unix epoch for a temporal column.
///
/// Returns `None` when the column is absent or holds neither dates nor text.
/// Text columns are parsed on the fly so frames that skipped ingestion still
/// derive features.
pub fn epoch_days(frame: &DataFrame, name: &str) -> Result<Option<Vec<Option<i32>>>> {
    let Ok(column) = frame.column(name) else {
        return Ok(None);
    };

    match column.dtype() {
        DataType::Date => {
            let physical = column.cast(&DataType::Int32)?;
            let days: Vec<Option<i32>> = physical.i32()?.into_iter().collect();
            Ok(Some(days))
        }
        DataType::String => {
            let parser = DateParser::default();
            let days: Vec<Option<i32>> = column
                .str()?
                .into_iter()
                .map(|v| v.and_then(|s| parser.parse(s).date()).map(to_epoch_days))
                .collect();
            Ok(Some(days))
        }
        _ => Ok(None),
    }
}

/// Whole days from `start` to `end`; missing when either side is missing.
pub fn day_differences(start: &[Option<i32>], end: &[Option<i32>]) -> Vec<Option<f64>> {
    start
        .iter()
        .zip(end)
        .map(|(s, e)| match (s, e) {
            (Some(s), Some(e)) => Some(f64::from(e - s)),
            _ => None,
        })
        .collect()
}

pub fn date_parts(days: &[Option<i32>]) -> DateParts {
    let mut parts = DateParts {
        years: Vec::with_capacity(days.len()),
        months: Vec::with_capacity(days.len()),
        weekdays: Vec::with_capacity(days.len()),
    };

    for date in days.iter().map(|d| d.and_then(from_epoch_days)) {
        parts.years.push(date.map(|d: NaiveDate| d.year()));
        parts.months.push(date.map(|d| d.month() as i32));
        parts
            .weekdays
            .push(date.map(|d| d.weekday().num_days_from_monday() as i32));
    }
    parts
}
