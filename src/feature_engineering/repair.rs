//! Missing-value repair and range clamping for numeric columns

use crate::error::Result;
use polars::prelude::*;

/// Column as `Float64` with NaN entries turned into nulls.
pub fn observed_values(column: &Column) -> Result<Float64Chunked> {
    let cast = column.cast(&DataType::Float64)?;
    let values = cast.f64()?;
    Ok(Float64Chunked::from_iter_options(
        column.name().clone(),
        values.into_iter().map(|v| v.filter(|x| !x.is_nan())),
    ))
}

/// Fill nulls with the column median. Returns `None` when nothing is observed.
pub fn fill_with_median(values: &Float64Chunked) -> Result<Option<(Float64Chunked, f64)>> {
    let Some(median) = values.median() else {
        return Ok(None);
    };
    Ok(Some((values.fill_null_with_values(median)?, median)))
}

/// Clamp observed values into `[lower, upper]`, leaving nulls alone.
pub fn clamp_values(values: &Float64Chunked, lower: f64, upper: f64) -> Float64Chunked {
    values.apply_values(|x| x.clamp(lower, upper))
}
