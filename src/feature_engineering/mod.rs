//! Feature engineering
//!
//! Adds derived columns to a [`Dataset`] and repairs numeric columns:
//!
//! - `ShipDelayDays` when both order and ship dates are present
//! - `OrderYear`, `OrderMonth`, `OrderDow` when the order date is present
//! - `IsProfitable` when the profit column is present
//! - median repair of the numeric columns, then discount clamping
//!
//! Every derived column is only added when its source columns exist. A
//! missing source column is never an error.

pub mod repair;
pub mod temporal;

use crate::data::schema::{
    DISCOUNT, IS_PROFITABLE, ORDER_DATE, ORDER_DOW, ORDER_MONTH, ORDER_YEAR, PROFIT,
    REPAIRED_COLUMNS, SHIP_DATE, SHIP_DELAY_DAYS,
};
use crate::data::{float_values, Dataset};
use crate::error::{Result, SuperstoreError};
use polars::prelude::*;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Upper bound for discounts; larger values are treated as entry errors.
pub const MAX_DISCOUNT: f64 = 0.8;

/// Derives engineered columns and repairs missing numeric values
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    discount_bounds: (f64, f64),
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureEngineer {
    pub fn new() -> Self {
        Self {
            discount_bounds: (0.0, MAX_DISCOUNT),
        }
    }

    /// Override the closed range discounts are clamped into
    pub fn with_discount_bounds(mut self, lower: f64, upper: f64) -> Result<Self> {
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(SuperstoreError::ConfigError(format!(
                "discount bounds must satisfy lower <= upper, got [{}, {}]",
                lower, upper
            )));
        }
        self.discount_bounds = (lower, upper);
        Ok(self)
    }

    /// Produce an augmented copy of `dataset`.
    ///
    /// Medians are computed from the dataset passed in, so the output depends
    /// on nothing but the input.
    pub fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        let start = Instant::now();
        let mut frame = dataset.frame().clone();
        let mut schema = dataset.schema().clone();
        let mut derived = Vec::new();

        let order_days = temporal::epoch_days(&frame, ORDER_DATE)?;
        let ship_days = temporal::epoch_days(&frame, SHIP_DATE)?;

        if let (Some(order), Some(ship)) = (&order_days, &ship_days) {
            let delay = temporal::day_differences(order, ship);
            frame.with_column(Series::new(SHIP_DELAY_DAYS.into(), delay))?;
            derived.push(SHIP_DELAY_DAYS);
        }

        if let Some(order) = &order_days {
            let parts = temporal::date_parts(order);
            frame.with_column(Series::new(ORDER_YEAR.into(), parts.years))?;
            frame.with_column(Series::new(ORDER_MONTH.into(), parts.months))?;
            frame.with_column(Series::new(ORDER_DOW.into(), parts.weekdays))?;
            derived.extend([ORDER_YEAR, ORDER_MONTH, ORDER_DOW]);
        }

        // Flag before repair: a missing profit is not profitable.
        if frame.column(PROFIT).is_ok() {
            let profitable: Vec<i32> = float_values(&frame, PROFIT)?
                .iter()
                .map(|p| i32::from(matches!(p, Some(v) if *v > 0.0)))
                .collect();
            frame.with_column(Series::new(IS_PROFITABLE.into(), profitable))?;
            derived.push(IS_PROFITABLE);
        }

        for name in &derived {
            schema.register_derived(name);
        }

        self.repair_missing(&mut frame)?;
        self.clamp_discount(&mut frame)?;

        info!(
            derived = derived.len(),
            rows = frame.height(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Feature engineering complete"
        );

        Ok(Dataset::from_parts(frame, schema, dataset.warnings().to_vec()))
    }

    fn repair_missing(&self, frame: &mut DataFrame) -> Result<()> {
        for name in REPAIRED_COLUMNS {
            let Ok(column) = frame.column(name) else {
                continue;
            };

            let values = repair::observed_values(column)?;
            let missing = values.null_count();

            match repair::fill_with_median(&values)? {
                Some((filled, median)) => {
                    frame.with_column(filled.into_series())?;
                    if missing > 0 {
                        debug!(column = name, missing, median, "Repaired missing values with median");
                    }
                }
                None => {
                    warn!(column = name, missing, "Column has no observed values, left unrepaired");
                }
            }
        }
        Ok(())
    }

    fn clamp_discount(&self, frame: &mut DataFrame) -> Result<()> {
        let Ok(column) = frame.column(DISCOUNT) else {
            return Ok(());
        };

        let (lower, upper) = self.discount_bounds;
        let values = repair::observed_values(column)?;
        let clipped = values
            .into_iter()
            .filter(|v| matches!(v, Some(x) if *x < lower || *x > upper))
            .count();
        if clipped > 0 {
            debug!(clipped, lower, upper, "Clamped out-of-range discounts");
        }

        frame.with_column(repair::clamp_values(&values, lower, upper).into_series())?;
        Ok(())
    }
}

/// Apply the default feature engineering to a dataset.
pub fn add_basic_features(dataset: &Dataset) -> Result<Dataset> {
    FeatureEngineer::new().transform(dataset)
}
