//! Column roles for retail transaction data
//!
//! The raw file is schema-loose: columns may be missing and extra columns may
//! appear. [`Schema`] records, for the columns actually present, which role
//! each one plays. Everything downstream asks the schema instead of probing
//! the frame by name.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const ORDER_DATE: &str = "Order Date";
pub const SHIP_DATE: &str = "Ship Date";

pub const SALES: &str = "Sales";
pub const QUANTITY: &str = "Quantity";
pub const DISCOUNT: &str = "Discount";
pub const PROFIT: &str = "Profit";
pub const POSTAL_CODE: &str = "Postal Code";

pub const SHIP_DELAY_DAYS: &str = "ShipDelayDays";
pub const ORDER_YEAR: &str = "OrderYear";
pub const ORDER_MONTH: &str = "OrderMonth";
pub const ORDER_DOW: &str = "OrderDow";
pub const IS_PROFITABLE: &str = "IsProfitable";

/// Columns parsed as calendar dates during ingestion.
pub const TEMPORAL_COLUMNS: [&str; 2] = [ORDER_DATE, SHIP_DATE];

/// Identifying and segment columns, one-hot encoded when used as predictors.
pub const CATEGORICAL_COLUMNS: [&str; 10] = [
    "Ship Mode",
    "Segment",
    "Country",
    "City",
    "State",
    "Region",
    "Category",
    "Sub-Category",
    "Product ID",
    "Customer ID",
];

/// Raw numeric columns.
pub const NUMERIC_COLUMNS: [&str; 5] = [SALES, QUANTITY, DISCOUNT, PROFIT, POSTAL_CODE];

/// Columns computed by feature engineering.
pub const DERIVED_COLUMNS: [&str; 5] = [
    SHIP_DELAY_DAYS,
    ORDER_YEAR,
    ORDER_MONTH,
    ORDER_DOW,
    IS_PROFITABLE,
];

/// Numeric columns whose missing values are replaced by the column median.
pub const REPAIRED_COLUMNS: [&str; 6] = [SALES, QUANTITY, DISCOUNT, PROFIT, POSTAL_CODE, SHIP_DELAY_DAYS];

/// Candidate numeric predictors, in model column order.
pub const NUMERIC_PREDICTORS: [&str; 8] = [
    SALES,
    QUANTITY,
    DISCOUNT,
    POSTAL_CODE,
    SHIP_DELAY_DAYS,
    ORDER_YEAR,
    ORDER_MONTH,
    ORDER_DOW,
];

/// Financial columns that reconstruct each other's targets. Never predictors
/// for a different target.
pub const LEAKAGE_COLUMNS: [&str; 2] = [SALES, PROFIT];

/// Role a column plays in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnRole {
    Temporal,
    Categorical,
    Numeric,
    Derived,
    /// Present in the file but not referenced by any enumerated list
    Ignored,
}

/// A single column entry in the schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub role: ColumnRole,
}

/// Ordered classification of the columns present in a dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    /// Role a column name has in retail transaction data, if any.
    pub fn declared_role(name: &str) -> ColumnRole {
        if TEMPORAL_COLUMNS.contains(&name) {
            ColumnRole::Temporal
        } else if CATEGORICAL_COLUMNS.contains(&name) {
            ColumnRole::Categorical
        } else if NUMERIC_COLUMNS.contains(&name) {
            ColumnRole::Numeric
        } else if DERIVED_COLUMNS.contains(&name) {
            ColumnRole::Derived
        } else {
            ColumnRole::Ignored
        }
    }

    /// Classify every column of a frame, preserving frame order.
    pub fn from_frame(df: &DataFrame) -> Self {
        let columns = df
            .get_column_names()
            .into_iter()
            .map(|name| ColumnSpec {
                name: name.to_string(),
                role: Self::declared_role(name.as_str()),
            })
            .collect();
        Self { columns }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn role(&self, name: &str) -> Option<ColumnRole> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.role)
    }

    /// Names of present columns with the given role, in frame order.
    pub fn columns_with_role(&self, role: ColumnRole) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.role == role)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Record a derived column. Re-registering an existing name is a no-op.
    pub fn register_derived(&mut self, name: &str) {
        if !self.contains(name) {
            self.columns.push(ColumnSpec {
                name: name.to_string(),
                role: ColumnRole::Derived,
            });
        }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
