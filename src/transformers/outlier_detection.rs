//! ## IQR-based outlier detection
//!
//! This module computes, for every numeric column of a table, the interquartile range (IQR)
//! statistics and the values lying outside `[Q1 - k * IQR, Q3 + k * IQR]`.
//!
//! - [`detect_outliers`] works on a DataFusion `DataFrame` (the table is materialized once).
//! - [`detect_outliers_in_batch`] works on an already materialized Arrow `RecordBatch`.
//! - [`column_statistics`] and [`column_values`] expose the per-column building blocks used by
//!   the transformers in [`crate::transformers::outlier_handling`].
//!
//! Quartiles use linear interpolation between ranked values. Nulls and NaNs are treated as
//! missing: they do not contribute to the statistics and are never reported as outliers.
//! Non-numeric columns are ignored.
//!
//! A column with IQR = 0 has both bounds collapsed onto Q1 = Q3, so every value different from
//! it is reported.

use crate::exceptions::{TabPrepError, TabPrepResult};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::{DataType, Float64Type, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::prelude::*;
use std::collections::HashMap;
use tracing::debug;

/// Multiplier applied to the IQR when none is given.
pub const DEFAULT_MULTIPLIER: f64 = 1.5;

/// IQR statistics of a single numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStatistics {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub mean: f64,
    /// Number of non-missing values the statistics were computed from.
    pub count: usize,
}

impl ColumnStatistics {
    /// Computes the statistics of `values` (in any order, without missing values).
    /// An empty slice gives NaN statistics.
    pub fn from_values(values: &[f64], multiplier: f64) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let q1 = quantile(&sorted, 0.25);
        let q3 = quantile(&sorted, 0.75);
        let iqr = q3 - q1;
        let mean = if sorted.is_empty() {
            f64::NAN
        } else {
            sorted.iter().sum::<f64>() / sorted.len() as f64
        };
        Self {
            q1,
            q3,
            iqr,
            lower_bound: q1 - multiplier * iqr,
            upper_bound: q3 + multiplier * iqr,
            mean,
            count: sorted.len(),
        }
    }

    /// Returns true if `value` lies strictly outside the bounds.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower_bound || value > self.upper_bound
    }

    /// Returns true if both bounds are finite numbers.
    pub fn has_bounds(&self) -> bool {
        self.lower_bound.is_finite() && self.upper_bound.is_finite()
    }
}

/// A single flagged value and the (zero-based) row it was found in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierValue {
    pub row: usize,
    pub value: f64,
}

/// Detection result for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierReport {
    pub statistics: ColumnStatistics,
    pub outliers: Vec<OutlierValue>,
}

impl OutlierReport {
    /// Row indices of the flagged values, in ascending order.
    pub fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.outliers.iter().map(|o| o.row)
    }
}

/// Linear-interpolation quantile of an ascending slice. `p` must be in `[0, 1]`.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * p;
            let lo = h.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}

/// Checks that the IQR multiplier is a finite, non-negative number.
pub(crate) fn validate_multiplier(multiplier: f64) -> TabPrepResult<()> {
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(TabPrepError::InvalidParameter(format!(
            "multiplier {} must be a finite number >= 0",
            multiplier
        )));
    }
    Ok(())
}

/// Names of the numeric columns of `schema`, in schema order.
pub fn numeric_columns(schema: &Schema) -> Vec<String> {
    schema
        .fields()
        .iter()
        .filter(|f| f.data_type().is_numeric())
        .map(|f| f.name().to_string())
        .collect()
}

/// Looks up a numeric column and returns it cast to Float64.
fn numeric_column(batch: &RecordBatch, column: &str) -> TabPrepResult<ArrayRef> {
    let array = batch.column_by_name(column).ok_or_else(|| {
        TabPrepError::MissingColumn(format!("Column '{}' not found", column))
    })?;
    if !array.data_type().is_numeric() {
        return Err(TabPrepError::InvalidParameter(format!(
            "Column '{}' must be numeric, but found {:?}",
            column,
            array.data_type()
        )));
    }
    Ok(cast(array, &DataType::Float64)?)
}

/// Returns the non-missing values of a numeric column as `f64`, in row order.
pub fn column_values(batch: &RecordBatch, column: &str) -> TabPrepResult<Vec<f64>> {
    let array = numeric_column(batch, column)?;
    Ok(array
        .as_primitive::<Float64Type>()
        .iter()
        .flatten()
        .filter(|v| !v.is_nan())
        .collect())
}

/// Computes the IQR statistics of one numeric column.
pub fn column_statistics(
    batch: &RecordBatch,
    column: &str,
    multiplier: f64,
) -> TabPrepResult<ColumnStatistics> {
    validate_multiplier(multiplier)?;
    let values = column_values(batch, column)?;
    Ok(ColumnStatistics::from_values(&values, multiplier))
}

/// Detects outliers in every numeric column of a materialized batch.
pub fn detect_outliers_in_batch(
    batch: &RecordBatch,
    multiplier: f64,
) -> TabPrepResult<HashMap<String, OutlierReport>> {
    validate_multiplier(multiplier)?;
    let mut reports = HashMap::new();
    for name in numeric_columns(&batch.schema()) {
        let array = numeric_column(batch, &name)?;
        let values = array.as_primitive::<Float64Type>();
        let present: Vec<f64> = values.iter().flatten().filter(|v| !v.is_nan()).collect();
        let statistics = ColumnStatistics::from_values(&present, multiplier);
        let outliers: Vec<OutlierValue> = values
            .iter()
            .enumerate()
            .filter_map(|(row, value)| match value {
                Some(v) if statistics.is_outlier(v) => Some(OutlierValue { row, value: v }),
                _ => None,
            })
            .collect();
        debug!(
            column = %name,
            q1 = statistics.q1,
            q3 = statistics.q3,
            lower = statistics.lower_bound,
            upper = statistics.upper_bound,
            outliers = outliers.len(),
            "detected outliers"
        );
        reports.insert(
            name,
            OutlierReport {
                statistics,
                outliers,
            },
        );
    }
    Ok(reports)
}

/// Detects outliers in every numeric column of a DataFrame.
///
/// Row indices in the reports are positions in the collected table.
pub async fn detect_outliers(
    df: &DataFrame,
    multiplier: f64,
) -> TabPrepResult<HashMap<String, OutlierReport>> {
    validate_multiplier(multiplier)?;
    let batch = collect_batch(df.clone()).await?;
    detect_outliers_in_batch(&batch, multiplier)
}

/// Executes the DataFrame and concatenates the result into a single batch.
pub(crate) async fn collect_batch(df: DataFrame) -> TabPrepResult<RecordBatch> {
    let schema = df.schema().inner().clone();
    let batches = df.collect().await?;
    let schema = batches.first().map(|b| b.schema()).unwrap_or(schema);
    Ok(concat_batches(&schema, &batches)?)
}
