//! ## Transformers for scaling numeric features
//!
//! - **MinMaxScaler:** Rescales every numeric column to a target range (by default `[0, 1]`)
//!   using the minimum and maximum learned at fit time. Non-numeric columns pass through.
//!
//! Errors are returned as `TabPrepError` and results are wrapped in `TabPrepResult`.

use crate::exceptions::{TabPrepError, TabPrepResult};
use crate::impl_transformer;
use crate::transformers::outlier_detection::numeric_columns;
use arrow::datatypes::DataType;
use datafusion::functions_aggregate::expr_fn::{max, min};
use datafusion::logical_expr::{cast, ident, lit, Case as DFCase, Expr};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use datafusion_functions::math::isnan;
use std::collections::HashMap;
use tracing::debug;

/// Data ranges below this width are treated as zero, as for constant columns.
const ZERO_RANGE_TOLERANCE: f64 = 10.0 * f64::EPSILON;

/// Minimum and maximum of a column in the training table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnRange {
    pub min: f64,
    pub max: f64,
}

/// The column widened to Float64, with NaN mapped to NULL so that aggregates skip it.
fn present_value(col_name: &str) -> Expr {
    let widened = cast(ident(col_name), DataType::Float64);
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(
            Box::new(isnan().call(vec![widened.clone()])),
            Box::new(lit(ScalarValue::Float64(None))),
        )],
        else_expr: Some(Box::new(widened)),
    })
}

/// Reads a Float64 aggregate result, mapping NULL to `None`.
fn scalar_to_f64(scalar: ScalarValue, col_name: &str) -> TabPrepResult<Option<f64>> {
    match scalar {
        ScalarValue::Float64(v) => Ok(v),
        other => Err(TabPrepError::DataFusionError(
            datafusion::error::DataFusionError::Plan(format!(
                "Unexpected aggregate value {:?} for column {}",
                other, col_name
            )),
        )),
    }
}

/// Scales numeric columns to a fixed range using the training minimum and maximum.
pub struct MinMaxScaler {
    pub feature_range: (f64, f64),
    columns: Vec<String>,
    ranges: HashMap<String, Option<ColumnRange>>,
    fitted: bool,
}

impl MinMaxScaler {
    /// Create a scaler to `[0, 1]`.
    pub fn new() -> Self {
        Self::with_range(0.0, 1.0)
    }

    /// Create a scaler to `[range_min, range_max]`.
    pub fn with_range(range_min: f64, range_max: f64) -> Self {
        Self {
            feature_range: (range_min, range_max),
            columns: Vec::new(),
            ranges: HashMap::new(),
            fitted: false,
        }
    }

    /// The numeric columns selected at fit time.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The learned range of a column; `None` if the column had no values.
    pub fn range_of(&self, col_name: &str) -> Option<ColumnRange> {
        self.ranges.get(col_name).copied().flatten()
    }

    /// Select the numeric columns and compute their minimum and maximum in a single query.
    pub async fn fit(&mut self, df: &DataFrame) -> TabPrepResult<()> {
        let (range_min, range_max) = self.feature_range;
        if !range_min.is_finite() || !range_max.is_finite() || range_min >= range_max {
            return Err(TabPrepError::InvalidParameter(format!(
                "feature_range ({}, {}) must be finite with min < max",
                range_min, range_max
            )));
        }

        let columns = numeric_columns(df.schema().inner());
        let mut ranges = HashMap::new();
        if !columns.is_empty() {
            let aggs: Vec<Expr> = columns
                .iter()
                .flat_map(|name| {
                    [
                        min(present_value(name)).alias(format!("{}_min", name)),
                        max(present_value(name)).alias(format!("{}_max", name)),
                    ]
                })
                .collect();
            let batches = df.clone().aggregate(vec![], aggs)?.collect().await?;
            let batch = batches.first().ok_or_else(|| {
                TabPrepError::DataFusionError(datafusion::error::DataFusionError::Plan(
                    "No data found when computing column ranges".to_string(),
                ))
            })?;
            for (i, name) in columns.iter().enumerate() {
                let lo = scalar_to_f64(ScalarValue::try_from_array(batch.column(2 * i), 0)?, name)?;
                let hi =
                    scalar_to_f64(ScalarValue::try_from_array(batch.column(2 * i + 1), 0)?, name)?;
                let range = lo.zip(hi).map(|(min, max)| ColumnRange { min, max });
                debug!(column = %name, range = ?range, "fitted min-max scaler");
                ranges.insert(name.clone(), range);
            }
        }

        self.columns = columns;
        self.ranges = ranges;
        self.fitted = true;
        Ok(())
    }

    /// Returns a new DataFrame where every fitted column is rescaled to the feature range.
    pub async fn transform(&self, df: DataFrame) -> TabPrepResult<DataFrame> {
        if !self.fitted {
            return Err(TabPrepError::NotFitted("MinMaxScaler".to_string()));
        }
        for col_name in &self.columns {
            df.schema().field_with_name(None, col_name).map_err(|_| {
                TabPrepError::MissingColumn(format!("Column '{}' not found", col_name))
            })?;
        }
        let (range_min, range_max) = self.feature_range;
        let exprs: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .map(|field| {
                let name = field.name();
                match self.ranges.get(name) {
                    Some(Some(range)) => {
                        let mut width = range.max - range.min;
                        if width < ZERO_RANGE_TOLERANCE {
                            width = 1.0;
                        }
                        let scale = (range_max - range_min) / width;
                        ((cast(ident(name), DataType::Float64) - lit(range.min)) * lit(scale)
                            + lit(range_min))
                        .alias(name)
                    }
                    Some(None) => cast(ident(name), DataType::Float64).alias(name),
                    None => ident(name),
                }
            })
            .collect();
        df.select(exprs).map_err(TabPrepError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl_transformer!(MinMaxScaler);
