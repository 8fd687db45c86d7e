//! ## Transformers for handling outliers
//!
//! This module provides the transformers that act on IQR-based outliers
//! (see [`crate::transformers::outlier_detection`]).
//!
//! Currently, the following transformers are implemented:
//!
//! - **OutlierImputer:** Learns per-column IQR bounds at fit time and replaces out-of-bound values
//!   with the fitted column mean at transform time. Row count and order are preserved.
//! - **OutlierRemover:** Detects outliers in every numeric column of the table it is given and drops
//!   every row that holds at least one of them.
//!
//! The imputer freezes its bounds at fit time, so transforming a test table reuses the bounds
//! learned on the training table. The remover has no fitted state; it recomputes the bounds from
//! each table passed to `transform`.
//! Errors are returned as `TabPrepError` and results are wrapped in `TabPrepResult`.

use crate::exceptions::{TabPrepError, TabPrepResult};
use crate::impl_transformer;
use crate::transformers::outlier_detection::{
    collect_batch, column_values, detect_outliers_in_batch, numeric_columns, validate_multiplier,
    ColumnStatistics, DEFAULT_MULTIPLIER,
};
use arrow::array::BooleanArray;
use arrow::compute::filter_record_batch;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use datafusion::logical_expr::{cast, ident, lit, not, Case as DFCase, Expr};
use datafusion::prelude::*;
use datafusion_functions::math::isnan;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Validates that every target column exists in the DataFrame and is numeric.
fn validate_numeric_columns(df: &DataFrame, target_cols: &[String]) -> TabPrepResult<()> {
    for col_name in target_cols {
        let field = df.schema().field_with_name(None, col_name).map_err(|_| {
            TabPrepError::MissingColumn(format!("Column '{}' not found", col_name))
        })?;
        if !field.data_type().is_numeric() {
            return Err(TabPrepError::InvalidParameter(format!(
                "Column '{}' must be numeric, but found {:?}",
                col_name,
                field.data_type()
            )));
        }
    }
    Ok(())
}

/// How the value substituted for an outlier is computed at fit time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Replacement {
    /// Mean of every non-missing training value, outliers included.
    #[default]
    ColumnMean,
    /// Mean of the training values inside the bounds. Imputed output then never leaves the bounds.
    InlierMean,
}

/// Bounds and replacement value learned for one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImputationBounds {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub replacement: f64,
}

impl ImputationBounds {
    fn from_statistics(stats: &ColumnStatistics, values: &[f64], strategy: Replacement) -> Self {
        let replacement = match strategy {
            Replacement::ColumnMean => stats.mean,
            Replacement::InlierMean => {
                let inliers: Vec<f64> = values
                    .iter()
                    .copied()
                    .filter(|v| !stats.is_outlier(*v))
                    .collect();
                if inliers.is_empty() {
                    stats.mean
                } else {
                    inliers.iter().sum::<f64>() / inliers.len() as f64
                }
            }
        };
        Self {
            lower_bound: stats.lower_bound,
            upper_bound: stats.upper_bound,
            replacement,
        }
    }

    fn is_usable(&self) -> bool {
        self.lower_bound.is_finite() && self.upper_bound.is_finite() && self.replacement.is_finite()
    }
}

/// Parameters learned by [`OutlierImputer::fit`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FittedOutlierBounds {
    /// The columns the imputer was resolved to, in table order for inferred columns.
    pub columns: Vec<String>,
    pub bounds: HashMap<String, ImputationBounds>,
}

/// Builds `CASE WHEN (x < lower OR x > upper) AND NOT isnan(x) THEN replacement ELSE x END`
/// over the column widened to Float64.
fn impute_expr_for(col_name: &str, bounds: &ImputationBounds) -> Expr {
    let widened = cast(ident(col_name), DataType::Float64);
    if !bounds.is_usable() {
        return widened;
    }
    let out_of_bounds = widened
        .clone()
        .lt(lit(bounds.lower_bound))
        .or(widened.clone().gt(lit(bounds.upper_bound)))
        .and(not(isnan().call(vec![widened.clone()])));
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(Box::new(out_of_bounds), Box::new(lit(bounds.replacement)))],
        else_expr: Some(Box::new(widened)),
    })
}

/// Replaces outliers with a mean learned at fit time.
///
/// The replacement defaults to the mean of the whole training column, which can itself lie
/// outside the bounds. [`Replacement::InlierMean`] keeps imputed values inside them.
/// With `columns` set to `None` the imputer treats every numeric column of the training table.
/// Imputed columns are always returned as Float64.
pub struct OutlierImputer {
    /// The columns asked for at construction; `None` means all numeric columns.
    pub columns: Option<Vec<String>>,
    pub multiplier: f64,
    pub replacement: Replacement,
    fitted: Option<FittedOutlierBounds>,
}

impl OutlierImputer {
    /// Create a new OutlierImputer.
    pub fn new(columns: Option<Vec<String>>, multiplier: f64) -> Self {
        Self {
            columns,
            multiplier,
            replacement: Replacement::default(),
            fitted: None,
        }
    }

    /// Create an imputer for the given columns with the default multiplier.
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self::new(Some(columns), DEFAULT_MULTIPLIER)
    }

    /// Use the given replacement strategy instead of the column mean.
    pub fn with_replacement(mut self, replacement: Replacement) -> Self {
        self.replacement = replacement;
        self
    }

    /// The learned parameters, if `fit` has been called.
    pub fn fitted(&self) -> Option<&FittedOutlierBounds> {
        self.fitted.as_ref()
    }

    /// Fit the imputer by computing bounds and replacement values for each target column.
    pub async fn fit(&mut self, df: &DataFrame) -> TabPrepResult<()> {
        validate_multiplier(self.multiplier)?;
        let columns = match &self.columns {
            Some(cols) => {
                validate_numeric_columns(df, cols)?;
                cols.clone()
            }
            None => numeric_columns(df.schema().inner()),
        };

        let mut bounds = HashMap::new();
        if !columns.is_empty() {
            let projection: Vec<Expr> = columns.iter().map(ident).collect();
            let batch = collect_batch(df.clone().select(projection)?).await?;
            for col_name in &columns {
                let values = column_values(&batch, col_name)?;
                let stats = ColumnStatistics::from_values(&values, self.multiplier);
                let learned = ImputationBounds::from_statistics(&stats, &values, self.replacement);
                debug!(
                    column = %col_name,
                    lower = learned.lower_bound,
                    upper = learned.upper_bound,
                    replacement = learned.replacement,
                    "fitted outlier imputer"
                );
                bounds.insert(col_name.clone(), learned);
            }
        }

        self.fitted = Some(FittedOutlierBounds { columns, bounds });
        Ok(())
    }

    /// Returns a new DataFrame where out-of-bound values of each fitted column are replaced.
    pub async fn transform(&self, df: DataFrame) -> TabPrepResult<DataFrame> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| TabPrepError::NotFitted("OutlierImputer".to_string()))?;
        for col_name in &fitted.columns {
            df.schema().field_with_name(None, col_name).map_err(|_| {
                TabPrepError::MissingColumn(format!("Column '{}' not found", col_name))
            })?;
        }
        let exprs: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .map(|field| {
                let name = field.name();
                match fitted.bounds.get(name) {
                    Some(bounds) => impute_expr_for(name, bounds).alias(name),
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

impl Default for OutlierImputer {
    fn default() -> Self {
        Self::new(None, DEFAULT_MULTIPLIER)
    }
}

/// Removes every row holding an outlier in any numeric column.
pub struct OutlierRemover {
    pub multiplier: f64,
}

impl OutlierRemover {
    /// Create a new OutlierRemover.
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }

    /// This transformer is stateless, so fit does nothing.
    pub async fn fit(&mut self, _df: &DataFrame) -> TabPrepResult<()> {
        Ok(())
    }

    /// Removes outlier rows from a materialized batch, keeping the order of the other rows.
    pub fn transform_batch(&self, batch: &RecordBatch) -> TabPrepResult<RecordBatch> {
        let reports = detect_outliers_in_batch(batch, self.multiplier)?;
        let to_drop: HashSet<usize> = reports.values().flat_map(|r| r.rows()).collect();
        if to_drop.is_empty() {
            return Ok(batch.clone());
        }
        let keep: Vec<bool> = (0..batch.num_rows())
            .map(|row| !to_drop.contains(&row))
            .collect();
        Ok(filter_record_batch(batch, &BooleanArray::from(keep))?)
    }

    /// Returns a new DataFrame without the rows that hold an outlier.
    ///
    /// The bounds are computed from `df` itself.
    pub async fn transform(&self, df: DataFrame) -> TabPrepResult<DataFrame> {
        validate_multiplier(self.multiplier)?;
        let (state, plan) = df.into_parts();
        let batch = collect_batch(DataFrame::new(state.clone(), plan)).await?;
        let cleaned = self.transform_batch(&batch)?;
        debug!(
            rows_in = batch.num_rows(),
            rows_out = cleaned.num_rows(),
            "removed outlier rows"
        );
        SessionContext::new_with_state(state)
            .read_batch(cleaned)
            .map_err(TabPrepError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

impl Default for OutlierRemover {
    fn default() -> Self {
        Self::new(DEFAULT_MULTIPLIER)
    }
}

impl_transformer!(OutlierImputer);
impl_transformer!(OutlierRemover);
