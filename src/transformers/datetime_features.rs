//! ## Transformers for extracting datetime-based features
//!
//! This module implements transformers for extracting calendar features from timestamps.
//!
//! Currently, the following transformers are implemented:
//!
//! - **TimeFeatureExtractor:** Replaces a timestamp column with `year`, `month`, `day`, `hour`,
//!   `minute`, `weekday` (0 = Monday, 6 = Sunday) and `is_weekend`.
//!
//! Errors are returned as `TabPrepError` and results are wrapped in `TabPrepResult`.

use crate::exceptions::{TabPrepError, TabPrepResult};
use crate::impl_transformer;
use arrow::datatypes::DataType;
use datafusion::prelude::*;
use datafusion_expr::{cast, ident, lit, Expr};
use datafusion_functions::datetime::{date_part, to_timestamp};

/// Column read when no column is configured.
pub const DEFAULT_TIME_COLUMN: &str = "Time";

/// Names of the columns appended by [`TimeFeatureExtractor`], in output order.
pub const TIME_FEATURE_COLUMNS: [&str; 7] = [
    "year",
    "month",
    "day",
    "hour",
    "minute",
    "weekday",
    "is_weekend",
];

/// Returns an expression evaluating to a timestamp for the given column.
/// Strings are parsed; Timestamp, Date32 and Date64 columns are used as they are.
fn timestamp_expr(df: &DataFrame, col_name: &str) -> TabPrepResult<Expr> {
    let field = df.schema().field_with_name(None, col_name).map_err(|_| {
        TabPrepError::MissingColumn(format!("Column '{}' not found", col_name))
    })?;
    match field.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            Ok(to_timestamp().call(vec![ident(col_name)]))
        }
        DataType::Timestamp(_, _) | DataType::Date32 | DataType::Date64 => Ok(ident(col_name)),
        dt => Err(TabPrepError::InvalidParameter(format!(
            "Column '{}' must hold timestamps or timestamp strings, but found {:?}",
            col_name, dt
        ))),
    }
}

fn date_part_expr(part: &str, base: &Expr) -> Expr {
    cast(
        date_part().call(vec![lit(part), base.clone()]),
        DataType::Int32,
    )
}

/// Decomposes one timestamp column into calendar features.
pub struct TimeFeatureExtractor {
    /// The configured column; `None` reads [`DEFAULT_TIME_COLUMN`].
    pub column: Option<String>,
}

impl TimeFeatureExtractor {
    /// Create a new TimeFeatureExtractor reading `column`, or [`DEFAULT_TIME_COLUMN`] when `None`.
    pub fn new(column: Option<String>) -> Self {
        Self { column }
    }

    /// The column that is read and dropped.
    pub fn time_column(&self) -> &str {
        self.column.as_deref().unwrap_or(DEFAULT_TIME_COLUMN)
    }

    /// Stateless transformer: fit does nothing.
    pub async fn fit(&mut self, _df: &DataFrame) -> TabPrepResult<()> {
        Ok(())
    }

    /// Returns a new DataFrame without the timestamp column and with the calendar features
    /// appended. Input columns named like a calendar feature are replaced.
    pub async fn transform(&self, df: DataFrame) -> TabPrepResult<DataFrame> {
        let time_col = self.time_column();
        let base = timestamp_expr(&df, time_col)?;

        let mut exprs: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .filter(|f| f.name() != time_col && !TIME_FEATURE_COLUMNS.contains(&f.name().as_str()))
            .map(|f| ident(f.name()))
            .collect();

        // date_part's dow counts from Sunday = 0.
        let weekday = (date_part_expr("dow", &base) + lit(6)) % lit(7);
        exprs.push(date_part_expr("year", &base).alias("year"));
        exprs.push(date_part_expr("month", &base).alias("month"));
        exprs.push(date_part_expr("day", &base).alias("day"));
        exprs.push(date_part_expr("hour", &base).alias("hour"));
        exprs.push(date_part_expr("minute", &base).alias("minute"));
        exprs.push(weekday.clone().alias("weekday"));
        exprs.push(weekday.gt_eq(lit(5)).alias("is_weekend"));

        df.select(exprs).map_err(TabPrepError::from)
    }

    // This transformer is stateless.
    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

impl Default for TimeFeatureExtractor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl_transformer!(TimeFeatureExtractor);
