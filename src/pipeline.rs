//! ## Preprocessing Pipeline
//!
//! This module provides the abstractions for fitting and applying chains of transformers.
//!
//! ### Overview
//!
//! - The [`Transformer`] trait defines the fit/transform interface shared by every transformer,
//!   stateful (learns parameters in `fit`) or stateless (`fit` is a no-op).
//! - The [`Pipeline`] struct chains transformers: fitting a pipeline fits each step on the output
//!   of the previous one.
//! - Macros [`crate::impl_transformer`] and [`crate::make_pipeline`] implement the trait from
//!   inherent methods and build pipelines with boxed steps.

use crate::exceptions::{TabPrepError, TabPrepResult};
use async_trait::async_trait;
use datafusion::prelude::*;
use std::time::Instant;

/// Trait for the stages of a preprocessing pipeline.
///
/// `fit` may materialize the DataFrame to learn parameters. `transform` returns a new DataFrame;
/// it is async because some transformers (such as the outlier remover) have to read the data
/// they are given.
#[async_trait]
pub trait Transformer {
    /// Fit the transformer on a DataFrame.
    ///
    /// # Arguments
    ///
    /// * `df` - The training DataFrame.
    ///
    /// # Returns
    ///
    /// * `TabPrepResult<()>` - Ok if successful, or an error otherwise.
    async fn fit(&mut self, df: &DataFrame) -> TabPrepResult<()>;

    /// Transform the input DataFrame, returning a new DataFrame.
    ///
    /// # Arguments
    ///
    /// * `df` - The input DataFrame.
    ///
    /// # Returns
    ///
    /// * `TabPrepResult<DataFrame>` - The transformed DataFrame or an error if transformation fails.
    async fn transform(&self, df: DataFrame) -> TabPrepResult<DataFrame>;

    /// Returns true if the transformer requires a call to fit before transform can be called.
    fn is_stateful(&self) -> bool;
}

/// Macro to implement the [`Transformer`] trait for tabprep transformers.
///
/// The type must already have inherent methods:
/// - `async fn fit(&mut self, &DataFrame) -> TabPrepResult<()>`
/// - `async fn transform(&self, DataFrame) -> TabPrepResult<DataFrame>`
/// - `fn inherent_is_stateful(&self) -> bool`
///
/// # Example
///
/// ```rust,no_run
/// use tabprep::exceptions::TabPrepResult;
/// use datafusion::prelude::DataFrame;
/// use tabprep::impl_transformer;
///
/// pub struct Passthrough;
///
/// impl Passthrough {
///     pub async fn fit(&mut self, _df: &DataFrame) -> TabPrepResult<()> {
///         Ok(())
///     }
///
///     pub async fn transform(&self, df: DataFrame) -> TabPrepResult<DataFrame> {
///         Ok(df)
///     }
///
///     pub fn inherent_is_stateful(&self) -> bool {
///         false
///     }
/// }
///
/// impl_transformer!(Passthrough);
/// ```
#[macro_export]
macro_rules! impl_transformer {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl $crate::pipeline::Transformer for $ty {
            async fn fit(
                &mut self,
                df: &datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::TabPrepResult<()> {
                <$ty>::fit(self, df).await
            }
            async fn transform(
                &self,
                df: datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::TabPrepResult<datafusion::prelude::DataFrame> {
                <$ty>::transform(self, df).await
            }
            fn is_stateful(&self) -> bool {
                <$ty>::inherent_is_stateful(self)
            }
        }
    };
}

/// A pipeline that chains a sequence of transformers.
///
/// Each transformer's output is passed as input to the next transformer. A failing step is
/// reported as [`TabPrepError::PipelineStep`] carrying the step name and the step's own error.
pub struct Pipeline {
    steps: Vec<(String, Box<dyn Transformer + Send + Sync>)>,
    verbose: bool,
}

impl Pipeline {
    /// Creates a new pipeline.
    ///
    /// # Arguments
    ///
    /// * `steps` - A vector of (name, transformer) pairs.
    /// * `verbose` - If true, prints timing information.
    pub fn new(steps: Vec<(String, Box<dyn Transformer + Send + Sync>)>, verbose: bool) -> Self {
        Self { steps, verbose }
    }

    /// Names of the steps, in execution order.
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Fits each transformer sequentially and returns the fully transformed DataFrame.
    pub async fn fit(&mut self, df: &DataFrame) -> TabPrepResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(TabPrepError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let mut current_df = df.clone();
        for (name, step) in self.steps.iter_mut() {
            if self.verbose {
                println!("Fitting step: {}", name);
            }
            let start = Instant::now();
            step.fit(&current_df)
                .await
                .map_err(|e| TabPrepError::in_step(name, e))?;
            current_df = step
                .transform(current_df)
                .await
                .map_err(|e| TabPrepError::in_step(name, e))?;
            tracing::debug!(step = %name, elapsed = ?start.elapsed(), "pipeline step fitted");
            if self.verbose {
                println!("Step '{}' completed in {:?}", name, start.elapsed());
            }
        }
        Ok(current_df)
    }

    /// Applies the `transform` method of each transformer (without fitting).
    pub async fn transform(&self, df: DataFrame) -> TabPrepResult<DataFrame> {
        if self.steps.is_empty() {
            return Err(TabPrepError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        let mut current_df = df;
        for (name, step) in self.steps.iter() {
            if self.verbose {
                println!("Applying transformer: {}", name);
            }
            current_df = step
                .transform(current_df)
                .await
                .map_err(|e| TabPrepError::in_step(name, e))?;
        }
        Ok(current_df)
    }

    /// Convenience method to call `fit` and then return the final transformed DataFrame.
    pub async fn fit_transform(&mut self, df: &DataFrame) -> TabPrepResult<DataFrame> {
        self.fit(df).await
    }
}

/// Macro to simplify pipeline creation by automatically boxing transformers.
///
/// # Example
///
/// ```rust,no_run
/// use tabprep::make_pipeline;
/// use tabprep::transformers::outlier_handling::OutlierRemover;
/// use tabprep::transformers::scaling_and_normalization::MinMaxScaler;
///
/// let pipeline = make_pipeline!(false,
///     ("remove_outliers", OutlierRemover::default()),
///     ("scale", MinMaxScaler::new()),
/// );
/// ```
#[macro_export]
macro_rules! make_pipeline {
    ($verbose:expr, $(($name:expr, $transformer:expr)),+ $(,)?) => {
        {
            let steps: Vec<(String, Box<dyn $crate::pipeline::Transformer + Send + Sync>)> = vec![
                $(
                    ($name.to_string(), Box::new($transformer)),
                )+
            ];
            $crate::pipeline::Pipeline::new(steps, $verbose)
        }
    };
}
