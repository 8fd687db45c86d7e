//! # tabprep
//!
//! Preprocessing transformers for tabular data held in Apache DataFusion DataFrames:
//!
//! - IQR-based outlier detection ([`transformers::outlier_detection`]), imputation and row
//!   removal ([`transformers::outlier_handling`]),
//! - min-max scaling of numeric columns ([`transformers::scaling_and_normalization`]),
//! - calendar features from a timestamp column ([`transformers::datetime_features`]).
//!
//! Every transformer implements the fit/transform [`pipeline::Transformer`] trait and can be
//! chained with [`make_pipeline!`].
//!
//! ```rust,no_run
//! use tabprep::make_pipeline;
//! use tabprep::transformers::outlier_handling::OutlierImputer;
//! use tabprep::transformers::scaling_and_normalization::MinMaxScaler;
//!
//! # async fn run(df: datafusion::prelude::DataFrame) -> tabprep::exceptions::TabPrepResult<()> {
//! let mut pipeline = make_pipeline!(
//!     false,
//!     ("impute_outliers", OutlierImputer::default()),
//!     ("scale", MinMaxScaler::new()),
//! );
//! let cleaned = pipeline.fit_transform(&df).await?;
//! cleaned.show().await?;
//! # Ok(())
//! # }
//! ```

pub mod exceptions;
pub mod logging;
pub mod pipeline;
pub mod transformers;
