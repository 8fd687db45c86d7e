//! ## Custom Errors for tabprep
//!
//! This module defines the error type used across the library.
//! It uses the `thiserror` crate to derive the `Error` trait.
//! The `TabPrepError` enum covers the failures of the query engine and the usage errors
//! a caller can make (bad parameters, absent columns, transforming before fitting).
//!
//! The `TabPrepResult` type alias is the result type returned by the library.
//!
//! ### Example
//!
//! ```rust
//! use tabprep::exceptions::{TabPrepError, TabPrepResult};
//!
//! fn check_multiplier(multiplier: f64) -> TabPrepResult<()> {
//!     if multiplier < 0.0 {
//!         return Err(TabPrepError::InvalidParameter("negative multiplier".into()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Errors specific to the tabprep library.
#[derive(Debug, Error)]
pub enum TabPrepError {
    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] datafusion::error::DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] arrow::error::ArrowError),

    /// Indicates that an invalid parameter was provided (e.g., a negative multiplier or a non-numeric target column).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Indicates that the specified column does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Indicates the transform method was called before calling fit for a stateful transformer.
    #[error("{0} must be fitted before calling transform")]
    NotFitted(String),

    /// A named pipeline step failed; `source` is the error the step returned.
    #[error("Pipeline step '{step}' failed: {source}")]
    PipelineStep {
        step: String,
        source: Box<TabPrepError>,
    },
}

impl TabPrepError {
    /// Wraps an error returned by the pipeline step `step`.
    pub fn in_step(step: &str, source: TabPrepError) -> Self {
        TabPrepError::PipelineStep {
            step: step.to_string(),
            source: Box::new(source),
        }
    }

    /// The underlying error, with any pipeline step context removed.
    pub fn root_cause(&self) -> &TabPrepError {
        match self {
            TabPrepError::PipelineStep { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A convenient result type for tabprep operations.
pub type TabPrepResult<T> = std::result::Result<T, TabPrepError>;
