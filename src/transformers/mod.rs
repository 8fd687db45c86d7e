//! # Transformer Implementations
//!
//! The submodules contain the transformers for the different preprocessing tasks.

pub mod datetime_features;
pub mod outlier_detection;
pub mod outlier_handling;
pub mod scaling_and_normalization;
