// Error types for the spectral scanner core
//
// This module defines one error enum per component, each carrying a stable
// numeric code so that a host UI can map failures to user-facing messages
// without matching on Rust types.

mod acquisition;
mod classifier;
mod dataset;
mod normalization;
mod pipeline;
mod series;

pub use acquisition::{log_acquisition_error, AcquisitionError, AcquisitionErrorCodes};
pub use classifier::{log_classifier_error, ClassifierError, ClassifierErrorCodes};
pub use dataset::{log_dataset_error, DatasetError, DatasetErrorCodes};
pub use normalization::{log_normalization_error, NormalizationError, NormalizationErrorCodes};
pub use pipeline::{log_pipeline_error, PipelineError, PipelineErrorCodes};
pub use series::{log_series_error, SeriesError, SeriesErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the boundary to the host application.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
