// Normalization error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Normalization error code constants
///
/// Error code range: 1001-1003
pub struct NormalizationErrorCodes {}

impl NormalizationErrorCodes {
    /// Sample and baseline have different lengths
    pub const SHAPE_MISMATCH: i32 = 1001;

    /// SNV input has zero variance
    pub const DIVIDE_BY_ZERO: i32 = 1002;

    /// Input holds NaN or an infinity
    pub const NON_FINITE: i32 = 1003;
}

/// Log a normalization error with structured context
pub fn log_normalization_error(err: &NormalizationError, context: &str) {
    error!(
        "Normalization error in {}: code={}, component=NormalizationEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by the pure numeric transforms
///
/// Neither variant corrupts prior state: the transforms never mutate their
/// inputs, so a failed call leaves the caller exactly where it was.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizationError {
    /// Sample and baseline vectors differ in length
    ShapeMismatch { expected: usize, actual: usize },

    /// Every value of the SNV input is identical (population std = 0)
    DivideByZero,

    /// An input value is NaN or infinite
    NonFinite { index: usize },
}

impl ErrorCode for NormalizationError {
    fn code(&self) -> i32 {
        match self {
            NormalizationError::ShapeMismatch { .. } => NormalizationErrorCodes::SHAPE_MISMATCH,
            NormalizationError::DivideByZero => NormalizationErrorCodes::DIVIDE_BY_ZERO,
            NormalizationError::NonFinite { .. } => NormalizationErrorCodes::NON_FINITE,
        }
    }

    fn message(&self) -> String {
        match self {
            NormalizationError::ShapeMismatch { expected, actual } => {
                format!(
                    "Sample length {} does not match baseline length {}",
                    actual, expected
                )
            }
            NormalizationError::DivideByZero => {
                "SNV input has zero variance (all values identical)".to_string()
            }
            NormalizationError::NonFinite { index } => {
                format!("Input value at index {} is not finite", index)
            }
        }
    }
}

impl fmt::Display for NormalizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NormalizationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for NormalizationError {}
