// Classifier error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Classifier error code constants
///
/// Error code range: 5001-5003
pub struct ClassifierErrorCodes {}

impl ClassifierErrorCodes {
    /// Feature vector does not match what the model was built for
    pub const FEATURE_MISMATCH: i32 = 5001;

    /// Model description is inconsistent
    pub const INVALID_MODEL: i32 = 5002;

    /// Model file could not be read
    pub const IO: i32 = 5003;
}

/// Log a classifier error with structured context
pub fn log_classifier_error(err: &ClassifierError, context: &str) {
    error!(
        "Classifier error in {}: code={}, component=Classifier, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by a classifier implementation or the view around it
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// Feature names or count differ from the model's
    FeatureMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    /// Model description is unusable
    InvalidModel { reason: String },

    /// Model file could not be read
    Io { details: String },
}

impl ErrorCode for ClassifierError {
    fn code(&self) -> i32 {
        match self {
            ClassifierError::FeatureMismatch { .. } => ClassifierErrorCodes::FEATURE_MISMATCH,
            ClassifierError::InvalidModel { .. } => ClassifierErrorCodes::INVALID_MODEL,
            ClassifierError::Io { .. } => ClassifierErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            ClassifierError::FeatureMismatch { expected, actual } => {
                format!(
                    "Model expects features [{}], got [{}]",
                    expected.join(", "),
                    actual.join(", ")
                )
            }
            ClassifierError::InvalidModel { reason } => format!("Invalid model: {}", reason),
            ClassifierError::Io { details } => format!("Could not read model: {}", details),
        }
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClassifierError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for ClassifierError {}
