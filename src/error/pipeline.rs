// Measurement pipeline error types and constants

use crate::error::{AcquisitionError, ClassifierError, ErrorCode, NormalizationError, SeriesError};
use log::error;
use std::fmt;

/// Pipeline error code constants
///
/// Error code range: 6001-6006
pub struct PipelineErrorCodes {}

impl PipelineErrorCodes {
    /// Regular capture without a baseline and without the session override
    pub const NO_CALIBRATION_WARNING: i32 = 6001;

    /// Acquisition step failed
    pub const ACQUISITION: i32 = 6002;

    /// Normalization step failed
    pub const NORMALIZATION: i32 = 6003;

    /// Series indexing failed
    pub const SERIES: i32 = 6004;

    /// Classification step failed
    pub const CLASSIFIER: i32 = 6005;

    /// A record was constructed with inconsistent vector lengths
    pub const INVARIANT_VIOLATION: i32 = 6006;
}

/// Log a pipeline error with structured context
pub fn log_pipeline_error(err: &PipelineError, context: &str) {
    error!(
        "Pipeline error in {}: code={}, component=MeasurementPipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors surfaced by a single capture
///
/// Every variant aborts the remaining steps of that capture. Only
/// `InvariantViolation` (and a wrapped fatal series error) indicates a bug;
/// the rest are recoverable by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// No baseline is current and the session override has not been given
    NoCalibrationWarning,

    /// Acquisition collaborator failed
    Acquisition(AcquisitionError),

    /// SNV or calibration normalization failed
    Normalization(NormalizationError),

    /// Series store failure
    Series(SeriesError),

    /// Classifier failure (the record is already stored at this point)
    Classifier(ClassifierError),

    /// Record vectors disagree in length
    InvariantViolation { reason: String },
}

impl PipelineError {
    /// Whether the error indicates a construction bug rather than bad input
    pub fn is_fatal(&self) -> bool {
        match self {
            PipelineError::InvariantViolation { .. } => true,
            PipelineError::Series(err) => err.is_fatal(),
            _ => false,
        }
    }
}

impl ErrorCode for PipelineError {
    fn code(&self) -> i32 {
        match self {
            PipelineError::NoCalibrationWarning => PipelineErrorCodes::NO_CALIBRATION_WARNING,
            PipelineError::Acquisition(_) => PipelineErrorCodes::ACQUISITION,
            PipelineError::Normalization(_) => PipelineErrorCodes::NORMALIZATION,
            PipelineError::Series(_) => PipelineErrorCodes::SERIES,
            PipelineError::Classifier(_) => PipelineErrorCodes::CLASSIFIER,
            PipelineError::InvariantViolation { .. } => PipelineErrorCodes::INVARIANT_VIOLATION,
        }
    }

    fn message(&self) -> String {
        match self {
            PipelineError::NoCalibrationWarning => {
                "No calibration is present; confirm to measure without one".to_string()
            }
            PipelineError::Acquisition(err) => err.message(),
            PipelineError::Normalization(err) => err.message(),
            PipelineError::Series(err) => err.message(),
            PipelineError::Classifier(err) => err.message(),
            PipelineError::InvariantViolation { reason } => {
                format!("Record invariant violated: {}", reason)
            }
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PipelineError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Acquisition(err) => Some(err),
            PipelineError::Normalization(err) => Some(err),
            PipelineError::Series(err) => Some(err),
            PipelineError::Classifier(err) => Some(err),
            _ => None,
        }
    }
}

impl From<AcquisitionError> for PipelineError {
    fn from(err: AcquisitionError) -> Self {
        PipelineError::Acquisition(err)
    }
}

impl From<NormalizationError> for PipelineError {
    fn from(err: NormalizationError) -> Self {
        PipelineError::Normalization(err)
    }
}

impl From<SeriesError> for PipelineError {
    fn from(err: SeriesError) -> Self {
        PipelineError::Series(err)
    }
}

impl From<ClassifierError> for PipelineError {
    fn from(err: ClassifierError) -> Self {
        PipelineError::Classifier(err)
    }
}
