// Acquisition error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Acquisition error code constants
///
/// Error code range: 3001-3004
pub struct AcquisitionErrorCodes {}

impl AcquisitionErrorCodes {
    /// Device did not answer within the transport timeout
    pub const TIMEOUT: i32 = 3001;

    /// Response line could not be parsed
    pub const MALFORMED: i32 = 3002;

    /// Response carried the wrong number of values
    pub const LENGTH_MISMATCH: i32 = 3003;

    /// Transport I/O failure
    pub const IO: i32 = 3004;
}

/// Log an acquisition error with structured context
pub fn log_acquisition_error(err: &AcquisitionError, context: &str) {
    error!(
        "Acquisition error in {}: code={}, component=Acquirer, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Failures of the external acquisition collaborator
#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionError {
    /// No response line arrived before the transport timeout
    Timeout,

    /// Response line was not `"> "` followed by tab-separated decimals
    Malformed { line: String, reason: String },

    /// Response parsed but carried the wrong number of wavelengths
    LengthMismatch { expected: usize, actual: usize },

    /// Transport I/O failure other than a timeout
    Io { details: String },
}

impl ErrorCode for AcquisitionError {
    fn code(&self) -> i32 {
        match self {
            AcquisitionError::Timeout => AcquisitionErrorCodes::TIMEOUT,
            AcquisitionError::Malformed { .. } => AcquisitionErrorCodes::MALFORMED,
            AcquisitionError::LengthMismatch { .. } => AcquisitionErrorCodes::LENGTH_MISMATCH,
            AcquisitionError::Io { .. } => AcquisitionErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            AcquisitionError::Timeout => "Timed out waiting for a scanner response".to_string(),
            AcquisitionError::Malformed { line, reason } => {
                format!("Malformed scanner response {:?}: {}", line, reason)
            }
            AcquisitionError::LengthMismatch { expected, actual } => {
                format!("Expected {} wavelength values, got {}", expected, actual)
            }
            AcquisitionError::Io { details } => format!("Scanner I/O error: {}", details),
        }
    }
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AcquisitionError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AcquisitionError {}

/// Convert from std::io::Error, mapping timeouts onto their own variant
impl From<std::io::Error> for AcquisitionError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                AcquisitionError::Timeout
            }
            _ => AcquisitionError::Io {
                details: err.to_string(),
            },
        }
    }
}
