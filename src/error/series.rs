// Series store error types and constants

use crate::error::ErrorCode;
use crate::series::SeriesKey;
use log::error;
use std::fmt;

/// Series store error code constants
///
/// Error code range: 2001-2003
pub struct SeriesErrorCodes {}

impl SeriesErrorCodes {
    /// Requested axes hit a null value, retry with SNV selectors
    pub const FALLBACK_REQUIRED: i32 = 2001;

    /// No entry exists for the requested key
    pub const UNKNOWN_SERIES: i32 = 2002;

    /// SNV retry still hit nulls
    pub const INVARIANT_VIOLATION: i32 = 2003;
}

/// Log a series store error with structured context
pub fn log_series_error(err: &SeriesError, context: &str) {
    error!(
        "Series error in {}: code={}, component=SeriesStore, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised by coordinate extraction
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesError {
    /// At least one record of the entry has a null value on a requested axis
    FallbackRequired { key: SeriesKey },

    /// The key has never been added
    UnknownSeries { key: SeriesKey },

    /// SNV values were null, which construction never produces
    InvariantViolation { reason: String },
}

impl SeriesError {
    /// Only invariant violations are fatal; everything else is recoverable
    pub fn is_fatal(&self) -> bool {
        matches!(self, SeriesError::InvariantViolation { .. })
    }
}

impl ErrorCode for SeriesError {
    fn code(&self) -> i32 {
        match self {
            SeriesError::FallbackRequired { .. } => SeriesErrorCodes::FALLBACK_REQUIRED,
            SeriesError::UnknownSeries { .. } => SeriesErrorCodes::UNKNOWN_SERIES,
            SeriesError::InvariantViolation { .. } => SeriesErrorCodes::INVARIANT_VIOLATION,
        }
    }

    fn message(&self) -> String {
        match self {
            SeriesError::FallbackRequired { key } => {
                format!(
                    "Series '{}' has null values on the requested axes; retry with SNV axes",
                    key
                )
            }
            SeriesError::UnknownSeries { key } => format!("No series stored for '{}'", key),
            SeriesError::InvariantViolation { reason } => {
                format!("Series invariant violated: {}", reason)
            }
        }
    }
}

impl fmt::Display for SeriesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SeriesError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SeriesError {}
