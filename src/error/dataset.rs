// Dataset import/export error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Dataset error code constants
///
/// Error code range: 4001-4004
pub struct DatasetErrorCodes {}

impl DatasetErrorCodes {
    /// Header row differs from the expected column set
    pub const SCHEMA_MISMATCH: i32 = 4001;

    /// A data row could not be converted into a record
    pub const INVALID_ROW: i32 = 4002;

    /// File could not be read or written
    pub const IO: i32 = 4003;

    /// CSV encoding/decoding failure
    pub const CSV: i32 = 4004;
}

/// Log a dataset error with structured context
pub fn log_dataset_error(err: &DatasetError, context: &str) {
    error!(
        "Dataset error in {}: code={}, component=RecordLog, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Errors raised while exporting or importing records
///
/// Every import error aborts the whole load; nothing is applied partially.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetError {
    /// Loaded header does not exactly match the expected schema
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A data row has a bad cell
    InvalidRow { row: usize, reason: String },

    /// File system failure
    Io { details: String },

    /// CSV layer failure
    Csv { details: String },
}

impl ErrorCode for DatasetError {
    fn code(&self) -> i32 {
        match self {
            DatasetError::SchemaMismatch { .. } => DatasetErrorCodes::SCHEMA_MISMATCH,
            DatasetError::InvalidRow { .. } => DatasetErrorCodes::INVALID_ROW,
            DatasetError::Io { .. } => DatasetErrorCodes::IO,
            DatasetError::Csv { .. } => DatasetErrorCodes::CSV,
        }
    }

    fn message(&self) -> String {
        match self {
            DatasetError::SchemaMismatch { expected, found } => {
                format!(
                    "Unexpected columns; expected [{}], found [{}]",
                    expected.join(", "),
                    found.join(", ")
                )
            }
            DatasetError::InvalidRow { row, reason } => format!("Row {}: {}", row, reason),
            DatasetError::Io { details } => format!("Dataset I/O error: {}", details),
            DatasetError::Csv { details } => format!("CSV error: {}", details),
        }
    }
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DatasetError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DatasetError {}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        DatasetError::Io {
            details: err.to_string(),
        }
    }
}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        DatasetError::Csv {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_error_codes() {
        let err = DatasetError::SchemaMismatch {
            expected: vec!["Name".to_string()],
            found: vec!["name".to_string()],
        };
        assert_eq!(err.code(), DatasetErrorCodes::SCHEMA_MISMATCH);
        assert!(err.message().contains("expected [Name]"));
        assert!(err.message().contains("found [name]"));

        let err = DatasetError::InvalidRow {
            row: 3,
            reason: "bad float".to_string(),
        };
        assert_eq!(err.code(), DatasetErrorCodes::INVALID_ROW);
        assert_eq!(err.message(), "Row 3: bad float");
    }
}
