// Scanner line protocol
//
// Request: a short ASCII token (default `scan\n`).
// Response: one line, `"> "` + N tab-separated decimals + CRLF.

use std::io::{BufRead, BufReader, Read, Write};

use super::Acquirer;
use crate::error::AcquisitionError;

/// Parse one response line into `expected_len` values
///
/// The leading `"> "` marker and trailing CR/LF are stripped, empty tokens
/// are discarded and the rest parsed as floats in wavelength order. Tokens
/// such as `nan` or `inf` parse as floats but are rejected as malformed.
pub fn parse_response(line: &str, expected_len: usize) -> Result<Vec<f64>, AcquisitionError> {
    let body = line
        .trim_end_matches(['\r', '\n'])
        .trim_start_matches(['>', ' ']);

    let malformed = |reason: String| AcquisitionError::Malformed {
        line: line.to_string(),
        reason,
    };

    let values = body
        .split('\t')
        .filter(|token| !token.is_empty())
        .map(|token| -> Result<f64, AcquisitionError> {
            let value = token
                .trim()
                .parse::<f64>()
                .map_err(|err| malformed(format!("token {:?}: {}", token, err)))?;
            if !value.is_finite() {
                return Err(malformed(format!("token {:?} is not finite", token)));
            }
            Ok(value)
        })
        .collect::<Result<Vec<f64>, _>>()?;

    if values.is_empty() {
        return Err(AcquisitionError::Malformed {
            line: line.to_string(),
            reason: "no values".to_string(),
        });
    }
    if values.len() != expected_len {
        return Err(AcquisitionError::LengthMismatch {
            expected: expected_len,
            actual: values.len(),
        });
    }
    Ok(values)
}

/// Request/response acquirer over a byte stream (e.g. an opened serial port)
///
/// The stream's own read timeout bounds every call: a timed-out read or an
/// empty read both surface as `AcquisitionError::Timeout`.
pub struct LineAcquirer<T: Read + Write> {
    stream: BufReader<T>,
    request_token: Vec<u8>,
    expected_len: usize,
}

impl<T: Read + Write> LineAcquirer<T> {
    pub fn new(stream: T, request_token: &str, expected_len: usize) -> Self {
        Self {
            stream: BufReader::new(stream),
            request_token: request_token.as_bytes().to_vec(),
            expected_len,
        }
    }

    /// Consume the greeting line the scanner prints after opening the port
    pub fn skip_greeting(&mut self) -> Result<String, AcquisitionError> {
        let line = self.read_line()?;
        log::info!("[Acquisition] Scanner says {:?}", line.trim_end());
        Ok(line)
    }

    fn read_line(&mut self) -> Result<String, AcquisitionError> {
        let mut line = String::new();
        let read = self.stream.read_line(&mut line)?;
        if read == 0 {
            return Err(AcquisitionError::Timeout);
        }
        Ok(line)
    }

    pub fn into_inner(self) -> T {
        self.stream.into_inner()
    }
}

impl<T: Read + Write> Acquirer for LineAcquirer<T> {
    fn read(&mut self) -> Result<Vec<f64>, AcquisitionError> {
        let port = self.stream.get_mut();
        port.write_all(&self.request_token)?;
        port.flush()?;

        let line = self.read_line()?;
        log::debug!("[Acquisition] Response {:?}", line);
        parse_response(&line, self.expected_len)
    }
}
