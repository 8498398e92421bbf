//! Acquisition collaborators: where raw samples come from.
//!
//! The serial transport itself lives outside this crate. What the core needs
//! is something that answers `read()` with one raw sample or a failure within
//! a bounded time. `protocol` speaks the scanner's line protocol over any
//! `Read + Write` stream; `dummy` produces the offline vector used when the
//! device is absent or misbehaves.

pub mod dummy;
pub mod protocol;

use serde::Serialize;

use crate::error::{log_acquisition_error, AcquisitionError};

pub use dummy::DummyAcquirer;
pub use protocol::{parse_response, LineAcquirer};

/// Source of raw samples, one per call.
///
/// Implementations must return within a bounded time; a device that does not
/// answer yields `AcquisitionError::Timeout` rather than blocking forever.
pub trait Acquirer {
    fn read(&mut self) -> Result<Vec<f64>, AcquisitionError>;
}

/// Where a captured sample actually came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SampleSource {
    Device,
    /// The dummy vector stood in for a failed read
    Dummy { reason: String },
}

impl SampleSource {
    pub fn is_dummy(&self) -> bool {
        matches!(self, SampleSource::Dummy { .. })
    }
}

/// One raw sample and its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub sample: Vec<f64>,
    pub source: SampleSource,
}

/// Reads from a primary acquirer, substituting dummy data on failure.
///
/// Substitution is never silent: it is logged and reported through
/// `SampleSource::Dummy`. Without a fallback configured a failure is
/// returned as-is.
pub struct FallbackAcquirer {
    primary: Option<Box<dyn Acquirer>>,
    fallback: Option<DummyAcquirer>,
}

impl FallbackAcquirer {
    pub fn new(primary: Box<dyn Acquirer>, fallback: Option<DummyAcquirer>) -> Self {
        Self {
            primary: Some(primary),
            fallback,
        }
    }

    /// No device at all: every capture uses the dummy vector
    pub fn offline(dummy: DummyAcquirer) -> Self {
        Self {
            primary: None,
            fallback: Some(dummy),
        }
    }

    pub fn has_device(&self) -> bool {
        self.primary.is_some()
    }

    pub fn acquire(&mut self) -> Result<Acquisition, AcquisitionError> {
        let failure = match self.primary.as_mut() {
            Some(primary) => match primary.read() {
                Ok(sample) => {
                    return Ok(Acquisition {
                        sample,
                        source: SampleSource::Device,
                    })
                }
                Err(err) => {
                    log_acquisition_error(&err, "acquire");
                    err
                }
            },
            None => AcquisitionError::Io {
                details: "no device connected".to_string(),
            },
        };

        let Some(dummy) = self.fallback.as_mut() else {
            return Err(failure);
        };
        let sample = dummy.read()?;
        let reason = failure.to_string();
        log::warn!("[Acquisition] Using dummy data: {}", reason);
        Ok(Acquisition {
            sample,
            source: SampleSource::Dummy { reason },
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Acquirer replaying a fixed script of results
    pub(crate) struct ScriptedAcquirer {
        script: VecDeque<Result<Vec<f64>, AcquisitionError>>,
    }

    impl ScriptedAcquirer {
        pub(crate) fn new(script: Vec<Result<Vec<f64>, AcquisitionError>>) -> Self {
            Self {
                script: script.into(),
            }
        }
    }

    impl Acquirer for ScriptedAcquirer {
        fn read(&mut self) -> Result<Vec<f64>, AcquisitionError> {
            self.script
                .pop_front()
                .unwrap_or(Err(AcquisitionError::Timeout))
        }
    }

    fn fixed_dummy() -> DummyAcquirer {
        DummyAcquirer::new(vec![0.5, 0.25, 0.125], [0.0, 0.0], 0)
    }

    #[test]
    fn test_device_reading_passes_through() {
        let mut acquirer = FallbackAcquirer::new(
            Box::new(ScriptedAcquirer::new(vec![Ok(vec![1.0, 2.0, 3.0])])),
            Some(fixed_dummy()),
        );
        let acquisition = acquirer.acquire().unwrap();
        assert_eq!(acquisition.sample, vec![1.0, 2.0, 3.0]);
        assert_eq!(acquisition.source, SampleSource::Device);
    }

    #[test]
    fn test_failure_is_flagged_as_dummy() {
        let mut acquirer = FallbackAcquirer::new(
            Box::new(ScriptedAcquirer::new(vec![Err(AcquisitionError::Timeout)])),
            Some(fixed_dummy()),
        );
        let acquisition = acquirer.acquire().unwrap();
        assert_eq!(acquisition.sample, vec![0.5, 0.25, 0.125]);
        assert!(acquisition.source.is_dummy());
        match acquisition.source {
            SampleSource::Dummy { reason } => assert!(reason.contains("3001"), "{}", reason),
            SampleSource::Device => unreachable!(),
        }
    }

    #[test]
    fn test_failure_without_fallback_is_returned() {
        let mut acquirer = FallbackAcquirer::new(
            Box::new(ScriptedAcquirer::new(vec![Err(AcquisitionError::Malformed {
                line: "garbage".to_string(),
                reason: "not a number".to_string(),
            })])),
            None,
        );
        assert!(matches!(
            acquirer.acquire(),
            Err(AcquisitionError::Malformed { .. })
        ));
    }

    #[test]
    fn test_offline_always_uses_dummy() {
        let mut acquirer = FallbackAcquirer::offline(fixed_dummy());
        assert!(!acquirer.has_device());
        for _ in 0..3 {
            assert!(acquirer.acquire().unwrap().source.is_dummy());
        }
    }
}
