// CalibrationState - the current baseline and calibration counters
//
// A baseline is a raw sample captured against the reference target. At most
// one is current; records stored afterwards are normalized against it, while
// records already stored keep whatever baseline was current at capture time.

use serde::{Deserialize, Serialize};

use crate::records::MeasurementType;

/// Whether a baseline is currently held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    Uncalibrated,
    Calibrated,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    baseline: Option<Vec<f64>>,
    /// Calibrations performed since the session (or last import) started
    pub session_calibration_count: u32,
    /// Calibrations ever recorded, including imported calibration rows
    pub lifetime_calibration_count: u32,
}

impl CalibrationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline(&self) -> Option<&[f64]> {
        self.baseline.as_deref()
    }

    pub fn status(&self) -> CalibrationStatus {
        if self.baseline.is_some() {
            CalibrationStatus::Calibrated
        } else {
            CalibrationStatus::Uncalibrated
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.status() == CalibrationStatus::Calibrated
    }

    /// Make `raw` the current baseline and count it
    pub(crate) fn set_baseline(&mut self, raw: Vec<f64>) {
        self.baseline = Some(raw);
        self.session_calibration_count += 1;
        self.lifetime_calibration_count += 1;
    }

    pub(crate) fn clear_baseline(&mut self) {
        self.baseline = None;
    }

    /// State after loading a dataset: no baseline, a fresh session, and a
    /// lifetime count equal to the dataset's calibration rows
    pub fn after_import(calibration_rows: u32) -> Self {
        Self {
            baseline: None,
            session_calibration_count: 0,
            lifetime_calibration_count: calibration_rows,
        }
    }
}

/// Tag a capture from the user's declared intent; no side effects
pub fn classify(calibration_intent: bool) -> MeasurementType {
    if calibration_intent {
        MeasurementType::Calibration
    } else {
        MeasurementType::Regular
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_uncalibrated() {
        let state = CalibrationState::new();
        assert_eq!(state.status(), CalibrationStatus::Uncalibrated);
        assert!(state.baseline().is_none());
        assert_eq!(state.session_calibration_count, 0);
        assert_eq!(state.lifetime_calibration_count, 0);
    }

    #[test]
    fn test_set_and_clear_baseline() {
        let mut state = CalibrationState::new();
        state.set_baseline(vec![1.0, 2.0]);
        assert!(state.is_calibrated());
        assert_eq!(state.baseline(), Some(&[1.0, 2.0][..]));

        state.clear_baseline();
        assert!(!state.is_calibrated());
        assert_eq!(state.session_calibration_count, 1);
        assert_eq!(state.lifetime_calibration_count, 1);
    }

    #[test]
    fn test_after_import() {
        let state = CalibrationState::after_import(3);
        assert!(!state.is_calibrated());
        assert_eq!(state.session_calibration_count, 0);
        assert_eq!(state.lifetime_calibration_count, 3);
    }

    #[test]
    fn test_classify_is_a_pure_tag() {
        assert_eq!(classify(true), MeasurementType::Calibration);
        assert_eq!(classify(false), MeasurementType::Regular);
    }

    #[test]
    fn test_state_serialization() {
        let mut state = CalibrationState::new();
        state.set_baseline(vec![0.5, 0.25]);
        let json = serde_json::to_string(&state).unwrap();
        let restored: CalibrationState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, state);
    }
}
