// CalibrationManager: owns the current baseline and the normalization policy
//
// Single Responsibility: decide what the `normalized` vector of a new record
// is, given its measurement type and whatever baseline is current.

use crate::analysis::normalize;
use crate::calibration::{CalibrationState, CalibrationStatus};
use crate::error::{log_normalization_error, NormalizationError};
use crate::records::MeasurementType;

/// Manages the baseline lifecycle and the calibration counters
///
/// This manager handles:
/// - Calibrating (baseline replacement plus both counters)
/// - Clearing the baseline without touching the counters
/// - Building the normalized vector for calibration and regular records
/// - Resetting after a dataset import
///
/// # Example
/// ```ignore
/// let mut manager = CalibrationManager::new();
/// manager.calibrate(reference.clone());
/// let normalized = manager.normalized_for(MeasurementType::Regular, &sample)?;
/// ```
#[derive(Debug, Default)]
pub struct CalibrationManager {
    state: CalibrationState,
}

impl CalibrationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `raw` the current baseline and return it
    ///
    /// Always succeeds; whether a reference target is really present is the
    /// caller's decision.
    pub fn calibrate(&mut self, raw: Vec<f64>) -> Vec<f64> {
        self.state.set_baseline(raw.clone());
        log::info!(
            "[Calibration] New baseline set (session #{}, lifetime #{})",
            self.state.session_calibration_count,
            self.state.lifetime_calibration_count
        );
        raw
    }

    /// Drop the current baseline. Counters are kept.
    pub fn clear(&mut self) {
        self.state.clear_baseline();
        log::info!("[Calibration] Baseline cleared");
    }

    pub fn current_baseline(&self) -> Option<&[f64]> {
        self.state.baseline()
    }

    pub fn status(&self) -> CalibrationStatus {
        self.state.status()
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn session_calibration_count(&self) -> u32 {
        self.state.session_calibration_count
    }

    pub fn lifetime_calibration_count(&self) -> u32 {
        self.state.lifetime_calibration_count
    }

    /// Replace the whole state, e.g. after importing a dataset
    pub fn load_state(&mut self, state: CalibrationState) {
        self.state = state;
    }

    /// Normalized vector for a record of the given type
    ///
    /// A calibration record is all ones by definition; the reference is never
    /// divided by itself. A regular record is normalized against the current
    /// baseline, or is all nulls when no baseline is held.
    ///
    /// # Errors
    /// `ShapeMismatch` if `raw` and the baseline differ in length,
    /// `DivideByZero` if the quotient is constant.
    pub fn normalized_for(
        &self,
        measurement_type: MeasurementType,
        raw: &[f64],
    ) -> Result<Vec<Option<f64>>, NormalizationError> {
        match (measurement_type, self.state.baseline()) {
            (MeasurementType::Calibration, _) => Ok(vec![Some(1.0); raw.len()]),
            (MeasurementType::Regular, Some(baseline)) => {
                let values = normalize(raw, baseline).inspect_err(|err| {
                    log_normalization_error(err, "normalize_against_baseline");
                })?;
                Ok(values.into_iter().map(Some).collect())
            }
            (MeasurementType::Regular, None) => Ok(vec![None; raw.len()]),
        }
    }
}
