// Calibration module - baseline storage and capture tagging
//
// The calibration workflow:
// 1. The user places the reference target and requests a calibration capture
// 2. CalibrationManager::calibrate makes that raw sample the current baseline
// 3. Regular captures are normalized against it until it is cleared or replaced

pub mod state;

pub use state::{classify, CalibrationState, CalibrationStatus};
