// Managers Module
//
// Focused managers owned by the MeasurementPipeline, one concern each:
// - CalibrationManager: baseline lifecycle and normalization policy
// - BroadcastChannelManager: tokio broadcast channel for pipeline events

pub mod broadcast_manager;
pub mod calibration_manager;

pub use broadcast_manager::{BroadcastChannelManager, PipelineEvent};
pub use calibration_manager::CalibrationManager;
