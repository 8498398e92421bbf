// PSPlot Core - spectral scanner measurement engine
// Calibration, normalization, series indexing and classification for a
// handheld multi-wavelength reflectance scanner

// Module declarations
pub mod acquisition;
pub mod analysis;
pub mod calibration;
pub mod config;
pub mod error;
pub mod managers;
pub mod pipeline;
pub mod records;
pub mod series;

// Re-exports for convenience
pub use acquisition::{Acquirer, Acquisition, DummyAcquirer, FallbackAcquirer, LineAcquirer, SampleSource};
pub use analysis::{
    normalize, snv_transform, CentroidClassifier, ClassificationView, Classifier, NamedFeatures,
    Prediction, SortMode,
};
pub use calibration::{CalibrationState, CalibrationStatus};
pub use config::AppConfig;
pub use error::ErrorCode;
pub use managers::PipelineEvent;
pub use pipeline::{
    CaptureOutcome, CaptureRequest, Clock, ImportOutcome, MeasurementPipeline, SystemClock,
};
pub use records::{EditableField, MeasurementType, Record, RecordLabels, RecordLog};
pub use series::{AxisKind, AxisSelection, MaterialBucket, SeriesKey, SeriesStore};
