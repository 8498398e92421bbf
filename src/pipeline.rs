// MeasurementPipeline: the orchestrator behind every capture
//
// Owns all mutable session state (baseline, record log, series index,
// probability view, session flags) and runs one capture to completion:
//
//   guard -> acquire -> build record -> calibrate -> store -> index -> predict
//
// A record is fully built before anything is mutated, so a capture either
// completes or aborts without partial writes.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::io::{Read, Write};

use crate::acquisition::{FallbackAcquirer, SampleSource};
use crate::analysis::{snv_transform, Bar, ClassificationView, Classifier, Prediction, SortMode};
use crate::calibration::{classify, CalibrationState, CalibrationStatus};
use crate::config::AppConfig;
use crate::error::{
    log_dataset_error, log_normalization_error, log_pipeline_error, AcquisitionError,
    DatasetError, PipelineError,
};
use crate::managers::{BroadcastChannelManager, CalibrationManager, PipelineEvent};
use crate::records::{
    export_records, import_records, EditOutcome, EditableField, MeasurementType, Record,
    RecordLabels, RecordLog, SampleCatalog,
};
use crate::series::{
    AxisSelection, BucketToggles, MaterialBucket, MaterialGroups, RefreshReport, SeriesKey,
    SeriesStore,
};

/// Result of a successful dataset import
///
/// The dataset itself always loads once parsing succeeds. Classifying the
/// newest loaded record is a separate step whose failure is reported in
/// `prediction_error`; the probability bars are stale in that case.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    pub records: usize,
    pub calibration_records: usize,
    pub prediction: Option<Prediction>,
    pub prediction_error: Option<PipelineError>,
}

/// Wall-clock source for record timestamps
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local time, as shown to the user
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// What the user asked for when triggering a capture
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureRequest {
    /// The user declared a reference target is on the sensor
    pub calibration: bool,
    pub labels: RecordLabels,
}

impl CaptureRequest {
    pub fn calibration() -> Self {
        Self {
            calibration: true,
            labels: RecordLabels::default(),
        }
    }

    pub fn regular(labels: RecordLabels) -> Self {
        Self {
            calibration: false,
            labels,
        }
    }
}

/// Everything a completed capture produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaptureOutcome {
    pub row: usize,
    pub row_label: String,
    pub record: Record,
    pub series: SeriesKey,
    pub source: SampleSource,
    /// None for calibration captures, when no classifier is attached, or when
    /// the record has no normalized values
    pub prediction: Option<Prediction>,
}

pub struct MeasurementPipeline {
    wavelengths: Vec<u32>,
    default_materials: Vec<String>,
    acquirer: FallbackAcquirer,
    calibration: CalibrationManager,
    records: RecordLog,
    series: SeriesStore,
    toggles: BucketToggles,
    view: Option<ClassificationView>,
    broadcast: BroadcastChannelManager,
    catalog: SampleCatalog,
    clock: Box<dyn Clock>,
    /// One-time override of the no-calibration warning for this session
    no_calibration_override: bool,
    /// Set while a row the pipeline stored is being written out; user edits
    /// observed in that window are echoes and are ignored
    storing: bool,
}

impl MeasurementPipeline {
    /// Build a pipeline from a validated configuration
    pub fn from_config(config: &AppConfig, acquirer: FallbackAcquirer) -> Result<Self, String> {
        config.validate()?;
        let wavelengths = config.hardware.wavelengths.clone();
        let axes = config.scatter.selection(&wavelengths)?;
        let groups = MaterialGroups::new(config.materials.allowed.iter().cloned());
        let default_materials = config.materials.default_sample_materials.clone();

        Ok(Self {
            catalog: SampleCatalog::new(&default_materials),
            default_materials,
            series: SeriesStore::new(groups, axes),
            wavelengths,
            acquirer,
            calibration: CalibrationManager::new(),
            records: RecordLog::new(),
            toggles: BucketToggles::new(),
            view: None,
            broadcast: BroadcastChannelManager::new(),
            clock: Box::new(SystemClock),
            no_calibration_override: false,
            storing: false,
        })
    }

    /// Attach the material classifier
    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.view = Some(ClassificationView::new(classifier, self.wavelengths.clone()));
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ========================================================================
    // CAPTURE
    // ========================================================================

    /// Run one capture to completion
    ///
    /// # Errors
    /// - `NoCalibrationWarning` - regular capture without baseline or override;
    ///   nothing was read or stored
    /// - `Acquisition` - the read failed and no dummy fallback is configured
    /// - `Normalization` - SNV or baseline normalization failed; nothing stored
    /// - `Classifier` - the record was stored but prediction failed
    /// - `InvariantViolation` - a record was built inconsistently (bug)
    pub fn capture(&mut self, request: CaptureRequest) -> Result<CaptureOutcome, PipelineError> {
        self.run_capture(request).inspect_err(|err| {
            log_pipeline_error(err, "capture");
        })
    }

    fn run_capture(&mut self, request: CaptureRequest) -> Result<CaptureOutcome, PipelineError> {
        let measurement_type = classify(request.calibration);

        if measurement_type == MeasurementType::Regular
            && self.calibration.current_baseline().is_none()
            && !self.no_calibration_override
        {
            return Err(PipelineError::NoCalibrationWarning);
        }

        let acquisition = self.acquirer.acquire()?;
        if acquisition.sample.len() != self.wavelengths.len() {
            return Err(AcquisitionError::LengthMismatch {
                expected: self.wavelengths.len(),
                actual: acquisition.sample.len(),
            }
            .into());
        }

        let record = self.build_record(request.labels, measurement_type, acquisition.sample)?;

        if measurement_type == MeasurementType::Calibration {
            self.calibration.calibrate(record.raw().to_vec());
            self.publish_calibration();
        }

        let (row, series) = self.store(&record);
        let row_label = self.records.row_label(row).unwrap_or_default();
        tracing::info!(
            "[Pipeline] Stored {} record {} as '{}'",
            measurement_type.as_str(),
            row_label,
            series
        );

        if let SampleSource::Dummy { reason } = &acquisition.source {
            self.broadcast.publish(PipelineEvent::DummyDataUsed {
                reason: reason.clone(),
            });
        }
        self.broadcast.publish(PipelineEvent::RecordStored {
            row,
            row_label: row_label.clone(),
            measurement_type,
            series: series.clone(),
        });

        let prediction = match measurement_type {
            MeasurementType::Calibration => None,
            MeasurementType::Regular => self.predict(&record)?,
        };

        Ok(CaptureOutcome {
            row,
            row_label,
            record,
            series,
            source: acquisition.source,
            prediction,
        })
    }

    fn build_record(
        &self,
        labels: RecordLabels,
        measurement_type: MeasurementType,
        raw: Vec<f64>,
    ) -> Result<Record, PipelineError> {
        let snv = snv_transform(&raw).inspect_err(|err| {
            log_normalization_error(err, "snv_of_capture");
        })?;
        let normalized = self.calibration.normalized_for(measurement_type, &raw)?;
        Record::from_parts(
            labels,
            measurement_type,
            self.clock.now(),
            raw,
            snv,
            normalized,
        )
    }

    /// Append to the log, then index. The log write always comes first.
    fn store(&mut self, record: &Record) -> (usize, SeriesKey) {
        self.while_storing(|pipeline| {
            let row = pipeline.records.append(record.clone());
            let series = pipeline.series.add(record);
            pipeline.catalog.remember(&record.labels());
            (row, series)
        })
    }

    fn predict(&mut self, record: &Record) -> Result<Option<Prediction>, PipelineError> {
        let Some(view) = self.view.as_mut() else {
            return Ok(None);
        };
        if view.is_disabled() {
            return Ok(None);
        }
        let prediction = view.predict(record)?.cloned();
        self.broadcast.publish(PipelineEvent::PredictionUpdated {
            prediction: prediction.clone(),
        });
        Ok(prediction)
    }

    /// Let regular captures proceed without a baseline for the rest of the
    /// session; their normalized values are stored as nulls
    pub fn override_no_calibration_warning(&mut self) {
        if !self.no_calibration_override {
            log::warn!("[Pipeline] No-calibration warning overridden for this session");
        }
        self.no_calibration_override = true;
    }

    pub fn no_calibration_overridden(&self) -> bool {
        self.no_calibration_override
    }

    // ========================================================================
    // CALIBRATION
    // ========================================================================

    /// Drop the current baseline; stored records are untouched
    pub fn clear_calibration(&mut self) {
        self.calibration.clear();
        self.publish_calibration();
    }

    pub fn calibration_status(&self) -> CalibrationStatus {
        self.calibration.status()
    }

    pub fn calibration_state(&self) -> &CalibrationState {
        self.calibration.state()
    }

    fn publish_calibration(&self) {
        let state = self.calibration.state();
        self.broadcast.publish(PipelineEvent::CalibrationChanged {
            calibrated: state.is_calibrated(),
            session_calibration_count: state.session_calibration_count,
            lifetime_calibration_count: state.lifetime_calibration_count,
        });
    }

    // ========================================================================
    // RECORDS
    // ========================================================================

    pub fn records(&self) -> &RecordLog {
        &self.records
    }

    pub fn catalog(&self) -> &SampleCatalog {
        &self.catalog
    }

    pub fn is_storing(&self) -> bool {
        self.storing
    }

    /// Run `write` with the storing flag set
    ///
    /// Hosts that mirror stored rows into an editable table do the mirroring
    /// inside this call. Cell-change callbacks fired by that write reach
    /// `apply_user_edit` as `EditOutcome::Suppressed` instead of being applied
    /// as user edits. The previous flag value is restored afterwards.
    pub fn while_storing<T>(&mut self, write: impl FnOnce(&mut Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.storing, true);
        let result = write(self);
        self.storing = previous;
        result
    }

    /// Edit a label column of a stored row
    ///
    /// The series index is not re-keyed; the record keeps its original entry.
    pub fn apply_user_edit(
        &mut self,
        row: usize,
        field: EditableField,
        value: &str,
    ) -> Result<EditOutcome, DatasetError> {
        let outcome = self
            .records
            .apply_user_edit(self.storing, row, field, value)
            .inspect_err(|err| log_dataset_error(err, "apply_user_edit"))?;
        if outcome == EditOutcome::Applied {
            if let Some(record) = self.records.get(row) {
                self.catalog.remember(&record.labels());
            }
        }
        Ok(outcome)
    }

    pub fn export_dataset<W: Write>(&self, writer: W) -> Result<(), DatasetError> {
        export_records(self.records.records(), &self.wavelengths, writer)
            .inspect_err(|err| log_dataset_error(err, "export_dataset"))
    }

    /// Replace the session with a saved dataset
    ///
    /// On any error the current state is left exactly as it was. On success
    /// the log is replaced, every series rebuilt, the baseline cleared, the
    /// session calibration count reset and the lifetime count set to the
    /// number of calibration rows loaded.
    pub fn import_dataset<R: Read>(&mut self, reader: R) -> Result<ImportOutcome, DatasetError> {
        let records = import_records(reader, &self.wavelengths)?;

        let calibration_rows = records.iter().filter(|r| r.is_calibration()).count();
        self.series.clear();
        for record in &records {
            self.series.add(record);
        }
        self.catalog = SampleCatalog::reseeded(&self.default_materials, records.iter());
        self.records = RecordLog::from_records(records);
        self.calibration
            .load_state(CalibrationState::after_import(calibration_rows as u32));

        log::info!(
            "[Pipeline] Loaded {} records ({} calibration)",
            self.records.len(),
            calibration_rows
        );
        self.broadcast.publish(PipelineEvent::DatasetLoaded {
            records: self.records.len(),
            calibration_records: calibration_rows,
        });
        self.publish_calibration();

        let mut outcome = ImportOutcome {
            records: self.records.len(),
            calibration_records: calibration_rows,
            prediction: None,
            prediction_error: None,
        };
        if let Some(latest) = self.records.latest().cloned() {
            match self.predict(&latest) {
                Ok(prediction) => outcome.prediction = prediction,
                Err(err) => {
                    log::warn!("[Pipeline] Could not classify newest loaded record: {}", err);
                    outcome.prediction_error = Some(err);
                }
            }
        }
        Ok(outcome)
    }

    // ========================================================================
    // SERIES
    // ========================================================================

    pub fn series(&self) -> &SeriesStore {
        &self.series
    }

    pub fn set_axes(&mut self, axes: AxisSelection) {
        self.series.set_axes(axes);
    }

    pub fn set_bucket_visible(&mut self, bucket: MaterialBucket, visible: bool) {
        self.toggles.set_visible(bucket, visible);
    }

    pub fn visible_buckets(&self) -> Vec<MaterialBucket> {
        self.series.visible_buckets(&self.toggles)
    }

    /// Bring every series render handle up to date
    pub fn refresh_series(&mut self) -> Result<RefreshReport, PipelineError> {
        let report = self.series.refresh(&self.toggles).map_err(PipelineError::from)?;
        if report.fell_back {
            self.broadcast.publish(PipelineEvent::AxesFellBack { axes: report.axes });
        }
        Ok(report)
    }

    // ========================================================================
    // CLASSIFICATION
    // ========================================================================

    pub fn has_classifier(&self) -> bool {
        self.view.is_some()
    }

    /// Disabling freezes the bars at zero; enabling re-classifies the newest
    /// record
    pub fn set_classification_enabled(&mut self, enabled: bool) -> Result<(), PipelineError> {
        let Some(view) = self.view.as_mut() else {
            return Ok(());
        };
        view.set_disabled(!enabled);
        if !enabled {
            self.broadcast
                .publish(PipelineEvent::PredictionUpdated { prediction: None });
            return Ok(());
        }
        match self.records.latest().cloned() {
            Some(latest) => self.predict(&latest).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Probability bars of the newest prediction; empty without a classifier
    pub fn ordering(&self, mode: SortMode) -> Vec<Bar> {
        self.view
            .as_ref()
            .map(|view| view.ordering(mode))
            .unwrap_or_default()
    }

    pub fn latest_prediction(&self) -> Option<&Prediction> {
        self.view.as_ref().and_then(|view| view.latest())
    }

    // ========================================================================
    // MISC
    // ========================================================================

    pub fn wavelengths(&self) -> &[u32] {
        &self.wavelengths
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<PipelineEvent> {
        self.broadcast.subscribe()
    }
}
