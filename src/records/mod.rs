// Records - the durable unit of storage for one measurement
//
// A Record carries user-entered labels plus three equal-length numeric
// vectors: the raw reading, its SNV transform, and the calibration-normalized
// vector (null per element when no baseline was current). Labels may be
// edited after the fact; the numeric vectors never change.

pub mod catalog;
pub mod dataset;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{DatasetError, PipelineError};

pub use catalog::SampleCatalog;
pub use dataset::{export_records, import_records, schema};

/// Material stored when the user leaves the field at its default
pub const DEFAULT_MATERIAL: &str = "unknown";

/// Whether a record was taken against the reference target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementType {
    Regular,
    Calibration,
}

impl MeasurementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementType::Regular => "regular",
            MeasurementType::Calibration => "calibration",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "regular" => Some(MeasurementType::Regular),
            "calibration" => Some(MeasurementType::Calibration),
            _ => None,
        }
    }
}

/// Free-text labels entered alongside a capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLabels {
    pub name: String,
    pub material: String,
    pub color: String,
}

impl RecordLabels {
    /// Build labels, stripping trailing whitespace from every field
    pub fn new(name: &str, material: &str, color: &str) -> Self {
        Self {
            name: name.trim_end().to_string(),
            material: material.trim_end().to_string(),
            color: color.trim_end().to_string(),
        }
    }
}

impl Default for RecordLabels {
    fn default() -> Self {
        Self::new("", DEFAULT_MATERIAL, "")
    }
}

/// One stored measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub material: String,
    pub color: String,
    pub measurement_type: MeasurementType,
    pub timestamp: NaiveDateTime,
    raw: Vec<f64>,
    snv: Vec<f64>,
    normalized: Vec<Option<f64>>,
}

impl Record {
    /// Assemble a record, enforcing `len(raw) == len(snv) == len(normalized)`
    ///
    /// # Errors
    /// `PipelineError::InvariantViolation` when the lengths disagree. This is
    /// a construction bug and callers must not swallow it.
    pub fn from_parts(
        labels: RecordLabels,
        measurement_type: MeasurementType,
        timestamp: NaiveDateTime,
        raw: Vec<f64>,
        snv: Vec<f64>,
        normalized: Vec<Option<f64>>,
    ) -> Result<Self, PipelineError> {
        if raw.len() != snv.len() || raw.len() != normalized.len() {
            return Err(PipelineError::InvariantViolation {
                reason: format!(
                    "raw/snv/normalized lengths {}/{}/{} differ",
                    raw.len(),
                    snv.len(),
                    normalized.len()
                ),
            });
        }

        Ok(Self {
            name: labels.name,
            material: labels.material,
            color: labels.color,
            measurement_type,
            timestamp,
            raw,
            snv,
            normalized,
        })
    }

    pub fn raw(&self) -> &[f64] {
        &self.raw
    }

    pub fn snv(&self) -> &[f64] {
        &self.snv
    }

    pub fn normalized(&self) -> &[Option<f64>] {
        &self.normalized
    }

    /// Number of wavelengths
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Normalized vector if every element is present
    pub fn normalized_values(&self) -> Option<Vec<f64>> {
        self.normalized.iter().copied().collect()
    }

    pub fn is_calibration(&self) -> bool {
        self.measurement_type == MeasurementType::Calibration
    }

    pub fn labels(&self) -> RecordLabels {
        RecordLabels {
            name: self.name.clone(),
            material: self.material.clone(),
            color: self.color.clone(),
        }
    }
}

/// Label columns a user may edit in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditableField {
    Name,
    Material,
    Color,
}

/// Result of a user edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// The edit arrived while the pipeline itself was writing the row
    Suppressed,
}

/// Append-only, in-memory view of the record store
#[derive(Debug, Clone, Default)]
pub struct RecordLog {
    records: Vec<Record>,
}

impl RecordLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn append(&mut self, record: Record) -> usize {
        self.records.push(record);
        self.records.len() - 1
    }

    pub fn get(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    pub fn latest(&self) -> Option<&Record> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn calibration_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_calibration()).count()
    }

    /// Table row label: `c<k>` for the k-th calibration row, otherwise the
    /// 1-based ordinal among regular rows
    pub fn row_label(&self, row: usize) -> Option<String> {
        let record = self.records.get(row)?;
        let calibrations_up_to = self.records[..=row]
            .iter()
            .filter(|r| r.is_calibration())
            .count();
        if record.is_calibration() {
            Some(format!("c{}", calibrations_up_to))
        } else {
            Some((row + 1 - calibrations_up_to).to_string())
        }
    }

    /// Apply a user edit to a label column
    ///
    /// Edits observed while `storing` is set originate from the pipeline's own
    /// write of the row and are suppressed instead of being echoed back.
    pub fn apply_user_edit(
        &mut self,
        storing: bool,
        row: usize,
        field: EditableField,
        value: &str,
    ) -> Result<EditOutcome, DatasetError> {
        if storing {
            return Ok(EditOutcome::Suppressed);
        }
        let len = self.records.len();
        let record = self.records.get_mut(row).ok_or(DatasetError::InvalidRow {
            row,
            reason: format!("no such row (log has {} rows)", len),
        })?;
        let value = value.trim_end().to_string();
        match field {
            EditableField::Name => record.name = value,
            EditableField::Material => record.material = value,
            EditableField::Color => record.color = value,
        }
        Ok(EditOutcome::Applied)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn fixed_timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 17)
            .and_then(|d| d.and_hms_micro_opt(14, 3, 22, 123_456))
            .unwrap()
    }

    pub(crate) fn regular(name: &str, material: &str, raw: Vec<f64>) -> Record {
        let snv = crate::analysis::snv_transform(&raw).unwrap();
        let normalized = vec![None; raw.len()];
        Record::from_parts(
            RecordLabels::new(name, material, ""),
            MeasurementType::Regular,
            fixed_timestamp(),
            raw,
            snv,
            normalized,
        )
        .unwrap()
    }

    pub(crate) fn calibration(raw: Vec<f64>) -> Record {
        let snv = crate::analysis::snv_transform(&raw).unwrap();
        let normalized = vec![Some(1.0); raw.len()];
        Record::from_parts(
            RecordLabels::default(),
            MeasurementType::Calibration,
            fixed_timestamp(),
            raw,
            snv,
            normalized,
        )
        .unwrap()
    }

    #[test]
    fn test_from_parts_rejects_length_mismatch() {
        let result = Record::from_parts(
            RecordLabels::default(),
            MeasurementType::Regular,
            fixed_timestamp(),
            vec![1.0, 2.0],
            vec![1.0, 2.0],
            vec![None],
        );
        assert!(matches!(
            result,
            Err(PipelineError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_labels_strip_trailing_whitespace() {
        let labels = RecordLabels::new("sample-1  ", "PET\t", " red ");
        assert_eq!(labels.name, "sample-1");
        assert_eq!(labels.material, "PET");
        assert_eq!(labels.color, " red");
    }

    #[test]
    fn test_default_material_is_unknown() {
        assert_eq!(RecordLabels::default().material, "unknown");
    }

    #[test]
    fn test_measurement_type_parse() {
        assert_eq!(
            MeasurementType::parse("calibration"),
            Some(MeasurementType::Calibration)
        );
        assert_eq!(MeasurementType::parse("regular"), Some(MeasurementType::Regular));
        assert_eq!(MeasurementType::parse("Regular"), None);
    }

    #[test]
    fn test_row_labels() {
        let mut log = RecordLog::new();
        log.append(calibration(vec![1.0, 2.0, 3.0]));
        log.append(regular("a", "PET", vec![1.0, 2.0, 4.0]));
        log.append(regular("a", "PET", vec![1.0, 3.0, 4.0]));
        log.append(calibration(vec![2.0, 2.0, 3.0]));
        log.append(regular("b", "PP", vec![5.0, 2.0, 4.0]));

        let labels: Vec<String> = (0..log.len()).filter_map(|i| log.row_label(i)).collect();
        assert_eq!(labels, vec!["c1", "1", "2", "c2", "3"]);
        assert_eq!(log.row_label(5), None);
        assert_eq!(log.calibration_count(), 2);
    }

    #[test]
    fn test_user_edit_applies_to_labels_only() {
        let mut log = RecordLog::new();
        log.append(regular("a", "PET", vec![1.0, 2.0, 4.0]));

        let outcome = log
            .apply_user_edit(false, 0, EditableField::Material, "HDPE ")
            .unwrap();
        assert_eq!(outcome, EditOutcome::Applied);
        let record = log.get(0).unwrap();
        assert_eq!(record.material, "HDPE");
        assert_eq!(record.raw(), &[1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_user_edit_suppressed_while_storing() {
        let mut log = RecordLog::new();
        log.append(regular("a", "PET", vec![1.0, 2.0, 4.0]));

        let outcome = log
            .apply_user_edit(true, 0, EditableField::Name, "changed")
            .unwrap();
        assert_eq!(outcome, EditOutcome::Suppressed);
        assert_eq!(log.get(0).unwrap().name, "a");
    }

    #[test]
    fn test_user_edit_unknown_row() {
        let mut log = RecordLog::new();
        let err = log
            .apply_user_edit(false, 4, EditableField::Color, "blue")
            .unwrap_err();
        assert!(matches!(err, DatasetError::InvalidRow { row: 4, .. }));
    }

    #[test]
    fn test_normalized_values_requires_every_element() {
        let record = regular("a", "PET", vec![1.0, 2.0, 4.0]);
        assert_eq!(record.normalized_values(), None);

        let record = calibration(vec![10.0, 20.0, 30.0]);
        assert_eq!(record.normalized_values(), Some(vec![1.0, 1.0, 1.0]));
    }
}
