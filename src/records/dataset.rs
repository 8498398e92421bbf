//! CSV export and import of the record log.
//!
//! Layout, one row per record:
//! `Reading, Name, PlasticType, Color, MeasurementType, DateTime`, then
//! `nm<wl>` (raw), `nm<wl>_snv` and `nm<wl>_norm` for every wavelength.
//! Numbers are fixed-point with 7 fractional digits; a null normalized value
//! is an empty cell. Imports are all-or-nothing.

use std::io::{Read, Write};

use chrono::NaiveDateTime;

use super::{MeasurementType, Record, RecordLabels};
use crate::error::{log_dataset_error, DatasetError};

/// Format used for the DateTime column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const LABEL_COLUMNS: [&str; 6] = [
    "Reading",
    "Name",
    "PlasticType",
    "Color",
    "MeasurementType",
    "DateTime",
];

/// Column names for a device with the given wavelengths
pub fn schema(wavelengths: &[u32]) -> Vec<String> {
    LABEL_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(wavelengths.iter().map(|wl| format!("nm{}", wl)))
        .chain(wavelengths.iter().map(|wl| format!("nm{}_snv", wl)))
        .chain(wavelengths.iter().map(|wl| format!("nm{}_norm", wl)))
        .collect()
}

fn format_value(value: f64) -> String {
    format!("{:.7}", value)
}

/// Write every record as CSV
pub fn export_records<W: Write>(
    records: &[Record],
    wavelengths: &[u32],
    writer: W,
) -> Result<(), DatasetError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(schema(wavelengths))?;

    for (reading, record) in records.iter().enumerate() {
        if record.len() != wavelengths.len() {
            return Err(DatasetError::InvalidRow {
                row: reading,
                reason: format!(
                    "record has {} values for {} wavelengths",
                    record.len(),
                    wavelengths.len()
                ),
            });
        }

        let mut row: Vec<String> = vec![
            reading.to_string(),
            record.name.clone(),
            record.material.clone(),
            record.color.clone(),
            record.measurement_type.as_str().to_string(),
            record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        ];
        row.extend(record.raw().iter().map(|v| format_value(*v)));
        row.extend(record.snv().iter().map(|v| format_value(*v)));
        row.extend(
            record
                .normalized()
                .iter()
                .map(|v| v.map(format_value).unwrap_or_default()),
        );
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    log::info!("[Dataset] Exported {} records", records.len());
    Ok(())
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

fn parse_number(row: usize, column: &str, value: &str) -> Result<f64, DatasetError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|err| DatasetError::InvalidRow {
            row,
            reason: format!("column {}: {:?} is not a number ({})", column, value, err),
        })
}

/// Read records from CSV, validating the header against the schema first
///
/// Nothing is returned unless every row converts; callers replace their
/// in-memory state only on `Ok`.
pub fn import_records<R: Read>(reader: R, wavelengths: &[u32]) -> Result<Vec<Record>, DatasetError> {
    let expected = schema(wavelengths);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let found: Vec<String> = csv_reader.headers()?.iter().map(|h| h.to_string()).collect();
    if found != expected {
        let err = DatasetError::SchemaMismatch { expected, found };
        log_dataset_error(&err, "import_records");
        return Err(err);
    }

    let n = wavelengths.len();
    let raw_start = LABEL_COLUMNS.len();
    let snv_start = raw_start + n;
    let norm_start = snv_start + n;

    let mut records = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        let fields = result?;
        let cell = |i: usize| fields.get(i).unwrap_or("");

        let measurement_type =
            MeasurementType::parse(cell(4)).ok_or_else(|| DatasetError::InvalidRow {
                row,
                reason: format!("unknown measurement type {:?}", cell(4)),
            })?;
        let timestamp = parse_timestamp(cell(5)).ok_or_else(|| DatasetError::InvalidRow {
            row,
            reason: format!("unparseable DateTime {:?}", cell(5)),
        })?;

        let mut raw = Vec::with_capacity(n);
        let mut snv = Vec::with_capacity(n);
        let mut normalized = Vec::with_capacity(n);
        for i in 0..n {
            raw.push(parse_number(row, &expected[raw_start + i], cell(raw_start + i))?);
            snv.push(parse_number(row, &expected[snv_start + i], cell(snv_start + i))?);
            let norm = cell(norm_start + i);
            normalized.push(if norm.trim().is_empty() {
                None
            } else {
                Some(parse_number(row, &expected[norm_start + i], norm)?)
            });
        }

        let labels = RecordLabels::new(cell(1), cell(2), cell(3));
        let record = Record::from_parts(labels, measurement_type, timestamp, raw, snv, normalized)
            .map_err(|err| DatasetError::InvalidRow {
                row,
                reason: err.to_string(),
            })?;
        records.push(record);
    }

    log::info!("[Dataset] Imported {} records", records.len());
    Ok(records)
}
