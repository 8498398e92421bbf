// SeriesStore - flat index of measurements by (material bucket, identity)
//
// Entries live in an arena (`Vec<SeriesEntry>`) addressed through a single
// HashMap keyed by the composite SeriesKey, so lookups never walk nested
// maps and iteration follows first-seen order.
//
// Each entry keeps every point it was given plus a lazily created render
// handle holding the last extracted coordinates. A handle is re-extracted
// wholesale when the entry grew or the active axes changed; partial appends
// are never attempted because an axis change invalidates every coordinate.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use super::axis::{AxisKind, AxisSelection};
use super::bucket::{BucketToggles, MaterialBucket, MaterialGroups};
use crate::error::{log_series_error, SeriesError};
use crate::records::Record;

/// One extracted (x, y, z) point
pub type Coordinate = [f64; 3];

/// Composite key of a series: material bucket plus identity (record name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SeriesKey {
    pub bucket: MaterialBucket,
    pub identity: String,
}

impl SeriesKey {
    pub fn new(bucket: MaterialBucket, identity: impl Into<String>) -> Self {
        Self {
            bucket,
            identity: identity.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.identity, self.bucket)
    }
}

/// Values of one record that an axis can select
#[derive(Debug, Clone, PartialEq)]
struct SeriesPoint {
    raw: Vec<f64>,
    snv: Vec<f64>,
    normalized: Vec<Option<f64>>,
}

impl SeriesPoint {
    fn from_record(record: &Record) -> Self {
        Self {
            raw: record.raw().to_vec(),
            snv: record.snv().to_vec(),
            normalized: record.normalized().to_vec(),
        }
    }

    fn value(&self, axis: AxisKind) -> Option<f64> {
        match axis {
            AxisKind::Raw(i) => self.raw.get(i).copied(),
            AxisKind::Snv(i) => self.snv.get(i).copied(),
            AxisKind::Normalized(i) => self.normalized.get(i).copied().flatten(),
        }
    }
}

/// Rendering state of one entry, owned by the store
#[derive(Debug, Clone, PartialEq)]
pub struct RenderHandle {
    pub id: u64,
    /// Number of points the coordinates were extracted from
    pub extracted_len: usize,
    /// Axes the coordinates were extracted with
    pub axes: Option<AxisSelection>,
    pub coordinates: Vec<Coordinate>,
    /// Whether the entry is currently shown
    pub attached: bool,
}

/// All points stored under one SeriesKey
#[derive(Debug, Clone)]
pub struct SeriesEntry {
    key: SeriesKey,
    label: String,
    points: Vec<SeriesPoint>,
    render: Option<RenderHandle>,
}

impl SeriesEntry {
    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    /// `"<identity> | <material>"` using the first record's material text
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn render_handle(&self) -> Option<&RenderHandle> {
        self.render.as_ref()
    }

    fn is_stale(&self, active: &AxisSelection) -> bool {
        match &self.render {
            None => !self.points.is_empty(),
            Some(handle) => {
                self.points.len() > handle.extracted_len || handle.axes.as_ref() != Some(active)
            }
        }
    }
}

/// Outcome of a full refresh pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshReport {
    /// Entries whose coordinates were re-extracted, in pass order
    pub rebuilt: Vec<SeriesKey>,
    /// Entries detached because their bucket is hidden
    pub hidden: Vec<SeriesKey>,
    /// Whether the active axes were switched to SNV during the pass
    pub fell_back: bool,
    /// Active axes after the pass
    pub axes: AxisSelection,
}

/// Extract one coordinate per point, or signal why it cannot be done
fn extract(
    key: &SeriesKey,
    points: &[SeriesPoint],
    axes: &AxisSelection,
) -> Result<Vec<Coordinate>, SeriesError> {
    let mut coordinates = Vec::with_capacity(points.len());
    let mut needs_fallback = false;

    for (row, point) in points.iter().enumerate() {
        let mut coordinate = [0.0; 3];
        for (slot, axis) in axes.axes().iter().enumerate() {
            match point.value(*axis) {
                Some(v) => coordinate[slot] = v,
                None if axis.is_normalized() => needs_fallback = true,
                None => {
                    return Err(SeriesError::InvariantViolation {
                        reason: format!(
                            "series '{}' point {} has no value for {:?}",
                            key, row, axis
                        ),
                    })
                }
            }
        }
        coordinates.push(coordinate);
    }

    if needs_fallback {
        return Err(SeriesError::FallbackRequired { key: key.clone() });
    }
    Ok(coordinates)
}

/// Hierarchical index of stored measurements for 3-D exploration
#[derive(Debug, Clone)]
pub struct SeriesStore {
    groups: MaterialGroups,
    entries: Vec<SeriesEntry>,
    index: HashMap<SeriesKey, usize>,
    active_axes: AxisSelection,
    next_handle: u64,
}

impl SeriesStore {
    pub fn new(groups: MaterialGroups, axes: AxisSelection) -> Self {
        Self {
            groups,
            entries: Vec::new(),
            index: HashMap::new(),
            active_axes: axes,
            next_handle: 0,
        }
    }

    pub fn groups(&self) -> &MaterialGroups {
        &self.groups
    }

    /// Key a record would be stored under
    pub fn key_for(&self, record: &Record) -> SeriesKey {
        SeriesKey::new(self.groups.resolve(&record.material), record.name.clone())
    }

    /// Append a record to its entry, creating the entry on first sight
    pub fn add(&mut self, record: &Record) -> SeriesKey {
        let key = self.key_for(record);
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.entries.len();
                self.entries.push(SeriesEntry {
                    key: key.clone(),
                    label: format!("{} | {}", record.name, record.material),
                    points: Vec::new(),
                    render: None,
                });
                self.index.insert(key.clone(), slot);
                log::debug!("[SeriesStore] New series '{}'", key);
                slot
            }
        };
        self.entries[slot].points.push(SeriesPoint::from_record(record));
        key
    }

    pub fn entry(&self, key: &SeriesKey) -> Option<&SeriesEntry> {
        self.index.get(key).map(|&slot| &self.entries[slot])
    }

    /// Entries in first-seen order
    pub fn entries(&self) -> impl Iterator<Item = &SeriesEntry> {
        self.entries.iter()
    }

    pub fn entries_in_bucket<'a>(
        &'a self,
        bucket: &'a MaterialBucket,
    ) -> impl Iterator<Item = &'a SeriesEntry> + 'a {
        self.entries.iter().filter(move |e| &e.key.bucket == bucket)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Extract the three requested values of every point in the entry
    ///
    /// # Errors
    /// * `FallbackRequired` - some point has a null normalized value on a
    ///   requested axis; retry with `AxisSelection::fallback()` applied to all
    ///   three axes
    /// * `UnknownSeries` - the key was never added
    /// * `InvariantViolation` - a raw or SNV value is missing
    pub fn coordinates(
        &self,
        key: &SeriesKey,
        axis_x: AxisKind,
        axis_y: AxisKind,
        axis_z: AxisKind,
    ) -> Result<Vec<Coordinate>, SeriesError> {
        let entry = self
            .entry(key)
            .ok_or_else(|| SeriesError::UnknownSeries { key: key.clone() })?;
        extract(key, &entry.points, &AxisSelection::new(axis_x, axis_y, axis_z))
    }

    /// Like `coordinates`, retrying once with SNV axes on `FallbackRequired`
    ///
    /// Returns the coordinates together with the selection that produced them.
    /// A second fallback means SNV values were null, which is fatal.
    pub fn coordinates_with_fallback(
        &self,
        key: &SeriesKey,
        axes: AxisSelection,
    ) -> Result<(Vec<Coordinate>, AxisSelection), SeriesError> {
        match self.coordinates(key, axes.x, axes.y, axes.z) {
            Err(SeriesError::FallbackRequired { .. }) => {
                let retry = axes.fallback();
                match self.coordinates(key, retry.x, retry.y, retry.z) {
                    Ok(coordinates) => Ok((coordinates, retry)),
                    Err(SeriesError::FallbackRequired { key }) => {
                        Err(SeriesError::InvariantViolation {
                            reason: format!("SNV retry for '{}' still hit null values", key),
                        })
                    }
                    Err(err) => Err(err),
                }
            }
            other => other.map(|coordinates| (coordinates, axes)),
        }
    }

    pub fn active_axes(&self) -> AxisSelection {
        self.active_axes
    }

    /// Change the active axes; every populated handle becomes stale
    pub fn set_axes(&mut self, axes: AxisSelection) {
        self.active_axes = axes;
    }

    /// Whether the entry needs a full re-extraction under the active axes
    ///
    /// True when the entry grew since its handle was populated or the active
    /// axes differ from the ones the handle was built with.
    pub fn rebuild_if_stale(&self, key: &SeriesKey) -> bool {
        self.entry(key)
            .map(|entry| entry.is_stale(&self.active_axes))
            .unwrap_or(false)
    }

    /// Buckets shown under the given toggles, in display order
    ///
    /// Hidden buckets keep their data; they are only left out of rendering.
    pub fn visible_buckets(&self, toggles: &BucketToggles) -> Vec<MaterialBucket> {
        self.groups
            .buckets()
            .into_iter()
            .filter(|bucket| toggles.is_visible(bucket))
            .collect()
    }

    /// Bring every render handle up to date
    ///
    /// Handles are created lazily, hidden buckets are detached, and stale
    /// visible entries re-extracted. If any entry needs the SNV fallback the
    /// active axes are switched uniformly and the whole pass restarts once
    /// with every entry treated as stale.
    pub fn refresh(&mut self, toggles: &BucketToggles) -> Result<RefreshReport, SeriesError> {
        let mut report = RefreshReport {
            rebuilt: Vec::new(),
            hidden: Vec::new(),
            fell_back: false,
            axes: self.active_axes,
        };

        match self.refresh_pass(toggles, false, &mut report) {
            Err(SeriesError::FallbackRequired { key }) => {
                log::warn!(
                    "[SeriesStore] Normalized axes requested but '{}' has uncalibrated points; switching to SNV axes",
                    key
                );
                self.active_axes = self.active_axes.fallback();
                report.fell_back = true;
                report.rebuilt.clear();
                report.hidden.clear();
                match self.refresh_pass(toggles, true, &mut report) {
                    Err(SeriesError::FallbackRequired { key }) => {
                        let err = SeriesError::InvariantViolation {
                            reason: format!("SNV retry for '{}' still hit null values", key),
                        };
                        log_series_error(&err, "refresh");
                        Err(err)
                    }
                    other => other,
                }
            }
            other => other,
        }?;

        report.axes = self.active_axes;
        Ok(report)
    }

    fn refresh_pass(
        &mut self,
        toggles: &BucketToggles,
        axis_changed: bool,
        report: &mut RefreshReport,
    ) -> Result<(), SeriesError> {
        let active = self.active_axes;

        for entry in self.entries.iter_mut() {
            let stale = axis_changed || entry.is_stale(&active);

            if entry.render.is_none() {
                entry.render = Some(RenderHandle {
                    id: self.next_handle,
                    extracted_len: 0,
                    axes: None,
                    coordinates: Vec::new(),
                    attached: true,
                });
                self.next_handle += 1;
            }

            if !toggles.is_visible(&entry.key.bucket) {
                if let Some(handle) = entry.render.as_mut() {
                    handle.attached = false;
                }
                report.hidden.push(entry.key.clone());
                continue;
            }

            if stale {
                let coordinates = extract(&entry.key, &entry.points, &active)?;
                if let Some(handle) = entry.render.as_mut() {
                    handle.extracted_len = entry.points.len();
                    handle.axes = Some(active);
                    handle.coordinates = coordinates;
                }
                report.rebuilt.push(entry.key.clone());
            }
            if let Some(handle) = entry.render.as_mut() {
                handle.attached = true;
            }
        }
        Ok(())
    }

    /// Drop every entry together with its render handle
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
        log::info!("[SeriesStore] Cleared all series");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::tests::{calibration, regular};
    use crate::records::{MeasurementType, RecordLabels};

    fn normalized_axes() -> AxisSelection {
        AxisSelection::new(
            AxisKind::Normalized(0),
            AxisKind::Normalized(1),
            AxisKind::Normalized(2),
        )
    }

    fn store() -> SeriesStore {
        SeriesStore::new(MaterialGroups::default(), normalized_axes())
    }

    fn calibrated(name: &str, material: &str, raw: Vec<f64>, norm: Vec<f64>) -> Record {
        let snv = crate::analysis::snv_transform(&raw).unwrap();
        Record::from_parts(
            RecordLabels::new(name, material, ""),
            MeasurementType::Regular,
            crate::records::tests::fixed_timestamp(),
            raw,
            snv,
            norm.into_iter().map(Some).collect(),
        )
        .unwrap()
    }

    fn pet(identity: &str) -> SeriesKey {
        SeriesKey::new(MaterialBucket::Listed("PET".to_string()), identity)
    }

    #[test]
    fn test_two_identities_under_one_material() {
        let mut store = store();
        store.add(&regular("sample-1", "PET", vec![1.0, 2.0, 4.0]));
        store.add(&regular("sample-1", "PET", vec![1.0, 3.0, 4.0]));
        store.add(&regular("sample-2", "PET", vec![2.0, 3.0, 4.0]));

        let bucket = MaterialBucket::Listed("PET".to_string());
        let lengths: Vec<usize> = store.entries_in_bucket(&bucket).map(|e| e.len()).collect();
        assert_eq!(lengths, vec![2, 1]);
        assert_eq!(store.entry(&pet("sample-1")).unwrap().len(), 2);
        assert_eq!(store.entry(&pet("sample-2")).unwrap().len(), 1);
    }

    #[test]
    fn test_coordinates_preserve_insertion_order() {
        let mut store = store();
        let raws = [vec![1.0, 2.0, 4.0], vec![3.0, 2.0, 1.0], vec![5.0, 7.0, 6.0]];
        for raw in raws.iter() {
            store.add(&regular("s", "PP", raw.clone()));
        }

        let key = SeriesKey::new(MaterialBucket::Listed("PP".to_string()), "s");
        let coords = store
            .coordinates(&key, AxisKind::Raw(0), AxisKind::Raw(1), AxisKind::Raw(2))
            .unwrap();
        assert_eq!(coords.len(), 3);
        for (coord, raw) in coords.iter().zip(raws.iter()) {
            assert_eq!(coord, &[raw[0], raw[1], raw[2]]);
        }
    }

    #[test]
    fn test_unlisted_and_empty_materials_are_bucketed() {
        let mut store = store();
        let other = store.add(&regular("x", "glass", vec![1.0, 2.0, 4.0]));
        let unknown = store.add(&regular("y", "", vec![1.0, 2.0, 4.0]));
        assert_eq!(other.bucket, MaterialBucket::Other);
        assert_eq!(unknown.bucket, MaterialBucket::Unknown);
        assert_eq!(store.entry(&other).unwrap().label(), "x | glass");
    }

    #[test]
    fn test_null_normalized_requires_fallback() {
        let mut store = store();
        store.add(&calibrated("s", "PET", vec![1.0, 2.0, 4.0], vec![-1.0, 0.0, 1.0]));
        store.add(&regular("s", "PET", vec![1.0, 3.0, 4.0]));

        let key = pet("s");
        let err = store
            .coordinates(
                &key,
                AxisKind::Normalized(0),
                AxisKind::Normalized(1),
                AxisKind::Raw(2),
            )
            .unwrap_err();
        assert_eq!(err, SeriesError::FallbackRequired { key: key.clone() });

        let retry = AxisSelection::new(
            AxisKind::Normalized(0),
            AxisKind::Normalized(1),
            AxisKind::Raw(2),
        )
        .fallback();
        let coords = store.coordinates(&key, retry.x, retry.y, retry.z).unwrap();
        assert_eq!(coords.len(), 2);
    }

    #[test]
    fn test_coordinates_with_fallback_reports_axes() {
        let mut store = store();
        store.add(&regular("s", "PET", vec![1.0, 3.0, 4.0]));

        let (coords, axes) = store
            .coordinates_with_fallback(&pet("s"), normalized_axes())
            .unwrap();
        assert_eq!(coords.len(), 1);
        assert_eq!(axes, normalized_axes().fallback());
    }

    #[test]
    fn test_unknown_series() {
        let store = store();
        assert!(matches!(
            store.coordinates(&pet("nope"), AxisKind::Raw(0), AxisKind::Raw(1), AxisKind::Raw(2)),
            Err(SeriesError::UnknownSeries { .. })
        ));
    }

    #[test]
    fn test_out_of_range_raw_axis_is_invariant_violation() {
        let mut store = store();
        store.add(&regular("s", "PET", vec![1.0, 3.0, 4.0]));
        let err = store
            .coordinates(&pet("s"), AxisKind::Raw(0), AxisKind::Snv(9), AxisKind::Raw(2))
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_rebuild_if_stale_tracks_growth_and_axes() {
        let mut store = store();
        let toggles = BucketToggles::new();
        let key = store.add(&calibration(vec![10.0, 20.0, 30.0]));
        assert!(store.rebuild_if_stale(&key));

        store.refresh(&toggles).unwrap();
        assert!(!store.rebuild_if_stale(&key));

        store.add(&calibration(vec![11.0, 20.0, 30.0]));
        assert!(store.rebuild_if_stale(&key));
        store.refresh(&toggles).unwrap();
        assert!(!store.rebuild_if_stale(&key));

        store.set_axes(AxisSelection::new(
            AxisKind::Raw(0),
            AxisKind::Raw(1),
            AxisKind::Raw(2),
        ));
        assert!(store.rebuild_if_stale(&key));
    }

    #[test]
    fn test_refresh_only_rebuilds_stale_entries() {
        let mut store = store();
        let toggles = BucketToggles::new();
        store.add(&calibrated("a", "PET", vec![1.0, 2.0, 4.0], vec![-1.0, 0.0, 1.0]));
        store.add(&calibrated("b", "PP", vec![1.0, 2.0, 4.0], vec![-1.0, 0.0, 1.0]));

        let first = store.refresh(&toggles).unwrap();
        assert_eq!(first.rebuilt.len(), 2);
        assert!(!first.fell_back);

        store.add(&calibrated("b", "PP", vec![1.0, 2.5, 4.0], vec![-1.0, 0.1, 1.0]));
        let second = store.refresh(&toggles).unwrap();
        assert_eq!(
            second.rebuilt,
            vec![SeriesKey::new(MaterialBucket::Listed("PP".to_string()), "b")]
        );
    }

    #[test]
    fn test_refresh_falls_back_uniformly() {
        let mut store = store();
        let toggles = BucketToggles::new();
        store.add(&calibrated("a", "PET", vec![1.0, 2.0, 4.0], vec![-1.0, 0.0, 1.0]));
        store.add(&regular("b", "PET", vec![1.0, 3.0, 4.0]));

        let report = store.refresh(&toggles).unwrap();
        assert!(report.fell_back);
        assert_eq!(report.axes, normalized_axes().fallback());
        assert_eq!(store.active_axes(), normalized_axes().fallback());
        // Both entries are re-extracted with the SNV axes
        assert_eq!(report.rebuilt.len(), 2);
        for entry in store.entries() {
            let handle = entry.render_handle().unwrap();
            assert_eq!(handle.axes, Some(normalized_axes().fallback()));
            assert_eq!(handle.coordinates.len(), entry.len());
        }
    }

    #[test]
    fn test_hidden_bucket_keeps_data() {
        let mut store = store();
        let mut toggles = BucketToggles::new();
        toggles.set_visible(MaterialBucket::Other, false);
        let key = store.add(&regular("g", "glass", vec![1.0, 3.0, 4.0]));

        let report = store.refresh(&toggles).unwrap();
        assert_eq!(report.hidden, vec![key.clone()]);
        assert!(!report.fell_back);
        let entry = store.entry(&key).unwrap();
        assert_eq!(entry.len(), 1);
        assert!(!entry.render_handle().unwrap().attached);
        assert!(!store
            .visible_buckets(&toggles)
            .contains(&MaterialBucket::Other));
    }

    #[test]
    fn test_visible_buckets_order() {
        let store = store();
        let names: Vec<String> = store
            .visible_buckets(&BucketToggles::new())
            .iter()
            .map(|b| b.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["PET", "HDPE", "PVC", "LDPE", "PP", "PS", "other", "unknown"]
        );
    }

    #[test]
    fn test_clear_discards_entries_and_handles() {
        let mut store = store();
        let key = store.add(&regular("s", "PET", vec![1.0, 3.0, 4.0]));
        store.refresh(&BucketToggles::new()).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert!(store.entry(&key).is_none());
        assert!(!store.rebuild_if_stale(&key));
    }
}
