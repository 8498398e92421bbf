use super::*;
use crate::records::tests::{calibration, fixed_timestamp, regular};
use crate::records::{MeasurementType, RecordLabels};

const WAVELENGTHS: [u32; 3] = [940, 1050, 1200];

/// Classifier that ignores its input and returns fixed probabilities
struct FixedClassifier {
    classes: Vec<String>,
    probabilities: Vec<f64>,
}

impl FixedClassifier {
    fn boxed(pairs: &[(&str, f64)]) -> Box<dyn Classifier> {
        Box::new(Self {
            classes: pairs.iter().map(|(c, _)| c.to_string()).collect(),
            probabilities: pairs.iter().map(|(_, p)| *p).collect(),
        })
    }
}

impl Classifier for FixedClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, _features: &NamedFeatures) -> Result<Vec<f64>, ClassifierError> {
        Ok(self.probabilities.clone())
    }
}

fn normalized_record(values: Vec<f64>) -> Record {
    let snv = crate::analysis::snv_transform(&values).unwrap();
    let normalized = values.iter().copied().map(Some).collect();
    Record::from_parts(
        RecordLabels::new("sample", "PET", ""),
        MeasurementType::Regular,
        fixed_timestamp(),
        values,
        snv,
        normalized,
    )
    .unwrap()
}

fn labels_and_percents(bars: &[Bar]) -> Vec<(String, u32)> {
    bars.iter().map(|b| (b.label.clone(), b.display)).collect()
}

fn feature_names() -> Vec<String> {
    WAVELENGTHS.iter().map(|wl| format!("nm{}", wl)).collect()
}

// ========================================================================
// ClassificationView ordering
// ========================================================================

#[test]
fn test_default_order_is_reversed_native_order() {
    let mut view = ClassificationView::new(
        FixedClassifier::boxed(&[("A", 0.1), ("B", 0.9), ("C", 0.5)]),
        WAVELENGTHS.to_vec(),
    );
    view.predict(&normalized_record(vec![0.5, 1.0, 1.5]))
        .unwrap();

    let bars = view.ordering(SortMode::Default);
    assert_eq!(
        labels_and_percents(&bars),
        vec![
            ("C".to_string(), 50),
            ("B".to_string(), 90),
            ("A".to_string(), 10)
        ]
    );
}

#[test]
fn test_by_score_order_is_ascending() {
    let mut view = ClassificationView::new(
        FixedClassifier::boxed(&[("A", 0.1), ("B", 0.9), ("C", 0.5)]),
        WAVELENGTHS.to_vec(),
    );
    view.predict(&normalized_record(vec![0.5, 1.0, 1.5]))
        .unwrap();

    let bars = view.ordering(SortMode::ByScore);
    assert_eq!(
        labels_and_percents(&bars),
        vec![
            ("A".to_string(), 10),
            ("C".to_string(), 50),
            ("B".to_string(), 90)
        ]
    );
}

#[test]
fn test_by_score_ties_keep_default_order() {
    let mut view = ClassificationView::new(
        FixedClassifier::boxed(&[("A", 0.25), ("B", 0.5), ("C", 0.25)]),
        WAVELENGTHS.to_vec(),
    );
    view.predict(&normalized_record(vec![0.5, 1.0, 1.5]))
        .unwrap();

    let labels: Vec<String> = view
        .ordering(SortMode::ByScore)
        .into_iter()
        .map(|b| b.label)
        .collect();
    // Default order is C, B, A; the tie between C and A keeps C first
    assert_eq!(labels, vec!["C", "A", "B"]);
}

#[test]
fn test_display_is_rounded_but_percent_keeps_precision() {
    let mut view = ClassificationView::new(
        FixedClassifier::boxed(&[("A", 0.12345), ("B", 0.87655)]),
        WAVELENGTHS.to_vec(),
    );
    let prediction = view
        .predict(&normalized_record(vec![0.5, 1.0, 1.5]))
        .unwrap()
        .cloned()
        .unwrap();

    assert!((prediction.percent("A").unwrap() - 12.345).abs() < 1e-9);
    let bars = view.ordering(SortMode::Default);
    assert_eq!(bars[1].label, "A");
    assert_eq!(bars[1].display, 12);
    assert!((bars[1].percent - 12.345).abs() < 1e-9);
    assert_eq!(prediction.best(), Some(("B", 0.87655)));
}

// ========================================================================
// Unavailable and disabled states
// ========================================================================

#[test]
fn test_record_without_baseline_zeroes_bars() {
    let mut view = ClassificationView::new(
        FixedClassifier::boxed(&[("A", 0.4), ("B", 0.6)]),
        WAVELENGTHS.to_vec(),
    );
    view.predict(&normalized_record(vec![0.5, 1.0, 1.5]))
        .unwrap();

    let result = view
        .predict(&regular("x", "PET", vec![1.0, 2.0, 4.0]))
        .unwrap();
    assert!(result.is_none(), "No prediction without normalized values");
    assert!(view.latest().is_none());
    assert!(view
        .ordering(SortMode::Default)
        .iter()
        .all(|b| b.percent == 0.0));
}

#[test]
fn test_disabled_view_is_frozen_at_zero() {
    let mut view = ClassificationView::new(
        FixedClassifier::boxed(&[("A", 0.4), ("B", 0.6)]),
        WAVELENGTHS.to_vec(),
    );
    view.predict(&normalized_record(vec![0.5, 1.0, 1.5]))
        .unwrap();

    view.set_disabled(true);
    assert!(view.is_disabled());
    assert!(view
        .ordering(SortMode::ByScore)
        .iter()
        .all(|b| b.display == 0));

    let result = view
        .predict(&normalized_record(vec![0.5, 1.0, 1.5]))
        .unwrap();
    assert!(result.is_none(), "Disabled view must not call the model");
    assert!(view
        .ordering(SortMode::Default)
        .iter()
        .all(|b| b.display == 0));

    view.set_disabled(false);
    view.predict(&normalized_record(vec![0.5, 1.0, 1.5]))
        .unwrap();
    assert_eq!(view.ordering(SortMode::Default)[0].display, 60);
}

#[test]
fn test_probability_count_mismatch_is_rejected() {
    struct ShortClassifier {
        classes: Vec<String>,
    }
    impl Classifier for ShortClassifier {
        fn classes(&self) -> &[String] {
            &self.classes
        }
        fn predict_proba(&self, _: &NamedFeatures) -> Result<Vec<f64>, ClassifierError> {
            Ok(vec![1.0])
        }
    }

    let mut view = ClassificationView::new(
        Box::new(ShortClassifier {
            classes: vec!["A".to_string(), "B".to_string()],
        }),
        WAVELENGTHS.to_vec(),
    );
    let err = view
        .predict(&normalized_record(vec![0.5, 1.0, 1.5]))
        .unwrap_err();
    assert!(matches!(err, ClassifierError::InvalidModel { .. }));
}

// ========================================================================
// Features
// ========================================================================

#[test]
fn test_features_use_normalized_values_with_raw_names() {
    let record = calibration(vec![10.0, 20.0, 30.0]);
    let features = NamedFeatures::from_record(&record, &WAVELENGTHS).unwrap();
    assert_eq!(features.names, vec!["nm940", "nm1050", "nm1200"]);
    assert_eq!(features.values, vec![1.0, 1.0, 1.0]);
}

// ========================================================================
// CentroidClassifier
// ========================================================================

#[test]
fn test_centroid_probabilities_sum_to_one() {
    let model = CentroidClassifier::new(
        vec!["PET".to_string(), "PP".to_string()],
        feature_names(),
        vec![vec![1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0]],
    )
    .unwrap();

    let features = NamedFeatures {
        names: feature_names(),
        values: vec![1.2, 1.2, 1.2],
    };
    let proba = model.predict_proba(&features).unwrap();
    assert_eq!(proba.len(), 2);
    assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    assert!(proba[0] > proba[1], "Closer centroid should win: {:?}", proba);
}

#[test]
fn test_centroid_exact_hit_is_certain() {
    let model = CentroidClassifier::new(
        vec!["PET".to_string(), "PP".to_string()],
        feature_names(),
        vec![vec![1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0]],
    )
    .unwrap();

    let features = NamedFeatures::from_record(&calibration(vec![5.0, 6.0, 7.0]), &WAVELENGTHS)
        .unwrap();
    assert_eq!(model.predict_proba(&features).unwrap(), vec![1.0, 0.0]);
}

#[test]
fn test_centroid_rejects_foreign_features() {
    let model = CentroidClassifier::new(
        vec!["PET".to_string()],
        feature_names(),
        vec![vec![1.0, 1.0, 1.0]],
    )
    .unwrap();

    let features = NamedFeatures {
        names: vec!["nm940_snv".into(), "nm1050_snv".into(), "nm1200_snv".into()],
        values: vec![0.0, 0.0, 0.0],
    };
    assert!(matches!(
        model.predict_proba(&features),
        Err(ClassifierError::FeatureMismatch { .. })
    ));
}

#[test]
fn test_centroid_model_from_json() {
    let json = r#"{
        "classes": ["HDPE", "PET"],
        "feature_names": ["nm940", "nm1050", "nm1200"],
        "centroids": [[0.9, 1.0, 1.1], [1.1, 1.0, 0.9]]
    }"#;
    let model = CentroidClassifier::from_json_str(json).unwrap();
    assert_eq!(model.classes(), &["HDPE".to_string(), "PET".to_string()]);
}

#[test]
fn test_centroid_model_validation() {
    let missing_centroid = r#"{
        "classes": ["HDPE", "PET"],
        "feature_names": ["nm940"],
        "centroids": [[0.9]]
    }"#;
    assert!(matches!(
        CentroidClassifier::from_json_str(missing_centroid),
        Err(ClassifierError::InvalidModel { .. })
    ));

    let short_centroid = r#"{
        "classes": ["PET"],
        "feature_names": ["nm940", "nm1050"],
        "centroids": [[0.9]]
    }"#;
    assert!(matches!(
        CentroidClassifier::from_json_str(short_centroid),
        Err(ClassifierError::InvalidModel { .. })
    ));

    assert!(matches!(
        CentroidClassifier::from_json_str("not json"),
        Err(ClassifierError::InvalidModel { .. })
    ));
}

#[test]
fn test_centroid_model_missing_file() {
    let err = CentroidClassifier::load("/nonexistent/model.json").unwrap_err();
    assert!(matches!(err, ClassifierError::Io { .. }));
}
