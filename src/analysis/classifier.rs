// Classifier capability and the probability view built on top of it
//
// The trained material model is an external collaborator. This module only
// defines the capability it must offer (`Classifier::predict_proba`), a small
// centroid model usable from the CLI, and `ClassificationView`, which turns
// the newest normalized record into an ordered set of percentage bars.
//
// Features handed to the model are the calibration-normalized values named
// after the raw columns (`nm<wavelength>`), never the SNV columns.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{log_classifier_error, ClassifierError};
use crate::records::Record;

/// Named feature vector handed to a classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedFeatures {
    pub names: Vec<String>,
    pub values: Vec<f64>,
}

impl NamedFeatures {
    /// Normalized values of `record` named `nm<wavelength>`
    ///
    /// Returns None when the record was captured without a baseline.
    pub fn from_record(record: &Record, wavelengths: &[u32]) -> Option<Self> {
        let values = record.normalized_values()?;
        Some(Self {
            names: wavelengths.iter().map(|wl| format!("nm{}", wl)).collect(),
            values,
        })
    }
}

/// Black-box probability model over a fixed set of class labels
pub trait Classifier {
    /// Class labels in the model's native order
    fn classes(&self) -> &[String];

    /// One probability per class, in `classes()` order
    fn predict_proba(&self, features: &NamedFeatures) -> Result<Vec<f64>, ClassifierError>;
}

/// Nearest-centroid model described in JSON
///
/// The probability of class k is proportional to the inverse Euclidean
/// distance between the features and centroid k. A feature vector that sits
/// exactly on a centroid gets probability 1 for that class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidClassifier {
    classes: Vec<String>,
    feature_names: Vec<String>,
    centroids: Vec<Vec<f64>>,
}

impl CentroidClassifier {
    pub fn new(
        classes: Vec<String>,
        feature_names: Vec<String>,
        centroids: Vec<Vec<f64>>,
    ) -> Result<Self, ClassifierError> {
        let model = Self {
            classes,
            feature_names,
            centroids,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ClassifierError> {
        let model: Self =
            serde_json::from_str(json).map_err(|err| ClassifierError::InvalidModel {
                reason: err.to_string(),
            })?;
        model.validate()?;
        Ok(model)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let json = fs::read_to_string(&path).map_err(|err| ClassifierError::Io {
            details: format!("{}: {}", path.as_ref().display(), err),
        })?;
        let model = Self::from_json_str(&json).inspect_err(|err| {
            log_classifier_error(err, "load_model");
        })?;
        log::info!(
            "[Classifier] Loaded centroid model with {} classes from {:?}",
            model.classes.len(),
            path.as_ref()
        );
        Ok(model)
    }

    fn validate(&self) -> Result<(), ClassifierError> {
        if self.classes.is_empty() {
            return Err(ClassifierError::InvalidModel {
                reason: "model has no classes".to_string(),
            });
        }
        if self.centroids.len() != self.classes.len() {
            return Err(ClassifierError::InvalidModel {
                reason: format!(
                    "{} centroids for {} classes",
                    self.centroids.len(),
                    self.classes.len()
                ),
            });
        }
        if let Some((i, _)) = self
            .centroids
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != self.feature_names.len())
        {
            return Err(ClassifierError::InvalidModel {
                reason: format!(
                    "centroid of {} has the wrong number of features",
                    self.classes[i]
                ),
            });
        }
        Ok(())
    }
}

impl Classifier for CentroidClassifier {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn predict_proba(&self, features: &NamedFeatures) -> Result<Vec<f64>, ClassifierError> {
        if features.names != self.feature_names || features.values.len() != features.names.len() {
            return Err(ClassifierError::FeatureMismatch {
                expected: self.feature_names.clone(),
                actual: features.names.clone(),
            });
        }

        let distances: Vec<f64> = self
            .centroids
            .iter()
            .map(|centroid| {
                centroid
                    .iter()
                    .zip(features.values.iter())
                    .map(|(c, v)| (c - v).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect();

        if let Some(hit) = distances.iter().position(|d| *d == 0.0) {
            return Ok((0..distances.len())
                .map(|i| if i == hit { 1.0 } else { 0.0 })
                .collect());
        }

        let scores: Vec<f64> = distances.iter().map(|d| 1.0 / d).collect();
        let sum: f64 = scores.iter().sum();
        Ok(scores.iter().map(|s| s / sum).collect())
    }
}

/// Bar ordering of the probability display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Native class order, reversed so the first class is drawn on top
    Default,
    /// Ascending by probability, ties keep their default-mode order
    ByScore,
}

/// One bar of the display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: String,
    /// Probability in percent, full precision
    pub percent: f64,
    /// Rounded percentage shown next to the bar
    pub display: u32,
}

/// Full-precision classifier output for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub classes: Vec<String>,
    /// Probabilities in [0, 1], in native class order
    pub probabilities: Vec<f64>,
}

impl Prediction {
    /// Label -> probability in percent, native order
    pub fn percentages(&self) -> Vec<(String, f64)> {
        self.classes
            .iter()
            .cloned()
            .zip(self.probabilities.iter().map(|p| p * 100.0))
            .collect()
    }

    pub fn percent(&self, label: &str) -> Option<f64> {
        self.classes
            .iter()
            .position(|c| c == label)
            .map(|i| self.probabilities[i] * 100.0)
    }

    /// Class with the highest probability
    pub fn best(&self) -> Option<(&str, f64)> {
        self.classes
            .iter()
            .zip(self.probabilities.iter())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(c, p)| (c.as_str(), *p))
    }
}

/// Probability bars for the newest record
pub struct ClassificationView {
    classifier: Box<dyn Classifier>,
    wavelengths: Vec<u32>,
    /// Percent per class in native order; zeros while frozen
    shown: Vec<f64>,
    latest: Option<Prediction>,
    disabled: bool,
}

impl ClassificationView {
    pub fn new(classifier: Box<dyn Classifier>, wavelengths: Vec<u32>) -> Self {
        let shown = vec![0.0; classifier.classes().len()];
        Self {
            classifier,
            wavelengths,
            shown,
            latest: None,
            disabled: false,
        }
    }

    pub fn classes(&self) -> &[String] {
        self.classifier.classes()
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Disabling freezes the bars at zero; enabling leaves them until the
    /// next `predict`
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
        if disabled {
            self.zero();
        }
    }

    /// Last full-precision prediction, if the view is live
    pub fn latest(&self) -> Option<&Prediction> {
        self.latest.as_ref()
    }

    fn zero(&mut self) {
        self.shown.iter_mut().for_each(|v| *v = 0.0);
        self.latest = None;
    }

    /// Run the classifier on the record's normalized vector
    ///
    /// Returns `Ok(None)` without calling the model when the view is disabled
    /// or the record has no normalized values; the bars then read zero.
    pub fn predict(&mut self, record: &Record) -> Result<Option<&Prediction>, ClassifierError> {
        if self.disabled {
            return Ok(None);
        }

        let Some(features) = NamedFeatures::from_record(record, &self.wavelengths) else {
            log::warn!("[Classifier] Newest record has no normalized values; prediction skipped");
            self.zero();
            return Ok(None);
        };

        let probabilities = self.classifier.predict_proba(&features).inspect_err(|err| {
            log_classifier_error(err, "predict");
        })?;
        let classes = self.classifier.classes().to_vec();
        if probabilities.len() != classes.len() {
            let err = ClassifierError::InvalidModel {
                reason: format!(
                    "{} probabilities for {} classes",
                    probabilities.len(),
                    classes.len()
                ),
            };
            log_classifier_error(&err, "predict");
            return Err(err);
        }

        self.shown = probabilities.iter().map(|p| p * 100.0).collect();
        self.latest = Some(Prediction {
            classes,
            probabilities,
        });
        Ok(self.latest.as_ref())
    }

    /// Bars in display order, top to bottom
    pub fn ordering(&self, mode: SortMode) -> Vec<Bar> {
        let mut bars: Vec<Bar> = self
            .classifier
            .classes()
            .iter()
            .zip(self.shown.iter())
            .rev()
            .map(|(label, percent)| Bar {
                label: label.clone(),
                percent: *percent,
                display: percent.round().clamp(0.0, 100.0) as u32,
            })
            .collect();

        if mode == SortMode::ByScore {
            // sort_by is stable, so ties keep the default order
            bars.sort_by(|a, b| a.percent.total_cmp(&b.percent));
        }
        bars
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
