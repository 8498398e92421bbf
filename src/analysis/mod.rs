// Analysis module - numeric transforms and material classification
//
// - normalization: SNV transform and baseline-relative normalization
// - classifier: Classifier capability, centroid model, probability view

pub mod classifier;
pub mod normalization;

pub use classifier::{
    Bar, CentroidClassifier, ClassificationView, Classifier, NamedFeatures, Prediction, SortMode,
};
pub use normalization::{normalize, snv_transform};
