// NormalizationEngine - calibration-relative spectral normalization
//
// Two pure transforms turn raw per-wavelength intensities into feature
// vectors that are comparable across measurements:
//
// - snv_transform: Standard Normal Variate, removes additive offset and scale
// - normalize: divides by the calibration baseline per wavelength, then SNV
//
// Neither function mutates its inputs; both allocate the result.

use crate::error::NormalizationError;

/// Arithmetic mean and population standard deviation
fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Standard Normal Variate transform
///
/// Subtracts the mean of `sample` from every element and divides by the
/// population standard deviation.
///
/// # Errors
/// * `DivideByZero` - the standard deviation is zero (all values identical,
///   or an empty sample)
/// * `NonFinite` - the input holds NaN or an infinity
///
/// The result is never silently NaN or infinite.
pub fn snv_transform(sample: &[f64]) -> Result<Vec<f64>, NormalizationError> {
    if sample.is_empty() {
        return Err(NormalizationError::DivideByZero);
    }
    if let Some(index) = sample.iter().position(|v| !v.is_finite()) {
        return Err(NormalizationError::NonFinite { index });
    }

    let (mean, std) = mean_and_std(sample);
    // Rounding can leave a tiny residual spread on a mathematically flat input
    if std == 0.0 || std <= f64::EPSILON * mean.abs() {
        return Err(NormalizationError::DivideByZero);
    }

    Ok(sample.iter().map(|v| (v - mean) / std).collect())
}

/// Divide `sample` by `baseline` element-wise, then apply SNV
///
/// Calibration removes the multiplicative per-wavelength bias of LEDs and
/// sensor; SNV then removes the remaining offset and overall signal level.
///
/// # Errors
/// * `ShapeMismatch` - lengths differ
/// * `DivideByZero` - the quotient has zero variance or a baseline entry is zero
/// * `NonFinite` - the sample or baseline holds NaN or an infinity
pub fn normalize(sample: &[f64], baseline: &[f64]) -> Result<Vec<f64>, NormalizationError> {
    if sample.len() != baseline.len() {
        return Err(NormalizationError::ShapeMismatch {
            expected: baseline.len(),
            actual: sample.len(),
        });
    }
    if baseline.iter().any(|b| *b == 0.0) {
        return Err(NormalizationError::DivideByZero);
    }
    if let Some(index) = baseline.iter().position(|b| !b.is_finite()) {
        return Err(NormalizationError::NonFinite { index });
    }

    let quotient: Vec<f64> = sample
        .iter()
        .zip(baseline.iter())
        .map(|(s, b)| s / b)
        .collect();

    snv_transform(&quotient)
}
