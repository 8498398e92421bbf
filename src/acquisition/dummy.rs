// Offline stand-in for the scanner
//
// Returns a fixed reference vector with a small positive jitter added to each
// element. The generator is seeded so runs are reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Acquirer;
use crate::config::HardwareConfig;
use crate::error::AcquisitionError;

pub struct DummyAcquirer {
    base: Vec<f64>,
    jitter: (f64, f64),
    rng: StdRng,
}

impl DummyAcquirer {
    /// `jitter` is the inclusive range of the offset added to every element;
    /// `[0.0, 0.0]` yields `base` unchanged on every read
    pub fn new(base: Vec<f64>, jitter: [f64; 2], seed: u64) -> Self {
        let (low, high) = if jitter[0] <= jitter[1] {
            (jitter[0], jitter[1])
        } else {
            (jitter[1], jitter[0])
        };
        Self {
            base,
            jitter: (low, high),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_config(hardware: &HardwareConfig) -> Self {
        Self::new(
            hardware.dummy_sample.clone(),
            hardware.dummy_jitter,
            hardware.dummy_seed,
        )
    }

    pub fn base(&self) -> &[f64] {
        &self.base
    }
}

impl Acquirer for DummyAcquirer {
    fn read(&mut self) -> Result<Vec<f64>, AcquisitionError> {
        let (low, high) = self.jitter;
        if low == high {
            return Ok(self.base.iter().map(|v| v + low).collect());
        }
        Ok(self
            .base
            .iter()
            .map(|v| v + self.rng.gen_range(low..=high))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_jitter_is_fixed() {
        let mut dummy = DummyAcquirer::new(vec![0.2278, 0.2264], [0.0, 0.0], 7);
        assert_eq!(dummy.read().unwrap(), vec![0.2278, 0.2264]);
        assert_eq!(dummy.read().unwrap(), vec![0.2278, 0.2264]);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let base = vec![0.2278, 0.2264, 0.2178, 0.2379];
        let mut dummy = DummyAcquirer::new(base.clone(), [0.0015, 0.0080], 1);
        for _ in 0..50 {
            let sample = dummy.read().unwrap();
            for (v, b) in sample.iter().zip(base.iter()) {
                let offset = v - b;
                assert!(
                    (0.0015 - 1e-12..=0.0080 + 1e-12).contains(&offset),
                    "offset {} out of range",
                    offset
                );
            }
        }
    }

    #[test]
    fn test_same_seed_same_samples() {
        let base = vec![1.0, 2.0, 3.0];
        let mut a = DummyAcquirer::new(base.clone(), [0.0015, 0.0080], 42);
        let mut b = DummyAcquirer::new(base, [0.0015, 0.0080], 42);
        assert_eq!(a.read().unwrap(), b.read().unwrap());
    }

    #[test]
    fn test_from_config_uses_default_vector() {
        let hardware = HardwareConfig::default();
        let dummy = DummyAcquirer::from_config(&hardware);
        assert_eq!(dummy.base().len(), hardware.wavelengths.len());
    }
}
