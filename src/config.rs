//! Configuration management for device and display parameters
//!
//! This module provides runtime configuration loading from JSON files so the
//! wavelength layout, material enumeration and default 3-D axes can be
//! changed per device without recompilation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::series::{AxisKind, AxisSelection};

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub hardware: HardwareConfig,
    #[serde(default)]
    pub materials: MaterialsConfig,
    #[serde(default)]
    pub scatter: ScatterConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Scanner hardware constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// LED wavelengths in nanometers, in the order the device reports them
    pub wavelengths: Vec<u32>,
    /// Baud rate of the microcontroller (used by the external transport)
    pub baud_rate: u32,
    /// Command written to the device to request one reading
    pub request_token: String,
    /// Reading substituted when the device is unavailable
    pub dummy_sample: Vec<f64>,
    /// Uniform noise range added to each dummy value; [0, 0] keeps it fixed
    pub dummy_jitter: [f64; 2],
    /// Seed for the dummy noise generator
    pub dummy_seed: u64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            wavelengths: vec![940, 1050, 1200, 1300, 1450, 1550, 1650, 1720],
            baud_rate: 9600,
            request_token: "scan\n".to_string(),
            dummy_sample: vec![
                0.2278, 0.2264, 0.2178, 0.2379, 0.2276, 0.2281, 0.2298, 0.2264,
            ],
            dummy_jitter: [0.0015, 0.0080],
            dummy_seed: 0,
        }
    }
}

/// Material labels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialsConfig {
    /// First-class materials that get their own series bucket
    pub allowed: Vec<String>,
    /// Suggestions offered for the material field at startup
    pub default_sample_materials: Vec<String>,
}

impl Default for MaterialsConfig {
    fn default() -> Self {
        let allowed: Vec<String> = ["PET", "HDPE", "PVC", "LDPE", "PP", "PS"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut default_sample_materials = allowed.clone();
        default_sample_materials.push("reference".to_string());
        default_sample_materials.push("unknown".to_string());
        Self {
            allowed,
            default_sample_materials,
        }
    }
}

/// Default axes of the 3-D scatter view, as column names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScatterConfig {
    pub axis_x: String,
    pub axis_y: String,
    pub axis_z: String,
}

impl ScatterConfig {
    /// Parse the three column names against the configured wavelengths
    pub fn selection(&self, wavelengths: &[u32]) -> Result<AxisSelection, String> {
        Ok(AxisSelection::new(
            AxisKind::parse(&self.axis_x, wavelengths)?,
            AxisKind::parse(&self.axis_y, wavelengths)?,
            AxisKind::parse(&self.axis_z, wavelengths)?,
        ))
    }
}

impl Default for ScatterConfig {
    fn default() -> Self {
        Self {
            axis_x: "nm1050_norm".to_string(),
            axis_y: "nm1450_norm".to_string(),
            axis_z: "nm1650_norm".to_string(),
        }
    }
}

/// Classifier model location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Path to a centroid model JSON file
    pub model_path: Option<PathBuf>,
}

impl Default for AppConfig {
    /// Default configuration values (fallback if config file not found)
    fn default() -> Self {
        Self {
            hardware: HardwareConfig::default(),
            materials: MaterialsConfig::default(),
            scatter: ScatterConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// A missing, unreadable or invalid file logs a warning and yields the
    /// defaults, so a broken config never prevents the scanner from starting.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let loaded = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<AppConfig>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    return Self::default();
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                return Self::default();
            }
        };

        match loaded.validate() {
            Ok(()) => {
                log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                loaded
            }
            Err(reason) => {
                log::warn!(
                    "[Config] Rejected configuration from {:?}: {}. Using defaults.",
                    path.as_ref(),
                    reason
                );
                Self::default()
            }
        }
    }

    /// Load from the conventional location next to the working directory
    pub fn load() -> Self {
        Self::load_from_file("psplot.json")
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<(), String> {
        let wavelengths = &self.hardware.wavelengths;
        if wavelengths.is_empty() {
            return Err("hardware.wavelengths must not be empty".to_string());
        }
        let unique: HashSet<u32> = wavelengths.iter().copied().collect();
        if unique.len() != wavelengths.len() {
            return Err("hardware.wavelengths contains duplicates".to_string());
        }
        if self.hardware.dummy_sample.len() != wavelengths.len() {
            return Err(format!(
                "hardware.dummy_sample has {} values for {} wavelengths",
                self.hardware.dummy_sample.len(),
                wavelengths.len()
            ));
        }
        let [low, high] = self.hardware.dummy_jitter;
        if low > high {
            return Err(format!("hardware.dummy_jitter range [{}, {}] is inverted", low, high));
        }
        self.scatter.selection(wavelengths)?;
        Ok(())
    }

    /// Number of values per reading
    pub fn channel_count(&self) -> usize {
        self.hardware.wavelengths.len()
    }
}
