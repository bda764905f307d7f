//! Run configuration.
//!
//! Every struct uses `#[serde(default)]` so partial JSON files override only
//! the keys they name.

use std::path::Path;

use anyhow::Result;
use camreg_core::{LensOptions, Real};
use camreg_linear::PnpOptions;
use serde::{Deserialize, Serialize};

use crate::quality::QualityThresholds;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistrationConfig {
    /// Maximum accepted angular RMS per direction, radians.
    pub rms_threshold_rad: Real,
    /// Value of every pose component used to seed PnP.
    pub initial_guess: Real,
    /// Fewest detected corners for a pose to be attempted.
    pub min_corners: usize,
    pub pnp: PnpOptions,
    pub lens: LensOptions,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            rms_threshold_rad: 0.001,
            initial_guess: 0.01,
            min_corners: 4,
            pnp: PnpOptions::default(),
            lens: LensOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Overall RMS (pixels) strictly below which a calibration is accepted.
    pub rms_threshold: Real,
    pub min_detections: usize,
    pub min_images: usize,
    pub min_quality_images: usize,
    /// Per-view RMS (pixels) at or below which a view counts as good.
    pub per_view_threshold: Real,
    pub min_corners: usize,
    /// Suffix of the written calibration file, `calib{postfix}.json`.
    pub postfix: String,
    /// Image file extensions scanned in the input directory.
    pub extensions: Vec<String>,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            rms_threshold: 1.0,
            min_detections: 30,
            min_images: 30,
            min_quality_images: 30,
            per_view_threshold: 1.0,
            min_corners: 4,
            postfix: String::new(),
            extensions: vec!["png".to_string(), "jpg".to_string()],
        }
    }
}

impl CalibrationConfig {
    pub fn quality_thresholds(&self) -> QualityThresholds {
        QualityThresholds {
            per_view_threshold: self.per_view_threshold,
            min_good_images: self.min_quality_images,
            overall_rms_threshold: self.rms_threshold,
        }
    }
}

/// Parse a JSON configuration file.
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    crate::io::load_json_file(path)
}
