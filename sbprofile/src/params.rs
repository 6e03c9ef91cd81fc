//! Numerical thresholds consulted by profiles and the renderer.
//!
//! Defaults reproduce the standard accuracy settings; a JSON document can
//! override any subset of fields.

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// Accuracy and resource settings.
///
/// The shape-parameter caches are process-wide and sized by
/// [`MAX_CACHED_TABLES`](crate::cache::MAX_CACHED_TABLES), not by these settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GsParams {
    /// Fraction of flux allowed to alias when choosing stepK
    pub alias_threshold: f64,

    /// Fourier amplitude (relative to flux) treated as negligible for maxK
    pub maxk_threshold: f64,

    /// Smallest FFT the renderer will use
    pub minimum_fft_size: usize,

    /// Largest FFT the renderer will use
    pub maximum_fft_size: usize,

    /// Spacing in ln(k) between Fourier table samples
    pub table_spacing: f64,
}

impl Default for GsParams {
    fn default() -> Self {
        Self {
            alias_threshold: 0.005,
            maxk_threshold: 0.001,
            minimum_fft_size: 128,
            maximum_fft_size: 4096,
            table_spacing: 0.05,
        }
    }
}

impl GsParams {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ProfileError> {
        let params: GsParams =
            serde_json::from_str(json).map_err(|e| ProfileError::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Load settings from a JSON file.
    pub fn from_json_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ProfileError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ProfileError::Config(format!("failed to read {}: {e}", path.as_ref().display()))
        })?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String, ProfileError> {
        serde_json::to_string_pretty(self).map_err(|e| ProfileError::Config(e.to_string()))
    }

    /// Check that every threshold is usable.
    pub fn validate(&self) -> Result<(), ProfileError> {
        for (name, value) in [
            ("alias_threshold", self.alias_threshold),
            ("maxk_threshold", self.maxk_threshold),
            ("table_spacing", self.table_spacing),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ProfileError::Config(format!(
                    "{name} must lie in (0, 1), got {value}"
                )));
            }
        }
        if self.minimum_fft_size < 2 || self.minimum_fft_size > self.maximum_fft_size {
            return Err(ProfileError::Config(format!(
                "FFT bounds [{}, {}] are inconsistent",
                self.minimum_fft_size, self.maximum_fft_size
            )));
        }
        Ok(())
    }
}
