use serde::{Deserialize, Serialize};

/// Spatial localization for full-field assimilation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalizationConfig {
    /// Stride between sparse assimilation rows/columns (cells).
    pub spacing: usize,
    /// Chebyshev half-width of each local window (cells).
    pub radius: usize,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self { spacing: 5, radius: 30 }
    }
}

/// Assimilation settings shared by sensor and satellite updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetkfConfig {
    /// Multiplicative covariance inflation (1 = none).
    pub inflation: f64,
    /// Observation error standard deviation of satellite pixels.
    pub sat_sigma: f64,
    /// Observation error standard deviation of ground sensors.
    pub sensor_sigma: f64,
    /// `None` runs full-field assimilation without localization.
    pub localization: Option<LocalizationConfig>,
}

impl Default for LetkfConfig {
    fn default() -> Self {
        Self {
            inflation: 1.0,
            sat_sigma: 0.05,
            sensor_sigma: 0.05,
            localization: Some(LocalizationConfig::default()),
        }
    }
}
