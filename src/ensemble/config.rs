use serde::{Deserialize, Serialize};

/// Parameters for drawing the initial ensemble.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Number of members.
    pub ens_size: usize,
    /// Standard deviation of the wind bias per wind row (m/s). Length 0..=2,
    /// `[ΔU]` or `[ΔU, ΔV]`.
    pub wind_sigmas: Vec<f64>,
    /// Standard deviation of the clear-sky pull applied to each member's field.
    pub ci_sigma: f64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            ens_size: 40,
            wind_sigmas: vec![0.4, 0.05],
            ci_sigma: 0.1,
        }
    }
}
