//! Run configuration.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PipelineError;
use crate::ensemble::EnsembleConfig;
use crate::letkf::LetkfConfig;
use crate::mask::MaskConfig;
use crate::parallax::ParallaxConfig;

/// Everything the driver needs besides its data sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NowcastConfig {
    /// First instant of the run (inclusive).
    pub start: DateTime<Utc>,
    /// Last instant of the run (inclusive).
    pub end: DateTime<Utc>,
    /// Spacing of satellite assimilation cycles (s).
    pub coarse_interval_s: i64,
    /// Spacing of advection/sensor cycles (s). Must divide the coarse interval.
    pub fine_interval_s: i64,
    /// Cell width (m).
    pub dx: f64,
    /// Cell height (m).
    pub dy: f64,
    /// Courant number ceiling for sub-stepping.
    pub c_max: f64,
    /// Seed for ensemble perturbations.
    pub seed: u64,
    pub ensemble: EnsembleConfig,
    pub letkf: LetkfConfig,
    pub mask: MaskConfig,
    pub parallax: ParallaxConfig,
}

impl Default for NowcastConfig {
    fn default() -> Self {
        // 2014-04-15 19:30 UTC, one hour.
        let start = DateTime::from_timestamp(1_397_590_200, 0).unwrap_or_default();
        Self {
            start,
            end: start + chrono::Duration::hours(1),
            coarse_interval_s: 15 * 60,
            fine_interval_s: 5 * 60,
            dx: 250.0,
            dy: 250.0,
            c_max: 1.2,
            seed: 0,
            ensemble: EnsembleConfig::default(),
            letkf: LetkfConfig::default(),
            mask: MaskConfig::default(),
            parallax: ParallaxConfig::default(),
        }
    }
}

impl NowcastConfig {
    /// Reads a JSON config; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the invariants the driver relies on.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));
        if self.end < self.start {
            return invalid(format!("end {} precedes start {}", self.end, self.start));
        }
        if self.fine_interval_s <= 0 || self.coarse_interval_s <= 0 {
            return invalid("intervals must be positive".to_string());
        }
        if self.coarse_interval_s % self.fine_interval_s != 0 {
            return invalid(format!(
                "fine interval {}s does not divide coarse interval {}s",
                self.fine_interval_s, self.coarse_interval_s
            ));
        }
        if !(self.c_max > 0.0) {
            return invalid(format!("c_max must be positive, got {}", self.c_max));
        }
        if !(self.letkf.inflation > 0.0) {
            return invalid(format!("inflation must be positive, got {}", self.letkf.inflation));
        }
        if !(self.letkf.sat_sigma > 0.0 && self.letkf.sensor_sigma > 0.0) {
            return invalid("observation sigmas must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_is_valid() {
        let config = NowcastConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.end - config.start, chrono::Duration::hours(1));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "c_max": 0.8, "seed": 9, "letkf": {{ "inflation": 1.05, "sat_sigma": 0.01, "sensor_sigma": 0.1, "localization": null }} }}"#).unwrap();
        let config = NowcastConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.c_max, 0.8);
        assert_eq!(config.seed, 9);
        assert!(config.letkf.localization.is_none());
        assert_eq!(config.fine_interval_s, 300);
        assert_eq!(config.ensemble.ens_size, 40);
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = NowcastConfig::default();
        let text = config.to_json().unwrap();
        let back: NowcastConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.start, config.start);
        assert_eq!(back.mask.border, config.mask.border);
    }

    #[test]
    fn test_rejects_uneven_intervals() {
        let config = NowcastConfig {
            fine_interval_s: 400,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));
    }
}
