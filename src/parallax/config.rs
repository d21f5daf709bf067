//! Parallax configuration.

use serde::{Deserialize, Serialize};

/// Azimuth/elevation pair in degrees.
///
/// Azimuth is a bearing, measured clockwise from north. Elevation is measured up
/// from the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewAngles {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

impl ViewAngles {
    pub fn new(azimuth_deg: f64, elevation_deg: f64) -> Self {
        Self { azimuth_deg, elevation_deg }
    }
}

/// Cloud height and satellite geometry used for parallax correction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallaxConfig {
    /// Assumed cloud height (m). Zero disables the correction.
    pub cloud_height_m: f64,
    /// Look angles from the ground site toward the satellite.
    pub satellite: ViewAngles,
    /// Latitude for the meters-to-degrees conversion; grid centre when unset.
    #[serde(default)]
    pub site_latitude_deg: Option<f64>,
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        // Geostationary satellite west of an Arizona site, 10 km cloud tops.
        Self {
            cloud_height_m: 10_000.0,
            satellite: ViewAngles::new(220.5, 44.1),
            site_latitude_deg: None,
        }
    }
}

impl ParallaxConfig {
    /// No correction.
    pub fn disabled() -> Self {
        Self {
            cloud_height_m: 0.0,
            ..Default::default()
        }
    }
}
