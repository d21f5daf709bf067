//! Parallax displacement and its conversion to grid cells.

use glam::DVec2;
use thiserror::Error;

use super::config::{ParallaxConfig, ViewAngles};
use crate::grid::LatLonAxes;

/// Mean Earth radius for the spherical approximation (m).
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParallaxError {
    #[error("Parallax shift is not finite for satellite {satellite:?} and sun {sun:?}")]
    DegenerateGeometry { satellite: ViewAngles, sun: ViewAngles },
    #[error("Grid step must be non-zero: lat_step={lat_step}, lon_step={lon_step}")]
    ZeroGridStep { lat_step: f64, lon_step: f64 },
}

/// Ground displacement `(east, north)` in the units of `cloud_height`.
///
/// This is the offset to add to a satellite pixel position to find where the
/// cloud's shadow falls: the solar displacement vector minus the satellite one,
/// each of length `height * cot(elevation)`, pointing along `-pi/2 - azimuth`.
pub fn parallax_shift(cloud_height: f64, satellite: ViewAngles, sun: ViewAngles) -> DVec2 {
    if cloud_height == 0.0 {
        return DVec2::ZERO;
    }
    displacement(cloud_height, sun) - displacement(cloud_height, satellite)
}

fn displacement(cloud_height: f64, angles: ViewAngles) -> DVec2 {
    let elevation = angles.elevation_deg.to_radians();
    let length = cloud_height * elevation.cos() / elevation.sin();
    let angle = -std::f64::consts::FRAC_PI_2 - angles.azimuth_deg.to_radians();
    DVec2::new(angle.cos(), angle.sin()) * length
}

/// Converts an `(east, north)` displacement in meters to `(d_lat, d_lon)` degrees.
pub fn meters_to_degrees(east_m: f64, north_m: f64, latitude_deg: f64) -> (f64, f64) {
    let circumference = 2.0 * std::f64::consts::PI * EARTH_RADIUS_M;
    let d_lon = east_m * 360.0 / (circumference * latitude_deg.to_radians().cos());
    let d_lat = north_m * 360.0 / circumference;
    (d_lat, d_lon)
}

/// Whole-cell parallax shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellShift {
    /// Columns to move (positive toward increasing column index).
    pub west_east: i64,
    /// Rows to move (positive toward increasing row index).
    pub south_north: i64,
}

impl CellShift {
    /// Row-major flat-index offset on a grid with `cols` columns.
    pub fn flat_offset(&self, cols: usize) -> i64 {
        self.west_east + self.south_north * cols as i64
    }
}

/// Turns sun angles into grid-cell shifts for a fixed grid and satellite.
#[derive(Debug, Clone)]
pub struct ParallaxCorrector {
    config: ParallaxConfig,
    latitude_deg: f64,
    lat_step: f64,
    lon_step: f64,
    cols: usize,
}

impl ParallaxCorrector {
    /// Builds a corrector for a grid described by `axes`, converting at the
    /// configured site latitude or the grid's mean latitude.
    pub fn new(config: ParallaxConfig, axes: &LatLonAxes) -> Result<Self, ParallaxError> {
        let latitude = config.site_latitude_deg.unwrap_or_else(|| axes.center_latitude());
        Self::with_site_latitude(config, axes, latitude)
    }

    /// Builds a corrector converting meters to degrees at `latitude_deg`.
    pub fn with_site_latitude(
        config: ParallaxConfig,
        axes: &LatLonAxes,
        latitude_deg: f64,
    ) -> Result<Self, ParallaxError> {
        let lat_step = axes.lat_step();
        let lon_step = axes.lon_step();
        if lat_step == 0.0 || lon_step == 0.0 {
            return Err(ParallaxError::ZeroGridStep { lat_step, lon_step });
        }
        Ok(Self {
            config,
            latitude_deg,
            lat_step,
            lon_step,
            cols: axes.lons().len(),
        })
    }

    pub fn config(&self) -> &ParallaxConfig {
        &self.config
    }

    /// Correction in degrees `(d_lat, d_lon)` for the given sun angles.
    pub fn degree_shift(&self, sun: ViewAngles) -> Result<(f64, f64), ParallaxError> {
        let shift = parallax_shift(self.config.cloud_height_m, self.config.satellite, sun);
        if !shift.is_finite() {
            return Err(ParallaxError::DegenerateGeometry {
                satellite: self.config.satellite,
                sun,
            });
        }
        Ok(meters_to_degrees(shift.x, shift.y, self.latitude_deg))
    }

    /// Correction in whole grid cells, rounding half to even.
    pub fn cell_shift(&self, sun: ViewAngles) -> Result<CellShift, ParallaxError> {
        let (d_lat, d_lon) = self.degree_shift(sun)?;
        Ok(CellShift {
            west_east: (d_lon / self.lon_step).round_ties_even() as i64,
            south_north: (d_lat / self.lat_step).round_ties_even() as i64,
        })
    }

    /// Correction as a row-major flat-index offset.
    pub fn flat_offset(&self, sun: ViewAngles) -> Result<i64, ParallaxError> {
        Ok(self.cell_shift(sun)?.flat_offset(self.cols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn axes() -> LatLonAxes {
        let grid = Grid::new(40, 50, 250.0, 250.0).unwrap();
        LatLonAxes::regular(&grid, 32.0, -111.2, 0.0025, 0.0025)
    }

    #[test]
    fn test_zero_height_gives_zero_shift_for_any_angles() {
        for &(az, el) in &[(0.0, 90.0), (220.5, 44.1), (90.0, 0.0), (180.0, 5.0), (300.0, -10.0)] {
            let shift = parallax_shift(0.0, ViewAngles::new(220.5, 44.1), ViewAngles::new(az, el));
            assert_eq!(shift, DVec2::ZERO);
        }

        let corrector = ParallaxCorrector::new(ParallaxConfig::disabled(), &axes()).unwrap();
        let cells = corrector.cell_shift(ViewAngles::new(135.0, 0.0)).unwrap();
        assert_eq!(cells, CellShift::default());
        assert_eq!(corrector.flat_offset(ViewAngles::new(10.0, 60.0)).unwrap(), 0);
    }

    #[test]
    fn test_satellite_and_sun_aligned_cancel() {
        let angles = ViewAngles::new(200.0, 35.0);
        let shift = parallax_shift(8_000.0, angles, angles);
        assert!(shift.length() < 1e-9);
    }

    #[test]
    fn test_sun_due_south_pushes_shadow_north() {
        // Sun at azimuth 180: displacement angle is -pi/2 - pi, i.e. pointing north.
        // Satellite overhead contributes nothing.
        let shift = parallax_shift(
            1_000.0,
            ViewAngles::new(0.0, 90.0),
            ViewAngles::new(180.0, 45.0),
        );
        assert!(shift.x.abs() < 1e-9);
        assert!((shift.y - 1_000.0).abs() < 1e-9, "shift = {:?}", shift);
    }

    #[test]
    fn test_meters_to_degrees() {
        let (d_lat, d_lon) = meters_to_degrees(0.0, 111_194.93, 0.0);
        assert!((d_lat - 1.0).abs() < 1e-4);
        assert_eq!(d_lon, 0.0);

        // Longitude degrees shrink with cos(latitude).
        let (_, d_lon_60) = meters_to_degrees(111_194.93, 0.0, 60.0);
        assert!((d_lon_60 - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_cell_shift_and_flat_offset() {
        let a = axes();
        let corrector = ParallaxCorrector::with_site_latitude(
            ParallaxConfig {
                cloud_height_m: 1_000.0,
                satellite: ViewAngles::new(0.0, 90.0),
                site_latitude_deg: None,
            },
            &a,
            0.0,
        )
        .unwrap();
        // 1 km north ~= 0.008993 deg ~= 3.6 cells of 0.0025 deg -> 4 rows.
        let cells = corrector.cell_shift(ViewAngles::new(180.0, 45.0)).unwrap();
        assert_eq!(cells.west_east, 0);
        assert_eq!(cells.south_north, 4);
        assert_eq!(corrector.flat_offset(ViewAngles::new(180.0, 45.0)).unwrap(), 4 * 50);
    }

    #[test]
    fn test_horizon_sun_is_degenerate() {
        let corrector = ParallaxCorrector::new(ParallaxConfig::default(), &axes()).unwrap();
        let err = corrector.cell_shift(ViewAngles::new(90.0, 0.0));
        assert!(matches!(err, Err(ParallaxError::DegenerateGeometry { .. })));
    }
}
