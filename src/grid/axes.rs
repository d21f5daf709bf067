//! Geographic axes of a regular lat/lon grid.

use serde::{Deserialize, Serialize};

use super::layout::{Grid, GridError};

/// Latitude per row and longitude per column, in degrees.
///
/// Axes must be strictly monotone (either direction) with at least two entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AxesRepr")]
pub struct LatLonAxes {
    lats: Vec<f64>,
    lons: Vec<f64>,
}

#[derive(Deserialize)]
struct AxesRepr {
    lats: Vec<f64>,
    lons: Vec<f64>,
}

impl TryFrom<AxesRepr> for LatLonAxes {
    type Error = GridError;

    fn try_from(repr: AxesRepr) -> Result<Self, Self::Error> {
        Self::new(repr.lats, repr.lons)
    }
}

impl LatLonAxes {
    /// Creates axes, checking monotonicity.
    pub fn new(lats: Vec<f64>, lons: Vec<f64>) -> Result<Self, GridError> {
        for (what, axis) in [("latitude axis", &lats), ("longitude axis", &lons)] {
            if axis.len() < 2 || !is_strictly_monotone(axis) {
                return Err(GridError::DimensionMismatch {
                    what,
                    expected: (axis.len().max(2), 1),
                    found: (axis.len(), 0),
                });
            }
        }
        Ok(Self { lats, lons })
    }

    /// Evenly spaced axes starting at `(lat0, lon0)`.
    pub fn regular(grid: &Grid, lat0: f64, lon0: f64, lat_step: f64, lon_step: f64) -> Self {
        Self {
            lats: (0..grid.rows).map(|r| lat0 + r as f64 * lat_step).collect(),
            lons: (0..grid.cols).map(|c| lon0 + c as f64 * lon_step).collect(),
        }
    }

    /// Latitude of each row (degrees).
    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    /// Longitude of each column (degrees).
    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    /// Fails unless the axes match the grid shape.
    pub fn check_grid(&self, grid: &Grid) -> Result<(), GridError> {
        let found = (self.lats.len(), self.lons.len());
        if found != grid.shape() {
            return Err(GridError::DimensionMismatch {
                what: "lat/lon axes",
                expected: grid.shape(),
                found,
            });
        }
        Ok(())
    }

    /// Signed latitude increment between the first two rows.
    pub fn lat_step(&self) -> f64 {
        self.lats[1] - self.lats[0]
    }

    /// Signed longitude increment between the first two columns.
    pub fn lon_step(&self) -> f64 {
        self.lons[1] - self.lons[0]
    }

    /// Mean latitude of the grid (degrees).
    pub fn center_latitude(&self) -> f64 {
        self.lats.iter().sum::<f64>() / self.lats.len() as f64
    }
}

fn is_strictly_monotone(axis: &[f64]) -> bool {
    let ascending = axis.windows(2).all(|w| w[1] > w[0]);
    let descending = axis.windows(2).all(|w| w[1] < w[0]);
    ascending || descending
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_axes() {
        let grid = Grid::new(5, 6, 250.0, 250.0).unwrap();
        let axes = LatLonAxes::regular(&grid, 32.0, -111.0, 0.01, 0.02);
        assert_eq!(axes.lats().len(), 5);
        assert_eq!(axes.lons().len(), 6);
        assert!((axes.lat_step() - 0.01).abs() < 1e-12);
        assert!((axes.lon_step() - 0.02).abs() < 1e-12);
        assert!(axes.check_grid(&grid).is_ok());
        assert!((axes.center_latitude() - 32.02).abs() < 1e-9);
    }

    #[test]
    fn test_non_monotone_axis_is_rejected() {
        assert!(LatLonAxes::new(vec![1.0, 2.0, 1.5], vec![0.0, 1.0]).is_err());
        assert!(LatLonAxes::new(vec![3.0, 2.0, 1.0], vec![0.0, 1.0]).is_ok());
        assert!(LatLonAxes::new(vec![1.0], vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_deserialize_checks_axes() {
        let ok: LatLonAxes = serde_json::from_str(r#"{"lats": [1.0, 2.0], "lons": [5.0, 4.0]}"#).unwrap();
        assert_eq!(ok.lats(), &[1.0, 2.0]);
        assert!((ok.lon_step() + 1.0).abs() < 1e-12);

        let short = serde_json::from_str::<LatLonAxes>(r#"{"lats": [1.0], "lons": [0.0, 1.0]}"#);
        assert!(short.is_err());
    }
}
