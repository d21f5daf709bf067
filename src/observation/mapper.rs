use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grid::{LatLonAxes, ScalarField};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObservationError {
    #[error("Axis must have at least one entry")]
    EmptyAxis,
    #[error("Sensor {index} shifted by {offset} leaves the domain of {size} cells")]
    OutsideDomain { index: usize, offset: i64, size: usize },
    #[error("Observation count mismatch: {sensors} sensors, {observations} observations")]
    CountMismatch { sensors: usize, observations: usize },
    #[error("Curvilinear coordinates must share one shape: lats {lats:?}, lons {lons:?}")]
    CoordinateShape { lats: (usize, usize), lons: (usize, usize) },
}

/// A ground sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorLocation {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
}

impl SensorLocation {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self { id: id.into(), lat, lon }
    }
}

/// Index of the entry of a monotone `axis` closest to `value`.
///
/// Works for ascending and descending axes. On an exact tie between two
/// neighbours the lower index wins. Values beyond either end clamp to it.
pub fn nearest_index(axis: &[f64], value: f64) -> Result<usize, ObservationError> {
    if axis.is_empty() {
        return Err(ObservationError::EmptyAxis);
    }
    let n = axis.len();
    let descending = n > 1 && axis[n - 1] < axis[0];

    // First position whose entry is not before `value` in the axis direction.
    let upper = if descending {
        axis.partition_point(|&a| a > value)
    } else {
        axis.partition_point(|&a| a < value)
    };

    if upper == 0 {
        return Ok(0);
    }
    if upper == n {
        return Ok(n - 1);
    }
    let lower = upper - 1;
    let d_lower = (value - axis[lower]).abs();
    let d_upper = (axis[upper] - value).abs();
    Ok(if d_upper < d_lower { upper } else { lower })
}

/// Adds `offset` to every index, failing if any result leaves `[0, size)`.
pub fn shift_indices(indices: &[usize], offset: i64, size: usize) -> Result<Vec<usize>, ObservationError> {
    indices
        .iter()
        .map(|&index| {
            let shifted = index as i64 + offset;
            if shifted < 0 || shifted >= size as i64 {
                Err(ObservationError::OutsideDomain { index, offset, size })
            } else {
                Ok(shifted as usize)
            }
        })
        .collect()
}

/// Field value at each sensor cell minus the sensor reading.
pub fn sensor_error(
    field: &ScalarField,
    indices: &[usize],
    observations: &[f64],
) -> Result<Vec<f64>, ObservationError> {
    if indices.len() != observations.len() {
        return Err(ObservationError::CountMismatch {
            sensors: indices.len(),
            observations: observations.len(),
        });
    }
    let size = field.len();
    let cols = field.ncols();
    indices
        .iter()
        .zip(observations)
        .map(|(&index, &obs)| {
            if index >= size {
                return Err(ObservationError::OutsideDomain { index, offset: 0, size });
            }
            Ok(field[[index / cols, index % cols]] - obs)
        })
        .collect()
}

/// Sensor locations resolved to row-major flat indices on a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationMapper {
    indices: Vec<usize>,
    rows: usize,
    cols: usize,
}

impl ObservationMapper {
    /// Nearest cell on a regular lat/lon grid, axis by axis.
    pub fn from_axes(axes: &LatLonAxes, sensors: &[SensorLocation]) -> Result<Self, ObservationError> {
        let cols = axes.lons().len();
        let indices = sensors
            .iter()
            .map(|s| {
                let row = nearest_index(axes.lats(), s.lat)?;
                let col = nearest_index(axes.lons(), s.lon)?;
                Ok(row * cols + col)
            })
            .collect::<Result<Vec<_>, ObservationError>>()?;
        Ok(Self {
            indices,
            rows: axes.lats().len(),
            cols,
        })
    }

    /// Nearest cell by planar distance on 2D latitude/longitude arrays.
    ///
    /// Ties resolve to the lowest flat index.
    pub fn from_curvilinear(
        lats: &Array2<f64>,
        lons: &Array2<f64>,
        sensors: &[SensorLocation],
    ) -> Result<Self, ObservationError> {
        if lats.dim() != lons.dim() {
            return Err(ObservationError::CoordinateShape {
                lats: lats.dim(),
                lons: lons.dim(),
            });
        }
        if lats.is_empty() {
            return Err(ObservationError::EmptyAxis);
        }
        let (rows, cols) = lats.dim();
        let indices = sensors
            .iter()
            .map(|s| {
                let mut best = 0;
                let mut best_d2 = f64::INFINITY;
                for (flat, (lat, lon)) in lats.iter().zip(lons.iter()).enumerate() {
                    let d2 = (lat - s.lat).powi(2) + (lon - s.lon).powi(2);
                    if d2 < best_d2 {
                        best_d2 = d2;
                        best = flat;
                    }
                }
                best
            })
            .collect();
        Ok(Self { indices, rows, cols })
    }

    /// Unshifted flat index per sensor, in sensor order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Flat indices moved by a parallax offset.
    pub fn shifted(&self, offset: i64) -> Result<Vec<usize>, ObservationError> {
        shift_indices(&self.indices, offset, self.rows * self.cols)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn test_nearest_index_ascending() {
        let axis = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(&axis, -5.0).unwrap(), 0);
        assert_eq!(nearest_index(&axis, 0.4).unwrap(), 0);
        assert_eq!(nearest_index(&axis, 0.6).unwrap(), 1);
        assert_eq!(nearest_index(&axis, 2.0).unwrap(), 2);
        assert_eq!(nearest_index(&axis, 9.0).unwrap(), 3);
    }

    #[test]
    fn test_nearest_index_tie_prefers_lower() {
        assert_eq!(nearest_index(&[0.0, 1.0, 2.0], 1.5).unwrap(), 1);
        assert_eq!(nearest_index(&[2.0, 1.0, 0.0], 1.5).unwrap(), 0);
    }

    #[test]
    fn test_nearest_index_descending() {
        let axis = [35.0, 34.0, 33.0, 32.0];
        assert_eq!(nearest_index(&axis, 40.0).unwrap(), 0);
        assert_eq!(nearest_index(&axis, 33.2).unwrap(), 2);
        assert_eq!(nearest_index(&axis, 32.6).unwrap(), 2);
        assert_eq!(nearest_index(&axis, 32.4).unwrap(), 3);
        assert_eq!(nearest_index(&axis, 0.0).unwrap(), 3);
    }

    #[test]
    fn test_nearest_index_empty_axis() {
        assert_eq!(nearest_index(&[], 1.0), Err(ObservationError::EmptyAxis));
    }

    #[test]
    fn test_mapper_flat_indices() {
        let grid = Grid::new(5, 6, 250.0, 250.0).unwrap();
        let axes = LatLonAxes::regular(&grid, 32.0, -111.0, 0.01, 0.01);
        let sensors = vec![
            SensorLocation::new("a", 32.0, -111.0),
            SensorLocation::new("b", 32.021, -110.969),
            SensorLocation::new("c", 40.0, -100.0),
        ];
        let mapper = ObservationMapper::from_axes(&axes, &sensors).unwrap();
        assert_eq!(mapper.indices(), &[0, 2 * 6 + 3, 4 * 6 + 5]);
        assert_eq!(mapper.len(), 3);
    }

    #[test]
    fn test_shifted_indices_must_stay_inside() {
        let grid = Grid::new(5, 5, 250.0, 250.0).unwrap();
        let axes = LatLonAxes::regular(&grid, 0.0, 0.0, 1.0, 1.0);
        let mapper = ObservationMapper::from_axes(&axes, &[SensorLocation::new("s", 2.0, 2.0)]).unwrap();
        assert_eq!(mapper.shifted(0).unwrap(), vec![12]);
        assert_eq!(mapper.shifted(-6).unwrap(), vec![6]);
        assert!(matches!(mapper.shifted(13), Err(ObservationError::OutsideDomain { .. })));
        assert!(matches!(mapper.shifted(-13), Err(ObservationError::OutsideDomain { .. })));
    }

    #[test]
    fn test_curvilinear_matches_regular_axes() {
        let grid = Grid::new(6, 7, 250.0, 250.0).unwrap();
        let axes = LatLonAxes::regular(&grid, 10.0, 20.0, 0.5, 0.25);
        let lats = Array2::from_shape_fn(grid.shape(), |(r, _)| axes.lats()[r]);
        let lons = Array2::from_shape_fn(grid.shape(), |(_, c)| axes.lons()[c]);
        let sensors = vec![
            SensorLocation::new("a", 11.1, 20.6),
            SensorLocation::new("b", 12.4, 21.4),
        ];
        let regular = ObservationMapper::from_axes(&axes, &sensors).unwrap();
        let curvilinear = ObservationMapper::from_curvilinear(&lats, &lons, &sensors).unwrap();
        assert_eq!(regular.indices(), curvilinear.indices());
    }

    #[test]
    fn test_sensor_error() {
        let field = Array2::from_shape_fn((5, 5), |(r, c)| (r * 5 + c) as f64);
        let err = sensor_error(&field, &[0, 7, 24], &[0.5, 7.0, 20.0]).unwrap();
        assert_eq!(err, vec![-0.5, 0.0, 4.0]);
        assert!(matches!(
            sensor_error(&field, &[0], &[1.0, 2.0]),
            Err(ObservationError::CountMismatch { .. })
        ));
    }
}
