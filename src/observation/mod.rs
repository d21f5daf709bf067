//! Mapping of point sensors onto grid cells.

mod mapper;

pub use mapper::{nearest_index, sensor_error, shift_indices, ObservationError, ObservationMapper, SensorLocation};
