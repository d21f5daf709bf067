//! Grid and state value types.
//!
//! Regular 2D grids, scalar fields over them, face-staggered wind fields and
//! the lat/lon axes that tie a grid to the ground.

mod axes;
mod layout;
mod wind;

pub use axes::LatLonAxes;
pub use layout::{field_range, Grid, GridError, ScalarField, MIN_GRID_EXTENT};
pub use wind::WindField;
