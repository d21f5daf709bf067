//! Grid shape, spacing and flat-index bookkeeping.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A scalar value per grid cell, `rows × cols`, row-major.
pub type ScalarField = Array2<f64>;

/// Smallest extent along either axis; the advection stencil needs a two-cell
/// margin on each side of at least one interior cell.
pub const MIN_GRID_EXTENT: usize = 5;

/// Errors raised by grid construction and shape checks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Grid too small: {rows}x{cols} (need at least 5x5)")]
    TooSmall { rows: usize, cols: usize },
    #[error("Grid spacing must be positive and finite: dx={dx}, dy={dy}")]
    InvalidSpacing { dx: f64, dy: f64 },
    #[error("Courant ceiling must be positive and finite: {0}")]
    InvalidCourant(f64),
    #[error("Dimension mismatch for {what}: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        what: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
}

/// Regular 2D grid: shape plus cell spacing in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Number of rows (south-north).
    pub rows: usize,
    /// Number of columns (west-east).
    pub cols: usize,
    /// Cell width along columns (m).
    pub dx: f64,
    /// Cell height along rows (m).
    pub dy: f64,
}

impl Grid {
    /// Creates a grid, validating extent and spacing.
    pub fn new(rows: usize, cols: usize, dx: f64, dy: f64) -> Result<Self, GridError> {
        if rows < MIN_GRID_EXTENT || cols < MIN_GRID_EXTENT {
            return Err(GridError::TooSmall { rows, cols });
        }
        if !(dx.is_finite() && dy.is_finite() && dx > 0.0 && dy > 0.0) {
            return Err(GridError::InvalidSpacing { dx, dy });
        }
        Ok(Self { rows, cols, dx, dy })
    }

    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of cells.
    pub fn size(&self) -> usize {
        self.rows * self.cols
    }

    /// Row-major flat index of `(row, col)`.
    pub fn flat_index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.rows && col < self.cols);
        row * self.cols + col
    }

    /// Inverse of [`Grid::flat_index`].
    pub fn unravel(&self, flat: usize) -> (usize, usize) {
        (flat / self.cols, flat % self.cols)
    }

    /// A zero-valued field on this grid.
    pub fn zeros(&self) -> ScalarField {
        Array2::zeros(self.shape())
    }

    /// A constant field on this grid.
    pub fn filled(&self, value: f64) -> ScalarField {
        Array2::from_elem(self.shape(), value)
    }

    /// Fails unless `field` has this grid's shape.
    pub fn check_field(&self, what: &'static str, field: &ScalarField) -> Result<(), GridError> {
        let found = field.dim();
        if found != self.shape() {
            return Err(GridError::DimensionMismatch {
                what,
                expected: self.shape(),
                found,
            });
        }
        Ok(())
    }

    /// Iterator over all `(row, col)` positions in flat-index order.
    pub fn positions(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols;
        (0..self.rows).flat_map(move |r| (0..cols).map(move |c| (r, c)))
    }
}

/// Returns `(min, max)` over a field. Empty or all-NaN fields give infinities.
pub fn field_range(field: &ScalarField) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in field.iter() {
        min = min.min(v);
        max = max.max(v);
    }
    (min, max)
}
