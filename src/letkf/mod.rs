//! Local Ensemble Transform Kalman Filter.
//!
//! Two entry points share one ensemble-space transform:
//! - [`assimilate_global`] updates the whole state vector from observations of
//!   selected rows.
//! - [`assimilate_local`] observes every field cell directly, computes
//!   transforms at sparse positions from a Chebyshev window around each, and
//!   interpolates them to every cell.

mod config;
mod geometry;
mod global;
mod interpolate;
mod local;
mod transform;

pub use config::{LetkfConfig, LocalizationConfig};
pub use geometry::LocalizationGeometry;
pub use global::assimilate_global;
pub use interpolate::{GridTriangulation, SparseInterpolator, Stencil};
pub use local::assimilate_local;
pub use transform::{transform_weights, RInverse};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LetkfError {
    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Ensemble-space matrix is not positive definite (eigenvalue {eigenvalue})")]
    NonPositiveDefinite { eigenvalue: f64 },
    #[error("Query point ({row}, {col}) lies outside the sparse assimilation hull")]
    InterpolationDomain { row: f64, col: f64 },
    #[error("Sparse points do not form a rectilinear lattice: {0}")]
    IrregularLattice(String),
}
