//! Piecewise-linear interpolation over sparse assimilation positions.

use ndarray::{Array2, ArrayView2};

use super::LetkfError;

/// Up to three `(sparse index, barycentric weight)` pairs for one query.
pub type Stencil = [(usize, f64); 3];

/// Scattered-data interpolation of per-position values onto query points.
pub trait SparseInterpolator: Send + Sync {
    /// Barycentric stencils for every query point.
    fn stencils(&self, sparse_points: &[[f64; 2]], query_points: &[[f64; 2]]) -> Result<Vec<Stencil>, LetkfError>;

    /// Interpolates each column of `sparse_values` (one row per sparse point).
    fn interpolate(
        &self,
        sparse_points: &[[f64; 2]],
        sparse_values: ArrayView2<f64>,
        query_points: &[[f64; 2]],
    ) -> Result<Array2<f64>, LetkfError> {
        if sparse_values.nrows() != sparse_points.len() {
            return Err(LetkfError::DimensionMismatch {
                what: "sparse values",
                expected: sparse_points.len(),
                found: sparse_values.nrows(),
            });
        }
        let stencils = self.stencils(sparse_points, query_points)?;
        let mut out = Array2::zeros((query_points.len(), sparse_values.ncols()));
        for (mut row, stencil) in out.rows_mut().into_iter().zip(&stencils) {
            for &(node, weight) in stencil {
                if weight != 0.0 {
                    row.scaled_add(weight, &sparse_values.row(node));
                }
            }
        }
        Ok(out)
    }
}

/// Linear interpolation on a triangulated rectilinear lattice.
///
/// The sparse points must be the full product of a set of rows and a set of
/// columns. Each lattice rectangle is split along its low-low to high-high
/// diagonal into two triangles, and queries take barycentric weights of the
/// triangle containing them. Queries outside the lattice are an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridTriangulation;

struct Lattice {
    rows: Vec<f64>,
    cols: Vec<f64>,
    // node[i * cols.len() + j] is the sparse index of (rows[i], cols[j])
    node: Vec<usize>,
}

impl Lattice {
    fn build(points: &[[f64; 2]]) -> Result<Self, LetkfError> {
        let rows = sorted_unique(points.iter().map(|p| p[0]));
        let cols = sorted_unique(points.iter().map(|p| p[1]));
        if rows.len() < 2 || cols.len() < 2 {
            return Err(LetkfError::IrregularLattice(format!(
                "need at least two distinct rows and columns, got {}x{}",
                rows.len(),
                cols.len()
            )));
        }
        if rows.len() * cols.len() != points.len() {
            return Err(LetkfError::IrregularLattice(format!(
                "{} points for a {}x{} lattice",
                points.len(),
                rows.len(),
                cols.len()
            )));
        }

        let mut node = vec![usize::MAX; points.len()];
        for (index, p) in points.iter().enumerate() {
            let i = locate_exact(&rows, p[0]);
            let j = locate_exact(&cols, p[1]);
            let slot = &mut node[i * cols.len() + j];
            if *slot != usize::MAX {
                return Err(LetkfError::IrregularLattice(format!("duplicate point ({}, {})", p[0], p[1])));
            }
            *slot = index;
        }
        Ok(Self { rows, cols, node })
    }

    fn at(&self, i: usize, j: usize) -> usize {
        self.node[i * self.cols.len() + j]
    }

    fn stencil(&self, query: [f64; 2]) -> Result<Stencil, LetkfError> {
        let outside = || LetkfError::InterpolationDomain {
            row: query[0],
            col: query[1],
        };
        let i = cell_of(&self.rows, query[0]).ok_or_else(outside)?;
        let j = cell_of(&self.cols, query[1]).ok_or_else(outside)?;

        let s = (query[0] - self.rows[i]) / (self.rows[i + 1] - self.rows[i]);
        let t = (query[1] - self.cols[j]) / (self.cols[j + 1] - self.cols[j]);
        let low = self.at(i, j);
        let high = self.at(i + 1, j + 1);
        Ok(if t >= s {
            [(low, 1.0 - t), (self.at(i, j + 1), t - s), (high, s)]
        } else {
            [(low, 1.0 - s), (self.at(i + 1, j), s - t), (high, t)]
        })
    }
}

impl SparseInterpolator for GridTriangulation {
    fn stencils(&self, sparse_points: &[[f64; 2]], query_points: &[[f64; 2]]) -> Result<Vec<Stencil>, LetkfError> {
        let lattice = Lattice::build(sparse_points)?;
        query_points.iter().map(|&q| lattice.stencil(q)).collect()
    }
}

fn sorted_unique(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.collect();
    out.sort_by(|a, b| a.total_cmp(b));
    out.dedup();
    out
}

fn locate_exact(axis: &[f64], value: f64) -> usize {
    axis.partition_point(|&a| a < value)
}

/// Index `i` with `axis[i] <= value <= axis[i + 1]`, or `None` outside.
fn cell_of(axis: &[f64], value: f64) -> Option<usize> {
    let n = axis.len();
    if !(value >= axis[0] && value <= axis[n - 1]) {
        return None;
    }
    let upper = axis.partition_point(|&a| a <= value);
    Some(upper.saturating_sub(1).min(n - 2))
}
