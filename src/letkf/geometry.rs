//! Sparse assimilation positions and their localization windows.

use crate::grid::Grid;

/// Where local analyses are computed and which cells each one sees.
///
/// Sparse rows and columns run `0, s, 2s, …` and always include the last
/// row/column, so the sparse lattice covers the whole grid.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalizationGeometry {
    grid: Grid,
    radius: usize,
    sparse_rows: Vec<usize>,
    sparse_cols: Vec<usize>,
    positions: Vec<(usize, usize)>,
    neighborhoods: Vec<Vec<usize>>,
}

impl LocalizationGeometry {
    /// Sparse lattice with stride `spacing` (0 acts as 1) and windows of
    /// half-width `radius`.
    pub fn new(grid: Grid, spacing: usize, radius: usize) -> Self {
        let spacing = spacing.max(1);
        let sparse_rows = strided(grid.rows, spacing);
        let sparse_cols = strided(grid.cols, spacing);

        // Row-major product is already sorted by flat index.
        let positions: Vec<(usize, usize)> = sparse_rows
            .iter()
            .flat_map(|&r| sparse_cols.iter().map(move |&c| (r, c)))
            .collect();
        let neighborhoods = positions
            .iter()
            .map(|&(r, c)| chebyshev_window(&grid, r, c, radius))
            .collect();

        Self {
            grid,
            radius,
            sparse_rows,
            sparse_cols,
            positions,
            neighborhoods,
        }
    }

    /// One position per cell with a window covering the whole grid.
    pub fn dense(grid: Grid) -> Self {
        Self::new(grid, 1, grid.rows.max(grid.cols))
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn sparse_rows(&self) -> &[usize] {
        &self.sparse_rows
    }

    pub fn sparse_cols(&self) -> &[usize] {
        &self.sparse_cols
    }

    /// Sparse `(row, col)` positions sorted by flat index.
    pub fn positions(&self) -> &[(usize, usize)] {
        &self.positions
    }

    /// Flat indices of the sparse positions.
    pub fn flat_positions(&self) -> Vec<usize> {
        self.positions
            .iter()
            .map(|&(r, c)| self.grid.flat_index(r, c))
            .collect()
    }

    /// Sorted flat indices inside the clipped window of sparse position `i`.
    pub fn neighborhood(&self, i: usize) -> &[usize] {
        &self.neighborhoods[i]
    }

    /// Sparse positions as interpolation nodes.
    pub fn sparse_points(&self) -> Vec<[f64; 2]> {
        self.positions.iter().map(|&(r, c)| [r as f64, c as f64]).collect()
    }

    /// Every grid cell as an interpolation target, in flat-index order.
    pub fn query_points(&self) -> Vec<[f64; 2]> {
        self.grid.positions().map(|(r, c)| [r as f64, c as f64]).collect()
    }
}

fn strided(len: usize, spacing: usize) -> Vec<usize> {
    let mut out: Vec<usize> = (0..len).step_by(spacing).collect();
    if out.last() != Some(&(len - 1)) {
        out.push(len - 1);
    }
    out
}

fn chebyshev_window(grid: &Grid, row: usize, col: usize, radius: usize) -> Vec<usize> {
    let r0 = row.saturating_sub(radius);
    let r1 = (row + radius).min(grid.rows - 1);
    let c0 = col.saturating_sub(radius);
    let c1 = (col + radius).min(grid.cols - 1);
    let mut out = Vec::with_capacity((r1 - r0 + 1) * (c1 - c0 + 1));
    for r in r0..=r1 {
        for c in c0..=c1 {
            out.push(grid.flat_index(r, c));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_lattice_includes_last_row_and_col() {
        let grid = Grid::new(12, 10, 250.0, 250.0).unwrap();
        let geometry = LocalizationGeometry::new(grid, 5, 2);
        assert_eq!(geometry.sparse_rows(), &[0, 5, 10, 11]);
        assert_eq!(geometry.sparse_cols(), &[0, 5, 9]);
        assert_eq!(geometry.positions().len(), 12);

        let flat = geometry.flat_positions();
        assert!(flat.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*flat.last().unwrap(), grid.size() - 1);
    }

    #[test]
    fn test_exact_stride_does_not_duplicate_last() {
        let grid = Grid::new(11, 6, 1.0, 1.0).unwrap();
        let geometry = LocalizationGeometry::new(grid, 5, 1);
        assert_eq!(geometry.sparse_rows(), &[0, 5, 10]);
        assert_eq!(geometry.sparse_cols(), &[0, 5]);
    }

    #[test]
    fn test_neighborhood_clipped_at_corners() {
        let grid = Grid::new(8, 8, 1.0, 1.0).unwrap();
        let geometry = LocalizationGeometry::new(grid, 7, 2);
        // Position 0 is (0, 0): window rows 0..=2, cols 0..=2.
        let window = geometry.neighborhood(0);
        assert_eq!(window.len(), 9);
        assert_eq!(window, &[0, 1, 2, 8, 9, 10, 16, 17, 18]);
        // Last position is (7, 7).
        let last = geometry.neighborhood(geometry.positions().len() - 1);
        assert_eq!(last, &[45, 46, 47, 53, 54, 55, 61, 62, 63]);
    }

    #[test]
    fn test_dense_geometry_windows_cover_grid() {
        let grid = Grid::new(5, 6, 1.0, 1.0).unwrap();
        let geometry = LocalizationGeometry::dense(grid);
        assert_eq!(geometry.positions().len(), grid.size());
        for i in 0..grid.size() {
            assert_eq!(geometry.neighborhood(i).len(), grid.size());
        }
        assert_eq!(geometry.query_points().len(), 30);
        assert_eq!(geometry.query_points()[7], [1.0, 1.0]);
    }
}
