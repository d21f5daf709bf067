//! Face-staggered wind fields.

use ndarray::Array2;

use super::layout::{Grid, GridError};

/// Wind components on cell faces (Arakawa-C layout).
///
/// - `u` has shape `rows × (cols + 1)`: column `i` is the west face of cell `i`,
///   column `cols` is the east edge of the domain.
/// - `v` has shape `(rows + 1) × cols`: row `j` is the south face of cell `j`.
///
/// Units are m/s; positive `u` is eastward, positive `v` is toward increasing row.
#[derive(Debug, Clone, PartialEq)]
pub struct WindField {
    pub u: Array2<f64>,
    pub v: Array2<f64>,
}

impl WindField {
    /// Builds a wind field for `grid` from either staggered or cell-centred components.
    ///
    /// Cell-centred input (`rows × cols`) is resampled to faces by averaging the two
    /// adjacent cells; the outermost faces copy the adjacent cell.
    pub fn on_grid(grid: &Grid, u: Array2<f64>, v: Array2<f64>) -> Result<Self, GridError> {
        let (rows, cols) = grid.shape();
        let u = match u.dim() {
            d if d == (rows, cols + 1) => u,
            d if d == (rows, cols) => stagger_columns(&u),
            found => {
                return Err(GridError::DimensionMismatch {
                    what: "wind U",
                    expected: (rows, cols + 1),
                    found,
                })
            }
        };
        let v = match v.dim() {
            d if d == (rows + 1, cols) => v,
            d if d == (rows, cols) => stagger_rows(&v),
            found => {
                return Err(GridError::DimensionMismatch {
                    what: "wind V",
                    expected: (rows + 1, cols),
                    found,
                })
            }
        };
        Ok(Self { u, v })
    }

    /// Spatially uniform wind.
    pub fn uniform(grid: &Grid, u: f64, v: f64) -> Self {
        let (rows, cols) = grid.shape();
        Self {
            u: Array2::from_elem((rows, cols + 1), u),
            v: Array2::from_elem((rows + 1, cols), v),
        }
    }

    /// Calm wind.
    pub fn calm(grid: &Grid) -> Self {
        Self::uniform(grid, 0.0, 0.0)
    }

    /// Returns `(rows, cols)` of the cell grid this wind lives on.
    pub fn cell_shape(&self) -> (usize, usize) {
        let (rows, cols_p1) = self.u.dim();
        (rows, cols_p1.saturating_sub(1))
    }

    /// Fails unless this wind is staggered for `grid`.
    pub fn check_grid(&self, grid: &Grid) -> Result<(), GridError> {
        let (rows, cols) = grid.shape();
        if self.u.dim() != (rows, cols + 1) {
            return Err(GridError::DimensionMismatch {
                what: "wind U",
                expected: (rows, cols + 1),
                found: self.u.dim(),
            });
        }
        if self.v.dim() != (rows + 1, cols) {
            return Err(GridError::DimensionMismatch {
                what: "wind V",
                expected: (rows + 1, cols),
                found: self.v.dim(),
            });
        }
        Ok(())
    }

    /// Returns `(max |u|, max |v|)`.
    pub fn max_speeds(&self) -> (f64, f64) {
        let cx = self.u.iter().fold(0.0f64, |m, &x| m.max(x.abs()));
        let cy = self.v.iter().fold(0.0f64, |m, &x| m.max(x.abs()));
        (cx, cy)
    }

    /// Returns a copy with constant biases added to each component.
    pub fn with_bias(&self, du: f64, dv: f64) -> Self {
        Self {
            u: self.u.mapv(|x| x + du),
            v: self.v.mapv(|x| x + dv),
        }
    }

    /// Returns a copy with both components negated.
    pub fn reversed(&self) -> Self {
        Self {
            u: self.u.mapv(|x| -x),
            v: self.v.mapv(|x| -x),
        }
    }
}

fn stagger_columns(centred: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = centred.dim();
    let mut faces = Array2::zeros((rows, cols + 1));
    for r in 0..rows {
        faces[[r, 0]] = centred[[r, 0]];
        faces[[r, cols]] = centred[[r, cols - 1]];
        for c in 1..cols {
            faces[[r, c]] = 0.5 * (centred[[r, c - 1]] + centred[[r, c]]);
        }
    }
    faces
}

fn stagger_rows(centred: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = centred.dim();
    let mut faces = Array2::zeros((rows + 1, cols));
    for c in 0..cols {
        faces[[0, c]] = centred[[0, c]];
        faces[[rows, c]] = centred[[rows - 1, c]];
        for r in 1..rows {
            faces[[r, c]] = 0.5 * (centred[[r - 1, c]] + centred[[r, c]]);
        }
    }
    faces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::new(5, 6, 100.0, 100.0).unwrap()
    }

    #[test]
    fn test_uniform_shapes() {
        let wind = WindField::uniform(&grid(), 2.0, -1.0);
        assert_eq!(wind.u.dim(), (5, 7));
        assert_eq!(wind.v.dim(), (6, 6));
        assert_eq!(wind.cell_shape(), (5, 6));
        assert!(wind.check_grid(&grid()).is_ok());
    }

    #[test]
    fn test_centred_input_is_staggered() {
        let g = grid();
        let mut u = Array2::zeros((5, 6));
        for c in 0..6 {
            u.column_mut(c).fill(c as f64);
        }
        let v = Array2::from_elem((5, 6), 3.0);
        let wind = WindField::on_grid(&g, u, v).unwrap();

        assert_eq!(wind.u.dim(), (5, 7));
        assert_eq!(wind.u[[0, 0]], 0.0);
        assert_eq!(wind.u[[0, 1]], 0.5);
        assert_eq!(wind.u[[2, 3]], 2.5);
        assert_eq!(wind.u[[4, 6]], 5.0);
        assert_eq!(wind.v.dim(), (6, 6));
        assert!(wind.v.iter().all(|&x| x == 3.0));
    }

    #[test]
    fn test_staggered_rows_follow_row_values() {
        let g = grid();
        let mut v = Array2::zeros((5, 6));
        for r in 0..5 {
            v.row_mut(r).fill(r as f64 * 2.0);
        }
        let wind = WindField::on_grid(&g, Array2::zeros((5, 6)), v).unwrap();
        assert_eq!(wind.v[[0, 2]], 0.0);
        assert_eq!(wind.v[[1, 2]], 1.0);
        assert_eq!(wind.v[[5, 2]], 8.0);
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        let g = grid();
        let err = WindField::on_grid(&g, Array2::zeros((4, 6)), Array2::zeros((5, 6)));
        assert!(matches!(err, Err(GridError::DimensionMismatch { what: "wind U", .. })));
    }

    #[test]
    fn test_max_speeds_and_bias() {
        let g = grid();
        let mut wind = WindField::uniform(&g, 1.0, -2.0);
        wind.u[[1, 1]] = -4.0;
        assert_eq!(wind.max_speeds(), (4.0, 2.0));

        let biased = wind.with_bias(0.5, 0.5);
        assert_eq!(biased.u[[0, 0]], 1.5);
        assert_eq!(biased.v[[0, 0]], -1.5);
        assert_eq!(wind.reversed().v[[0, 0]], 2.0);
    }
}
