use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use super::geometry::LocalizationGeometry;
use super::global::row_mean;
use super::interpolate::SparseInterpolator;
use super::transform::{transform_weights, RInverse};
use super::LetkfError;

/// Localized LETKF with every field cell observed directly.
///
/// `ensemble` is `cells × k` (field rows only) and `observations` holds one value
/// per cell. A transform is computed at each sparse position of `geometry` from
/// the cells in its window, then interpolated to every cell with `interpolator`.
///
/// # Arguments
/// * `ensemble` - Field rows, one column per member
/// * `observations` - One value per cell, row-major
/// * `r_inv` - Inverse observation error covariance over all cells
/// * `inflation` - Multiplicative covariance inflation
/// * `geometry` - Sparse positions and their windows
/// * `interpolator` - Spreads sparse weights to every cell
///
/// # Returns
/// The `cells × k` analysis, or `InterpolationDomain` for a cell outside the
/// sparse lattice
pub fn assimilate_local(
    ensemble: ArrayView2<f64>,
    observations: ArrayView1<f64>,
    r_inv: &RInverse,
    inflation: f64,
    geometry: &LocalizationGeometry,
    interpolator: &dyn SparseInterpolator,
) -> Result<Array2<f64>, LetkfError> {
    let (cells, k) = ensemble.dim();
    if k == 0 {
        return Ok(Array2::zeros((cells, 0)));
    }
    let grid_cells = geometry.grid().size();
    if cells != grid_cells {
        return Err(LetkfError::DimensionMismatch {
            what: "ensemble rows",
            expected: grid_cells,
            found: cells,
        });
    }
    if observations.len() != cells {
        return Err(LetkfError::DimensionMismatch {
            what: "observations",
            expected: cells,
            found: observations.len(),
        });
    }
    r_inv.check_len(cells)?;

    let x_mean = row_mean(ensemble, k);
    let x_pert = &ensemble - &x_mean.view().insert_axis(Axis(1));
    let innovation = &observations - &x_mean;

    let weights: Vec<Array2<f64>> = (0..geometry.positions().len())
        .into_par_iter()
        .map(|p| {
            let local = geometry.neighborhood(p);
            let y_local = x_pert.select(Axis(0), local);
            let d_local: Array1<f64> = local.iter().map(|&i| innovation[i]).collect();
            transform_weights(y_local.view(), d_local.view(), &r_inv.select(local), inflation)
        })
        .collect::<Result<_, _>>()?;

    let stencils = interpolator.stencils(&geometry.sparse_points(), &geometry.query_points())?;

    let mut flat = vec![0.0; cells * k];
    flat.par_chunks_mut(k)
        .zip(stencils.par_iter())
        .enumerate()
        .for_each(|(cell, (out, stencil))| {
            let mut w = Array2::<f64>::zeros((k, k));
            for &(node, weight) in stencil {
                if weight != 0.0 {
                    w.scaled_add(weight, &weights[node]);
                }
            }
            let row = x_pert.row(cell).dot(&w);
            for (dst, value) in out.iter_mut().zip(row.iter()) {
                *dst = x_mean[cell] + value;
            }
        });

    Array2::from_shape_vec((cells, k), flat).map_err(|_| LetkfError::DimensionMismatch {
        what: "analysis",
        expected: cells * k,
        found: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::letkf::{assimilate_global, GridTriangulation};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    fn random_ensemble(grid: &Grid, k: usize, seed: u64) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let normal = Normal::new(0.4, 0.15).unwrap();
        Array2::from_shape_fn((grid.size(), k), |_| normal.sample(&mut rng))
    }

    #[test]
    fn test_dense_geometry_matches_global() {
        let grid = Grid::new(5, 6, 1.0, 1.0).unwrap();
        let k = 8;
        let ensemble = random_ensemble(&grid, k, 10);
        let obs = Array1::from_shape_fn(grid.size(), |i| 0.3 + 0.01 * i as f64);
        let rows: Vec<usize> = (0..grid.size()).collect();
        let r_inv = RInverse::Scalar(20.0);

        let global = assimilate_global(ensemble.view(), obs.view(), &rows, &r_inv, 1.1).unwrap();
        let local = assimilate_local(
            ensemble.view(),
            obs.view(),
            &r_inv,
            1.1,
            &LocalizationGeometry::dense(grid),
            &GridTriangulation,
        )
        .unwrap();

        let diff = global
            .iter()
            .zip(local.iter())
            .fold(0.0f64, |m, (a, b)| m.max((a - b).abs()));
        assert!(diff < 1e-9, "max difference {}", diff);
    }

    #[test]
    fn test_sparse_geometry_pulls_toward_observations() {
        // Members differ mostly by a domain-wide offset, as perturbed clear-sky
        // pulls do, plus a little cell noise.
        let grid = Grid::new(12, 12, 1.0, 1.0).unwrap();
        let noise = random_ensemble(&grid, 10, 11);
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let offsets: Vec<f64> = (0..10).map(|_| Normal::new(0.0, 0.15).unwrap().sample(&mut rng)).collect();
        let ensemble = Array2::from_shape_fn((grid.size(), 10), |(i, m)| 0.4 + offsets[m] + 0.1 * (noise[[i, m]] - 0.4));
        let obs = Array1::from_elem(grid.size(), 0.8);
        let before = ensemble.mean_axis(Axis(1)).unwrap();
        let analysis = assimilate_local(
            ensemble.view(),
            obs.view(),
            &RInverse::Scalar(400.0),
            1.0,
            &LocalizationGeometry::new(grid, 4, 3),
            &GridTriangulation,
        )
        .unwrap();
        let after = analysis.mean_axis(Axis(1)).unwrap();
        let err_before: f64 = before.iter().map(|m| (m - 0.8).abs()).sum();
        let err_after: f64 = after.iter().map(|m| (m - 0.8).abs()).sum();
        assert!(err_after < 0.5 * err_before, "{} vs {}", err_after, err_before);
        assert!(analysis.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_shape_checks() {
        let grid = Grid::new(5, 5, 1.0, 1.0).unwrap();
        let ensemble = random_ensemble(&grid, 4, 12);
        let geometry = LocalizationGeometry::new(grid, 2, 1);
        let short = Array1::zeros(3);
        assert!(matches!(
            assimilate_local(ensemble.view(), short.view(), &RInverse::Scalar(1.0), 1.0, &geometry, &GridTriangulation),
            Err(LetkfError::DimensionMismatch { .. })
        ));
        let other = Grid::new(5, 6, 1.0, 1.0).unwrap();
        let obs = Array1::zeros(grid.size());
        assert!(matches!(
            assimilate_local(
                ensemble.view(),
                obs.view(),
                &RInverse::Scalar(1.0),
                1.0,
                &LocalizationGeometry::new(other, 2, 1),
                &GridTriangulation
            ),
            Err(LetkfError::DimensionMismatch { .. })
        ));
    }
}
