use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use super::transform::{transform_weights, RInverse};
use super::LetkfError;

/// Global LETKF update of every ensemble row from observations of `observed_rows`.
///
/// `ensemble` is `n × k` (state rows × members). The observation operator
/// selects rows, so observed-space perturbations are the selected rows with
/// their column mean removed.
///
/// # Arguments
/// * `ensemble` - State matrix, one column per member
/// * `observations` - One value per entry of `observed_rows`
/// * `observed_rows` - Row of `ensemble` each observation measures
/// * `r_inv` - Inverse observation error covariance (scalar or diagonal)
/// * `inflation` - Multiplicative covariance inflation
///
/// # Returns
/// The `n × k` analysis ensemble, or `NonPositiveDefinite` if the ensemble-space
/// matrix has an eigenvalue ≤ 0
pub fn assimilate_global(
    ensemble: ArrayView2<f64>,
    observations: ArrayView1<f64>,
    observed_rows: &[usize],
    r_inv: &RInverse,
    inflation: f64,
) -> Result<Array2<f64>, LetkfError> {
    let (n, k) = ensemble.dim();
    if observations.len() != observed_rows.len() {
        return Err(LetkfError::DimensionMismatch {
            what: "observations",
            expected: observed_rows.len(),
            found: observations.len(),
        });
    }
    if let Some(&row) = observed_rows.iter().find(|&&r| r >= n) {
        return Err(LetkfError::DimensionMismatch {
            what: "observed row",
            expected: n,
            found: row,
        });
    }

    let y_b = ensemble.select(Axis(0), observed_rows);
    let y_mean = row_mean(y_b.view(), k);
    let y_pert = &y_b - &y_mean.view().insert_axis(Axis(1));
    let innovation = &observations - &y_mean;

    let x_mean = row_mean(ensemble, k);
    let x_pert = &ensemble - &x_mean.view().insert_axis(Axis(1));

    let w = transform_weights(y_pert.view(), innovation.view(), r_inv, inflation)?;
    Ok(x_pert.dot(&w) + &x_mean.insert_axis(Axis(1)))
}

pub(super) fn row_mean(values: ArrayView2<f64>, members: usize) -> Array1<f64> {
    values.sum_axis(Axis(1)) / members.max(1) as f64
}
