//! Ensemble-space transform shared by the global and local filters.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use super::LetkfError;

/// Inverse observation error covariance, diagonal.
#[derive(Debug, Clone, PartialEq)]
pub enum RInverse {
    /// Same precision for every observation.
    Scalar(f64),
    /// One precision per observation.
    Diagonal(Array1<f64>),
}

impl RInverse {
    /// Precision of observation `i`.
    pub fn at(&self, i: usize) -> f64 {
        match self {
            RInverse::Scalar(value) => *value,
            RInverse::Diagonal(values) => values[i],
        }
    }

    /// Fails if a diagonal does not cover `observations` entries.
    pub fn check_len(&self, observations: usize) -> Result<(), LetkfError> {
        match self {
            RInverse::Diagonal(values) if values.len() != observations => Err(LetkfError::DimensionMismatch {
                what: "R inverse diagonal",
                expected: observations,
                found: values.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Restricts a diagonal to the given observation indices.
    pub fn select(&self, indices: &[usize]) -> RInverse {
        match self {
            RInverse::Scalar(value) => RInverse::Scalar(*value),
            RInverse::Diagonal(values) => RInverse::Diagonal(indices.iter().map(|&i| values[i]).collect()),
        }
    }
}

/// Computes the `k × k` analysis weights, mean update included.
///
/// `y_pert` holds observed-space perturbations (`m × k`, column mean removed)
/// and `innovation` is `y - ȳ_b`. Returns `W_a + w̄_a 1ᵀ` where
/// `A = (k-1)/inflation I + Yᵀ R⁻¹ Y = V Λ Vᵀ`, `W_a = V Λ^{-1/2} Vᵀ sqrt(k-1)`
/// and `w̄_a = V Λ⁻¹ Vᵀ Yᵀ R⁻¹ d`.
pub fn transform_weights(
    y_pert: ArrayView2<f64>,
    innovation: ArrayView1<f64>,
    r_inv: &RInverse,
    inflation: f64,
) -> Result<Array2<f64>, LetkfError> {
    let (m, k) = y_pert.dim();
    if innovation.len() != m {
        return Err(LetkfError::DimensionMismatch {
            what: "innovation",
            expected: m,
            found: innovation.len(),
        });
    }
    r_inv.check_len(m)?;

    // C = Yᵀ R⁻¹, k × m.
    let mut c = y_pert.t().to_owned();
    for (j, mut column) in c.columns_mut().into_iter().enumerate() {
        column *= r_inv.at(j);
    }

    let mut a = c.dot(&y_pert);
    let diag = (k as f64 - 1.0) / inflation;
    for i in 0..k {
        a[[i, i]] += diag;
    }

    let eigen = SymmetricEigen::new(DMatrix::from_fn(k, k, |i, j| a[[i, j]]));
    if let Some(&eigenvalue) = eigen.eigenvalues.iter().find(|&&l| !(l > 0.0)) {
        return Err(LetkfError::NonPositiveDefinite { eigenvalue });
    }

    let vectors = &eigen.eigenvectors;
    let scale = (k as f64 - 1.0).sqrt();
    let inv = DMatrix::from_diagonal(&eigen.eigenvalues.map(|l| 1.0 / l));
    let inv_sqrt = DMatrix::from_diagonal(&eigen.eigenvalues.map(|l| scale / l.sqrt()));
    let p_tilde = vectors * inv * vectors.transpose();
    let w_a = vectors * inv_sqrt * vectors.transpose();

    let c_d = c.dot(&innovation);
    let mut w = Array2::zeros((k, k));
    for i in 0..k {
        let mean_i: f64 = (0..k).map(|j| p_tilde[(i, j)] * c_d[j]).sum();
        for j in 0..k {
            w[[i, j]] = w_a[(i, j)] + mean_i;
        }
    }
    Ok(w)
}
