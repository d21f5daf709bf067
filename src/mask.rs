//! Blend mask for coarse-cycle frame insertion.
//!
//! The mask is near one along the domain border and decays toward the centre, so
//! a new satellite frame replaces the ensemble where advected cloud has no
//! upstream information and leaves the interior to the filter.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::grid::{field_range, Grid, ScalarField};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskConfig {
    /// Width of the band of ones along each edge (cells).
    pub border: usize,
    /// Gaussian smoothing standard deviation (cells).
    pub sigma: f64,
    /// Kernel half-width in multiples of `sigma`.
    pub truncate: f64,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            border: 25,
            sigma: 12.0,
            truncate: 4.0,
        }
    }
}

/// Border band of ones, smoothed.
pub fn template(grid: &Grid, config: &MaskConfig) -> ScalarField {
    let border = config.border;
    let mut mask = Array2::from_shape_fn(grid.shape(), |(r, c)| {
        let inside = r >= border && c >= border && r + border < grid.rows && c + border < grid.cols;
        if inside {
            0.0
        } else {
            1.0
        }
    });
    if config.sigma > 0.0 {
        let kernel = gaussian_kernel(config.sigma, config.truncate);
        mask = convolve_axis(&mask, &kernel, Axis(0));
        mask = convolve_axis(&mask, &kernel, Axis(1));
    }
    mask
}

/// Rescales to `[0, 1]`. A flat mask becomes all ones.
pub fn normalize(mask: &ScalarField) -> ScalarField {
    let (min, max) = field_range(mask);
    let span = max - min;
    if !(span > 0.0) || !span.is_finite() {
        return Array2::ones(mask.dim());
    }
    mask.mapv(|v| (v - min) / span)
}

fn gaussian_kernel(sigma: f64, truncate: f64) -> Array1<f64> {
    let radius = (truncate * sigma + 0.5) as i64;
    let mut kernel = Array1::from_iter((-radius..=radius).map(|x| {
        let x = x as f64;
        (-0.5 * x * x / (sigma * sigma)).exp()
    }));
    let sum = kernel.sum();
    kernel /= sum;
    kernel
}

/// Half-sample symmetric reflection: `d c b a | a b c d | d c b a`.
fn reflect(index: i64, len: usize) -> usize {
    let n = len as i64;
    let period = 2 * n;
    let mut i = index.rem_euclid(period);
    if i >= n {
        i = period - 1 - i;
    }
    i as usize
}

fn convolve_axis(field: &Array2<f64>, kernel: &Array1<f64>, axis: Axis) -> Array2<f64> {
    let radius = (kernel.len() / 2) as i64;
    let mut out = Array2::zeros(field.dim());
    for (src, mut dst) in field.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        let n = src.len();
        for i in 0..n {
            let mut acc = 0.0;
            for (k, &w) in kernel.iter().enumerate() {
                let j = reflect(i as i64 + k as i64 - radius, n);
                acc += w * src[j];
            }
            dst[i] = acc;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_indices() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(2, 4), 2);
        assert_eq!(reflect(-9, 4), 0);
    }

    #[test]
    fn test_kernel_normalized_and_symmetric() {
        let k = gaussian_kernel(12.0, 4.0);
        assert_eq!(k.len(), 97);
        assert!((k.sum() - 1.0).abs() < 1e-12);
        assert!((k[0] - k[96]).abs() < 1e-15);
    }

    #[test]
    fn test_template_heavier_at_border() {
        let grid = Grid::new(80, 90, 250.0, 250.0).unwrap();
        let mask = template(&grid, &MaskConfig::default());
        let centre = mask[[40, 45]];
        assert!(mask[[0, 0]] > centre);
        assert!(mask[[0, 45]] > centre);
        assert!(mask[[40, 89]] > centre);
        assert!(mask.iter().all(|&v| (0.0..=1.0 + 1e-12).contains(&v)));
    }

    #[test]
    fn test_template_small_grid_is_flat() {
        // Border wider than the grid: the band covers everything.
        let grid = Grid::new(5, 5, 250.0, 250.0).unwrap();
        let mask = template(&grid, &MaskConfig::default());
        assert!(mask.iter().all(|&v| (v - 1.0).abs() < 1e-12));
        assert!(normalize(&mask).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_normalize_range() {
        let grid = Grid::new(60, 60, 250.0, 250.0).unwrap();
        let mask = normalize(&template(&grid, &MaskConfig::default()));
        let (min, max) = field_range(&mask);
        assert!(min.abs() < 1e-12);
        assert!((max - 1.0).abs() < 1e-12);
    }
}
