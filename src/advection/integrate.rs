//! Time integration and CFL-driven sub-stepping.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use super::flux::space_derivative;
use crate::grid::{GridError, WindField};

/// Advances `q` by one step of length `dt`.
///
/// Low-storage RK3: `k1 = L(q)`, `k2 = L(q + dt/3 k1)`, `k3 = L(q + dt/2 k2)`,
/// `q' = q + dt k3`.
///
/// # Arguments
/// * `q` - Cell-centred field, `rows × cols`
/// * `dt` - Step length (s)
/// * `wind` - Face-staggered wind matching the shape of `q`
/// * `dx`, `dy` - Cell spacing (m)
///
/// # Returns
/// The advanced field, or a `GridError` if `q` and `wind` disagree in shape
pub fn advance(
    q: ArrayView2<f64>,
    dt: f64,
    wind: &WindField,
    dx: f64,
    dy: f64,
) -> Result<Array2<f64>, GridError> {
    let k = space_derivative(q, wind, dx, dy)?;
    let stage = &q + &(k * (dt / 3.0));
    let k = space_derivative(stage.view(), wind, dx, dy)?;
    let stage = &q + &(k * (dt / 2.0));
    let k = space_derivative(stage.view(), wind, dx, dy)?;
    Ok(&q + &(k * dt))
}

/// Applies [`advance`] `plan.steps` times with `plan.dt`.
pub fn advance_steps(
    q: ArrayView2<f64>,
    plan: SubstepPlan,
    wind: &WindField,
    dx: f64,
    dy: f64,
) -> Result<Array2<f64>, GridError> {
    let mut out = q.to_owned();
    for _ in 0..plan.steps {
        out = advance(out.view(), plan.dt, wind, dx, dy)?;
    }
    Ok(out)
}

/// Number and length of RK3 sub-steps covering an interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubstepPlan {
    pub steps: usize,
    pub dt: f64,
}

impl SubstepPlan {
    /// Sub-steps so that `dt * (max|u|/dx + max|v|/dy) <= c_max`.
    ///
    /// `steps = ceil(total_seconds * (max|u|/dx + max|v|/dy) / c_max)`, clamped to at
    /// least one step (calm wind or an empty interval).
    ///
    /// # Errors
    /// `GridError::InvalidCourant` unless `c_max` is positive and finite.
    pub fn for_interval(
        total_seconds: f64,
        wind: &WindField,
        dx: f64,
        dy: f64,
        c_max: f64,
    ) -> Result<Self, GridError> {
        if !(c_max > 0.0 && c_max.is_finite()) {
            return Err(GridError::InvalidCourant(c_max));
        }
        let (cx, cy) = wind.max_speeds();
        let courant_rate = cx / dx + cy / dy;
        let raw = (total_seconds * courant_rate / c_max).ceil();
        let steps = if raw.is_finite() && raw >= 1.0 { raw as usize } else { 1 };
        Ok(Self {
            steps,
            dt: total_seconds / steps as f64,
        })
    }

    /// Courant number actually realised by this plan.
    pub fn courant(&self, wind: &WindField, dx: f64, dy: f64) -> f64 {
        let (cx, cy) = wind.max_speeds();
        self.dt * (cx / dx + cy / dy)
    }
}
