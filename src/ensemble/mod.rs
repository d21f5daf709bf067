//! Ensemble state: perturbed wind biases plus perturbed copies of the field.
//!
//! The ensemble is a `(wind_size + rows*cols) × members` matrix. The first
//! `wind_size` rows hold per-member wind biases (row 0 is ΔU, row 1 is ΔV); the
//! remaining rows hold each member's flattened field in row-major order.

mod config;

pub use config::EnsembleConfig;

use ndarray::{s, Array1, Array2, ArrayView2, ArrayViewMut2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use thiserror::Error;

use crate::advection::{advance_steps, SubstepPlan};
use crate::grid::{Grid, GridError, ScalarField, WindField};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnsembleError {
    #[error("Wind perturbation rows must be 0, 1 or 2, got {0}")]
    WindSize(usize),
    #[error("Ensemble needs at least two members, got {0}")]
    TooFewMembers(usize),
    #[error("Invalid standard deviation {0}")]
    InvalidSigma(f64),
    #[error("Ensemble has {found} rows, expected {expected}")]
    RowCount { expected: usize, found: usize },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Ensemble matrix with its row layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Ensemble {
    data: Array2<f64>,
    wind_size: usize,
    grid: Grid,
}

impl Ensemble {
    /// Wraps an existing matrix, checking the row layout.
    pub fn from_matrix(data: Array2<f64>, wind_size: usize, grid: Grid) -> Result<Self, EnsembleError> {
        if wind_size > 2 {
            return Err(EnsembleError::WindSize(wind_size));
        }
        let expected = wind_size + grid.size();
        if data.nrows() != expected {
            return Err(EnsembleError::RowCount {
                expected,
                found: data.nrows(),
            });
        }
        Ok(Self { data, wind_size, grid })
    }

    /// Draws a perturbed ensemble around `field`.
    ///
    /// Each wind row `r` gets `N(0, wind_sigmas[r])` per member. Each member's
    /// field is `(1 - p) * field + p` with `p ~ N(0, ci_sigma)`, pulling the whole
    /// field toward (or away from) clear sky.
    pub fn perturbed<R: Rng + ?Sized>(
        field: &ScalarField,
        grid: Grid,
        config: &EnsembleConfig,
        rng: &mut R,
    ) -> Result<Self, EnsembleError> {
        grid.check_field("ensemble seed field", field)?;
        let wind_size = config.wind_sigmas.len();
        if wind_size > 2 {
            return Err(EnsembleError::WindSize(wind_size));
        }
        if config.ens_size < 2 {
            return Err(EnsembleError::TooFewMembers(config.ens_size));
        }

        let members = config.ens_size;
        let mut data = Array2::zeros((wind_size + grid.size(), members));

        for (r, &sigma) in config.wind_sigmas.iter().enumerate() {
            let normal = Normal::new(0.0, sigma).map_err(|_| EnsembleError::InvalidSigma(sigma))?;
            for m in 0..members {
                data[[r, m]] = normal.sample(rng);
            }
        }

        let normal =
            Normal::new(0.0, config.ci_sigma).map_err(|_| EnsembleError::InvalidSigma(config.ci_sigma))?;
        let flat: Vec<f64> = field.iter().copied().collect();
        for m in 0..members {
            let p: f64 = normal.sample(rng);
            let mut column = data.slice_mut(s![wind_size.., m]);
            for (dst, &value) in column.iter_mut().zip(&flat) {
                *dst = (1.0 - p) * value + p;
            }
        }

        Ok(Self { data, wind_size, grid })
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn wind_size(&self) -> usize {
        self.wind_size
    }

    pub fn members(&self) -> usize {
        self.data.ncols()
    }

    /// The full matrix.
    pub fn matrix(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn into_matrix(self) -> Array2<f64> {
        self.data
    }

    /// Field rows only, `rows*cols × members`.
    pub fn scalar_rows(&self) -> ArrayView2<'_, f64> {
        self.data.slice(s![self.wind_size.., ..])
    }

    pub fn scalar_rows_mut(&mut self) -> ArrayViewMut2<'_, f64> {
        self.data.slice_mut(s![self.wind_size.., ..])
    }

    /// Column mean over the whole state vector.
    pub fn mean(&self) -> Array1<f64> {
        self.data.mean_axis(Axis(1)).unwrap_or_else(|| Array1::zeros(self.data.nrows()))
    }

    /// Ensemble-mean field.
    pub fn scalar_mean(&self) -> ScalarField {
        let mean = self.mean();
        let flat = mean.slice(s![self.wind_size..]).to_owned();
        flat.into_shape_with_order(self.grid.shape())
            .unwrap_or_else(|_| self.grid.zeros())
    }

    /// Field of a single member.
    pub fn member_field(&self, member: usize) -> ScalarField {
        let column = self.data.slice(s![self.wind_size.., member]);
        Array2::from_shape_fn(self.grid.shape(), |(r, c)| column[r * self.grid.cols + c])
    }

    /// `(ΔU, ΔV)` bias of a member; missing rows read as zero.
    pub fn member_wind(&self, member: usize) -> (f64, f64) {
        let du = if self.wind_size > 0 { self.data[[0, member]] } else { 0.0 };
        let dv = if self.wind_size > 1 { self.data[[1, member]] } else { 0.0 };
        (du, dv)
    }

    /// Advects every member with the shared wind plus its own bias.
    ///
    /// Members are independent and run in parallel; wind rows are unchanged.
    pub fn advect(&mut self, plan: SubstepPlan, wind: &WindField) -> Result<(), GridError> {
        let grid = self.grid;
        let advanced: Vec<ScalarField> = (0..self.members())
            .into_par_iter()
            .map(|m| {
                let (du, dv) = self.member_wind(m);
                let member_wind = wind.with_bias(du, dv);
                advance_steps(self.member_field(m).view(), plan, &member_wind, grid.dx, grid.dy)
            })
            .collect::<Result<_, _>>()?;

        for (m, field) in advanced.iter().enumerate() {
            self.set_member_field(m, field);
        }
        Ok(())
    }

    /// Overwrites the field rows of `member`.
    pub fn set_member_field(&mut self, member: usize, field: &ScalarField) {
        let mut column = self.data.slice_mut(s![self.wind_size.., member]);
        for (dst, &value) in column.iter_mut().zip(field.iter()) {
            *dst = value;
        }
    }

    /// Blends every member toward `frame`: `frame * mask + member * (1 - mask)`.
    pub fn blend_toward(&mut self, frame: &ScalarField, mask: &ScalarField) -> Result<(), GridError> {
        self.grid.check_field("blend frame", frame)?;
        self.grid.check_field("blend mask", mask)?;
        let wind_size = self.wind_size;
        for mut column in self.data.axis_iter_mut(Axis(1)) {
            let mut cells = column.slice_mut(s![wind_size..]);
            for ((dst, &f), &w) in cells.iter_mut().zip(frame.iter()).zip(mask.iter()) {
                *dst = f * w + *dst * (1.0 - w);
            }
        }
        Ok(())
    }

    /// Replaces the matrix with an analysis of the same shape.
    pub fn replace_matrix(&mut self, data: Array2<f64>) -> Result<(), EnsembleError> {
        if data.dim() != self.data.dim() {
            return Err(EnsembleError::RowCount {
                expected: self.data.nrows(),
                found: data.nrows(),
            });
        }
        self.data = data;
        Ok(())
    }

    /// Replaces the field rows with an analysis, leaving wind rows alone.
    pub fn replace_scalar_rows(&mut self, rows: ArrayView2<f64>) -> Result<(), EnsembleError> {
        let expected = self.scalar_rows().dim();
        if rows.dim() != expected {
            return Err(EnsembleError::RowCount {
                expected: expected.0,
                found: rows.nrows(),
            });
        }
        self.scalar_rows_mut().assign(&rows);
        Ok(())
    }
}
