//! Flux-form scalar advection.
//!
//! A fourth-order centred flux difference in the interior with first-order upwind
//! edges, integrated in time by a low-storage third-order Runge-Kutta scheme.

mod flux;
mod integrate;

pub use flux::space_derivative;
pub use integrate::{advance, advance_steps, SubstepPlan};
