//! Cloud-index nowcasting.
//!
//! This crate forecasts clear-sky index fields a few hours ahead by advecting
//! an ensemble of cloud fields with an estimated wind, and correcting it with
//! the LETKF against ground sensors (every fine step) and satellite frames
//! (every coarse step).

pub mod advection;
pub mod ensemble;
pub mod export;
pub mod grid;
pub mod letkf;
pub mod mask;
pub mod noise;
pub mod observation;
pub mod parallax;
pub mod pipeline;

pub use advection::{advance, advance_steps, SubstepPlan};
pub use ensemble::{Ensemble, EnsembleConfig};
pub use grid::{Grid, LatLonAxes, ScalarField, WindField};
pub use letkf::{assimilate_global, assimilate_local, LetkfConfig, LocalizationConfig};
pub use mask::MaskConfig;
pub use observation::{ObservationMapper, SensorLocation};
pub use parallax::{ParallaxConfig, ParallaxCorrector, ViewAngles};
pub use pipeline::{NowcastConfig, NowcastOutput, PipelineError, SimulationDriver};
