//! Nowcast orchestration.
//!
//! The driver alternates fine cycles (advection plus point-sensor
//! assimilation) with coarse cycles (satellite frame insertion plus
//! full-field assimilation), reading data through the traits in [`sources`].

mod config;
mod diagnostics;
mod driver;
pub mod sources;
mod trajectory;

pub use config::NowcastConfig;
pub use diagnostics::{parallax_diagnostics, ParallaxDiagnostic};
pub use driver::{NowcastOutput, SimulationDriver};
pub use sources::{
    FixedSun, MemorySatellite, MemorySensors, MemoryWind, SatelliteSource, SensorSource, SolarPosition, Sources,
    WindSource,
};
pub use trajectory::Trajectory;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::ensemble::EnsembleError;
use crate::grid::GridError;
use crate::letkf::LetkfError;
use crate::observation::ObservationError;
use crate::parallax::ParallaxError;

/// Errors that can occur during a nowcast run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Need at least two satellite frames on the coarse schedule, found {0}")]
    InsufficientFrames(usize),
    #[error("Satellite frame missing at {0}")]
    MissingFrame(DateTime<Utc>),
    #[error("Satellite frame at {time} has {count} non-finite cells")]
    NonFiniteFrame { time: DateTime<Utc>, count: usize },
    #[error("No wind frame at or before {0}")]
    MissingWind(DateTime<Utc>),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Ensemble(#[from] EnsembleError),
    #[error(transparent)]
    Parallax(#[from] ParallaxError),
    #[error(transparent)]
    Observation(#[from] ObservationError),
    #[error(transparent)]
    Letkf(#[from] LetkfError),
    #[error("Config I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config JSON invalid: {0}")]
    Json(#[from] serde_json::Error),
}
