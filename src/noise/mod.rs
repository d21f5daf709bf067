//! Synthetic cloud fields for demos and tests.
//!
//! Uses simdnoise for fractal noise generation.

mod fractal;
mod scenario;

pub use fractal::{clear_sky_index, sample_cloud_noise, CloudNoiseConfig};
pub use scenario::{ScenarioConfig, SyntheticScenario};
