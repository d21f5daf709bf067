//! Parallax correction for cloud shadows.
//!
//! A satellite sees a cloud top displaced from the shadow it casts on the ground.
//! Given a cloud height, the fixed satellite look angles and the current sun angles,
//! this module works out how far (in meters, degrees and finally grid cells) a
//! ground sensor must be moved to land on the pixel that shadows it.

mod config;
mod geometry;

pub use config::{ParallaxConfig, ViewAngles};
pub use geometry::{meters_to_degrees, parallax_shift, CellShift, ParallaxCorrector, ParallaxError, EARTH_RADIUS_M};
