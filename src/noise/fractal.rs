//! Multi-octave fractal noise for synthetic cloud fields.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use simdnoise::NoiseBuilder;

/// Configuration for fractal cloud noise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudNoiseConfig {
    /// Number of noise octaves.
    pub octaves: u8,
    /// Base frequency in cycles per cell.
    pub frequency: f32,
    /// Frequency multiplier per octave.
    pub lacunarity: f32,
    /// Amplitude decay per octave.
    pub persistence: f32,
    /// Random seed for reproducible generation.
    pub seed: i32,
    /// Fraction of the sky covered by cloud, roughly.
    pub coverage: f64,
    /// Clear-sky index under thick cloud.
    pub overcast_index: f64,
}

impl Default for CloudNoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 5,
            frequency: 0.03,
            lacunarity: 2.0,
            persistence: 0.5,
            seed: 42,
            coverage: 0.5,
            overcast_index: 0.2,
        }
    }
}

impl CloudNoiseConfig {
    pub fn with_seed(seed: i32) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }
}

/// Fractal noise at a continuous cell position, roughly in `[-1, 1]`.
pub fn sample_cloud_noise(pos: DVec2, config: &CloudNoiseConfig) -> f32 {
    let mut total = 0.0f32;
    let mut amplitude = 1.0f32;
    let mut frequency = config.frequency;
    let mut max_amplitude = 0.0f32;

    for octave in 0..config.octaves {
        let octave_seed = config.seed.wrapping_add(octave as i32 * 31337);
        let x = pos.x as f32 * frequency;
        let y = pos.y as f32 * frequency;

        let value = NoiseBuilder::fbm_2d_offset(x, 1, y, 1)
            .with_seed(octave_seed)
            .with_freq(1.0)
            .with_octaves(1)
            .generate()
            .0[0];

        total += value * amplitude;
        max_amplitude += amplitude;
        amplitude *= config.persistence;
        frequency *= config.lacunarity;
    }

    total / max_amplitude
}

/// Clear-sky index at a continuous cell position.
///
/// Noise above the coverage threshold becomes cloud, ramping from clear (1.0)
/// down to `overcast_index`.
pub fn clear_sky_index(pos: DVec2, config: &CloudNoiseConfig) -> f64 {
    let noise = sample_cloud_noise(pos, config) as f64;
    // Map coverage to a threshold in noise units; noise is roughly symmetric.
    let threshold = 1.0 - 2.0 * config.coverage.clamp(0.0, 1.0);
    let cloud = ((noise - threshold) * 4.0 + 0.5).clamp(0.0, 1.0);
    1.0 - cloud * (1.0 - config.overcast_index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_reproducibility() {
        let config = CloudNoiseConfig::with_seed(12345);
        let pos = DVec2::new(10.5, 3.25);
        assert_eq!(sample_cloud_noise(pos, &config), sample_cloud_noise(pos, &config));
    }

    #[test]
    fn test_different_seeds_differ() {
        let pos = DVec2::new(17.0, 5.0);
        let a = sample_cloud_noise(pos, &CloudNoiseConfig::with_seed(1));
        let b = sample_cloud_noise(pos, &CloudNoiseConfig::with_seed(2));
        assert_ne!(a, b);
    }

    #[test]
    fn test_clear_sky_index_bounds() {
        let config = CloudNoiseConfig::default();
        for i in 0..50 {
            let v = clear_sky_index(DVec2::new(i as f64 * 3.7, i as f64 * 1.3), &config);
            assert!(v >= config.overcast_index - 1e-12 && v <= 1.0 + 1e-12, "value {}", v);
        }
    }

    #[test]
    fn test_full_and_zero_coverage() {
        let pos = DVec2::new(4.0, 9.0);
        let overcast = CloudNoiseConfig {
            coverage: 1.0,
            ..Default::default()
        };
        let clear = CloudNoiseConfig {
            coverage: 0.0,
            ..Default::default()
        };
        assert!((clear_sky_index(pos, &overcast) - overcast.overcast_index).abs() < 1e-12);
        assert!((clear_sky_index(pos, &clear) - 1.0).abs() < 1e-12);
    }
}
