//! Synthetic nowcasting scenario: fractal clouds drifting with a uniform wind.

use chrono::{DateTime, Duration, Utc};
use glam::DVec2;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::fractal::{clear_sky_index, CloudNoiseConfig};
use crate::grid::{Grid, GridError, LatLonAxes, ScalarField, WindField};
use crate::observation::SensorLocation;
use crate::pipeline::{MemorySatellite, MemorySensors, MemoryWind, SolarPosition, Sources};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub rows: usize,
    pub cols: usize,
    pub dx: f64,
    pub dy: f64,
    /// Latitude of row 0 (degrees).
    pub lat0: f64,
    /// Longitude of column 0 (degrees).
    pub lon0: f64,
    pub lat_step: f64,
    pub lon_step: f64,
    /// Eastward wind (m/s).
    pub wind_u: f64,
    /// Northward wind (m/s).
    pub wind_v: f64,
    pub start: DateTime<Utc>,
    /// Number of satellite frames, 15 minutes apart.
    pub frames: usize,
    pub sensor_count: usize,
    /// Standard deviation of sensor reading noise.
    pub sensor_noise: f64,
    pub seed: u64,
    pub clouds: CloudNoiseConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            rows: 60,
            cols: 80,
            dx: 250.0,
            dy: 250.0,
            lat0: 32.0,
            lon0: -111.2,
            lat_step: 0.0025,
            lon_step: 0.0025,
            wind_u: 8.0,
            wind_v: 2.0,
            start: DateTime::from_timestamp(1_397_590_200, 0).unwrap_or_default(),
            frames: 5,
            sensor_count: 12,
            sensor_noise: 0.02,
            seed: 42,
            clouds: CloudNoiseConfig::default(),
        }
    }
}

/// In-memory satellite, wind and sensor data generated from one cloud pattern.
pub struct SyntheticScenario {
    config: ScenarioConfig,
    grid: Grid,
    satellite: MemorySatellite,
    wind: MemoryWind,
    sensors: MemorySensors,
}

impl SyntheticScenario {
    pub fn generate(config: ScenarioConfig) -> Result<Self, GridError> {
        let grid = Grid::new(config.rows, config.cols, config.dx, config.dy)?;
        let axes = LatLonAxes::regular(&grid, config.lat0, config.lon0, config.lat_step, config.lon_step);
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        let mut scenario = Self {
            satellite: MemorySatellite::new(axes.clone()),
            wind: MemoryWind::new(),
            sensors: MemorySensors::new(Vec::new()),
            grid,
            config,
        };

        let coarse = Duration::minutes(15);
        for i in 0..scenario.config.frames {
            let time = scenario.config.start + coarse * i as i32;
            let frame = scenario.truth(time);
            scenario.satellite.insert(time, frame);
        }
        scenario.wind.insert(
            scenario.config.start,
            WindField::uniform(&grid, scenario.config.wind_u, scenario.config.wind_v),
        );

        // Sensors on distinct interior cells.
        let margin = 2.min(grid.rows / 2).min(grid.cols / 2);
        let mut cells: Vec<(usize, usize)> = Vec::new();
        let wanted = scenario
            .config
            .sensor_count
            .min((grid.rows - 2 * margin) * (grid.cols - 2 * margin));
        while cells.len() < wanted {
            let cell = (
                rng.random_range(margin..grid.rows - margin),
                rng.random_range(margin..grid.cols - margin),
            );
            if !cells.contains(&cell) {
                cells.push(cell);
            }
        }
        let locations = cells
            .iter()
            .enumerate()
            .map(|(i, &(r, c))| SensorLocation::new(format!("sensor-{:02}", i), axes.lats()[r], axes.lons()[c]))
            .collect();
        let mut sensors = MemorySensors::new(locations);

        let noise = Normal::new(0.0, scenario.config.sensor_noise.max(0.0)).ok();
        let fine = Duration::minutes(5);
        let ticks = scenario.config.frames.saturating_sub(1) * 3;
        for tick in 0..=ticks {
            let time = scenario.config.start + fine * tick as i32;
            let truth = scenario.truth(time);
            let readings = cells
                .iter()
                .map(|&cell| {
                    let jitter = noise.as_ref().map(|n| n.sample(&mut rng)).unwrap_or(0.0);
                    (truth[cell] + jitter).clamp(0.0, 1.2)
                })
                .collect();
            sensors.insert(time, readings);
        }
        scenario.sensors = sensors;

        Ok(scenario)
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// The true clear-sky index at `time`: the start pattern carried by the wind.
    pub fn truth(&self, time: DateTime<Utc>) -> ScalarField {
        let elapsed = (time - self.config.start).num_milliseconds() as f64 / 1000.0;
        let shift = DVec2::new(
            self.config.wind_u * elapsed / self.config.dx,
            self.config.wind_v * elapsed / self.config.dy,
        );
        let (rows, cols) = self.grid.shape();
        let values: Vec<f64> = (0..rows * cols)
            .into_par_iter()
            .map(|i| {
                let pos = DVec2::new((i % cols) as f64, (i / cols) as f64) - shift;
                clear_sky_index(pos, &self.config.clouds)
            })
            .collect();
        Array2::from_shape_vec((rows, cols), values).unwrap_or_else(|_| self.grid.filled(1.0))
    }

    pub fn satellite(&self) -> &MemorySatellite {
        &self.satellite
    }

    pub fn sensors(&self) -> &MemorySensors {
        &self.sensors
    }

    /// Bundles the scenario's data with a sun model.
    pub fn sources<'a>(&'a self, sun: &'a dyn SolarPosition) -> Sources<'a> {
        Sources {
            satellite: &self.satellite,
            wind: &self.wind,
            sensors: &self.sensors,
            sun,
        }
    }
}
