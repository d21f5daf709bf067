//! Data collaborators consumed by the driver.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::grid::{LatLonAxes, ScalarField, WindField};
use crate::observation::SensorLocation;
use crate::parallax::ViewAngles;

/// Gridded satellite clear-sky index frames.
pub trait SatelliteSource: Send + Sync {
    /// Geographic axes shared by every frame.
    fn axes(&self) -> &LatLonAxes;

    /// Instants with a frame, ascending.
    fn frame_times(&self) -> Vec<DateTime<Utc>>;

    /// Frame at exactly `time`.
    fn frame(&self, time: DateTime<Utc>) -> Option<ScalarField>;
}

/// Gridded wind.
pub trait WindSource: Send + Sync {
    /// Latest wind frame valid at or before `time`.
    fn wind_at(&self, time: DateTime<Utc>) -> Option<WindField>;
}

/// Point sensors and their readings.
pub trait SensorSource: Send + Sync {
    fn sensors(&self) -> &[SensorLocation];

    /// One reading per sensor at exactly `time`, in [`SensorSource::sensors`] order.
    fn observations(&self, time: DateTime<Utc>) -> Option<Vec<f64>>;
}

/// Sun position as seen from the site.
pub trait SolarPosition: Send + Sync {
    fn solar_position(&self, time: DateTime<Utc>) -> ViewAngles;
}

/// Borrowed bundle of every collaborator the driver needs.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub satellite: &'a dyn SatelliteSource,
    pub wind: &'a dyn WindSource,
    pub sensors: &'a dyn SensorSource,
    pub sun: &'a dyn SolarPosition,
}

/// Satellite frames held in memory.
#[derive(Debug, Clone)]
pub struct MemorySatellite {
    axes: LatLonAxes,
    frames: BTreeMap<DateTime<Utc>, ScalarField>,
}

impl MemorySatellite {
    pub fn new(axes: LatLonAxes) -> Self {
        Self {
            axes,
            frames: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, time: DateTime<Utc>, frame: ScalarField) -> &mut Self {
        self.frames.insert(time, frame);
        self
    }
}

impl SatelliteSource for MemorySatellite {
    fn axes(&self) -> &LatLonAxes {
        &self.axes
    }

    fn frame_times(&self) -> Vec<DateTime<Utc>> {
        self.frames.keys().copied().collect()
    }

    fn frame(&self, time: DateTime<Utc>) -> Option<ScalarField> {
        self.frames.get(&time).cloned()
    }
}

/// Wind frames held in memory, each valid until the next one.
#[derive(Debug, Clone, Default)]
pub struct MemoryWind {
    frames: BTreeMap<DateTime<Utc>, WindField>,
}

impl MemoryWind {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, time: DateTime<Utc>, wind: WindField) -> &mut Self {
        self.frames.insert(time, wind);
        self
    }
}

impl WindSource for MemoryWind {
    fn wind_at(&self, time: DateTime<Utc>) -> Option<WindField> {
        self.frames.range(..=time).next_back().map(|(_, w)| w.clone())
    }
}

/// Sensor table and readings held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySensors {
    sensors: Vec<SensorLocation>,
    readings: BTreeMap<DateTime<Utc>, Vec<f64>>,
}

impl MemorySensors {
    pub fn new(sensors: Vec<SensorLocation>) -> Self {
        Self {
            sensors,
            readings: BTreeMap::new(),
        }
    }

    /// Records readings at `time`; must hold one value per sensor.
    pub fn insert(&mut self, time: DateTime<Utc>, values: Vec<f64>) -> &mut Self {
        debug_assert_eq!(values.len(), self.sensors.len());
        self.readings.insert(time, values);
        self
    }
}

impl SensorSource for MemorySensors {
    fn sensors(&self) -> &[SensorLocation] {
        &self.sensors
    }

    fn observations(&self, time: DateTime<Utc>) -> Option<Vec<f64>> {
        self.readings.get(&time).cloned()
    }
}

/// Sun that never moves.
#[derive(Debug, Clone, Copy)]
pub struct FixedSun(pub ViewAngles);

impl SolarPosition for FixedSun {
    fn solar_position(&self, _time: DateTime<Utc>) -> ViewAngles {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use chrono::TimeZone;

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 4, 15, 19, minute, 0).unwrap()
    }

    #[test]
    fn test_wind_holds_latest_before() {
        let grid = Grid::new(5, 5, 250.0, 250.0).unwrap();
        let mut wind = MemoryWind::new();
        wind.insert(t(0), WindField::uniform(&grid, 1.0, 0.0))
            .insert(t(30), WindField::uniform(&grid, 2.0, 0.0));

        assert!(wind.wind_at(t(0) - chrono::Duration::seconds(1)).is_none());
        assert_eq!(wind.wind_at(t(0)).unwrap().u[[0, 0]], 1.0);
        assert_eq!(wind.wind_at(t(29)).unwrap().u[[0, 0]], 1.0);
        assert_eq!(wind.wind_at(t(45)).unwrap().u[[0, 0]], 2.0);
    }

    #[test]
    fn test_satellite_and_sensor_exact_lookup() {
        let grid = Grid::new(5, 5, 250.0, 250.0).unwrap();
        let mut sat = MemorySatellite::new(LatLonAxes::regular(&grid, 32.0, -111.0, 0.01, 0.01));
        sat.insert(t(15), grid.filled(0.5)).insert(t(0), grid.filled(0.4));
        assert_eq!(sat.frame_times(), vec![t(0), t(15)]);
        assert!(sat.frame(t(5)).is_none());

        let mut sensors = MemorySensors::new(vec![SensorLocation::new("a", 32.0, -111.0)]);
        sensors.insert(t(5), vec![0.7]);
        assert_eq!(sensors.observations(t(5)), Some(vec![0.7]));
        assert_eq!(sensors.observations(t(10)), None);
    }
}
