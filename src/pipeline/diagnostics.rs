//! Parallax diagnostics: how well shifted satellite pixels match sensors.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::sources::{SatelliteSource, SensorSource, SolarPosition};
use super::PipelineError;
use crate::observation::{sensor_error, ObservationMapper};
use crate::parallax::{CellShift, ParallaxConfig, ParallaxCorrector};

/// Per-frame comparison of parallax-shifted satellite pixels with sensors.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallaxDiagnostic {
    pub time: DateTime<Utc>,
    /// Satellite value minus sensor reading, in sensor order.
    pub errors: Vec<f64>,
    /// Latitude correction (degrees).
    pub d_lat: f64,
    /// Longitude correction (degrees).
    pub d_lon: f64,
    pub cells: CellShift,
}

impl ParallaxDiagnostic {
    /// Root-mean-square of the errors.
    pub fn rmse(&self) -> f64 {
        if self.errors.is_empty() {
            return 0.0;
        }
        (self.errors.iter().map(|e| e * e).sum::<f64>() / self.errors.len() as f64).sqrt()
    }
}

/// Compares every satellite frame in `[start, end]` against same-instant sensor
/// readings after parallax correction. Frames without readings are skipped.
pub fn parallax_diagnostics(
    satellite: &dyn SatelliteSource,
    sensors: &dyn SensorSource,
    sun: &dyn SolarPosition,
    parallax: &ParallaxConfig,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<ParallaxDiagnostic>, PipelineError> {
    let axes = satellite.axes();
    let mapper = ObservationMapper::from_axes(axes, sensors.sensors())?;
    let corrector = ParallaxCorrector::new(parallax.clone(), axes)?;

    let mut out = Vec::new();
    for time in satellite.frame_times().into_iter().filter(|t| *t >= start && *t <= end) {
        let Some(readings) = sensors.observations(time) else {
            warn!(%time, "no sensor readings for frame");
            continue;
        };
        let frame = satellite.frame(time).ok_or(PipelineError::MissingFrame(time))?;

        let angles = sun.solar_position(time);
        let (d_lat, d_lon) = corrector.degree_shift(angles)?;
        let cells = corrector.cell_shift(angles)?;
        let indices = mapper.shifted(cells.flat_offset(axes.lons().len()))?;
        let errors = sensor_error(&frame, &indices, &readings)?;

        out.push(ParallaxDiagnostic {
            time,
            errors,
            d_lat,
            d_lon,
            cells,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Grid, LatLonAxes};
    use crate::observation::SensorLocation;
    use crate::parallax::ViewAngles;
    use crate::pipeline::{FixedSun, MemorySatellite, MemorySensors};
    use chrono::{Duration, TimeZone};
    use ndarray::Array2;

    #[test]
    fn test_diagnostics_without_parallax() {
        let grid = Grid::new(6, 6, 250.0, 250.0).unwrap();
        let axes = LatLonAxes::regular(&grid, 32.0, -111.0, 0.01, 0.01);
        let t0 = Utc.with_ymd_and_hms(2014, 4, 15, 19, 0, 0).unwrap();
        let field = Array2::from_shape_fn(grid.shape(), |(r, c)| 0.1 * r as f64 + 0.01 * c as f64);

        let mut satellite = MemorySatellite::new(axes);
        satellite
            .insert(t0, field.clone())
            .insert(t0 + Duration::minutes(15), field.clone());
        let mut sensors = MemorySensors::new(vec![
            SensorLocation::new("a", 32.01, -110.99),
            SensorLocation::new("b", 32.03, -110.96),
        ]);
        sensors.insert(t0, vec![0.1, 0.3]);

        let report = parallax_diagnostics(
            &satellite,
            &sensors,
            &FixedSun(ViewAngles::new(180.0, 60.0)),
            &ParallaxConfig::disabled(),
            t0,
            t0 + Duration::hours(1),
        )
        .unwrap();

        assert_eq!(report.len(), 1);
        let d = &report[0];
        assert_eq!(d.cells, CellShift::default());
        assert_eq!(d.d_lat, 0.0);
        assert!((d.errors[0] - 0.01).abs() < 1e-12);
        assert!((d.errors[1] - 0.04).abs() < 1e-12);
        assert!((d.rmse() - ((0.01f64.powi(2) + 0.04f64.powi(2)) / 2.0).sqrt()).abs() < 1e-12);
    }
}
