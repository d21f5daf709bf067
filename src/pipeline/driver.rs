//! Coarse/fine cycling of advection and assimilation.

use chrono::{DateTime, Duration, Utc};
use ndarray::Array1;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use super::config::NowcastConfig;
use super::sources::Sources;
use super::trajectory::Trajectory;
use super::PipelineError;
use crate::advection::{advance_steps, SubstepPlan};
use crate::ensemble::Ensemble;
use crate::grid::{Grid, ScalarField, WindField};
use crate::letkf::{
    assimilate_global, assimilate_local, GridTriangulation, LocalizationGeometry, RInverse, SparseInterpolator,
};
use crate::mask;
use crate::observation::ObservationMapper;
use crate::parallax::ParallaxCorrector;

/// Result of a run: one field per fine instant in each trajectory.
#[derive(Debug, Clone)]
pub struct NowcastOutput {
    /// Ensemble mean after each assimilation.
    pub analysis: Trajectory,
    /// Ensemble mean after advection, before assimilation.
    pub background: Trajectory,
    /// Deterministic field advected without assimilation.
    pub advected: Trajectory,
    /// Fine instants from the first to the last coarse time.
    pub timestamps: Vec<DateTime<Utc>>,
}

/// Runs the nowcast over the satellite frames within the configured window.
pub struct SimulationDriver<'a> {
    sources: Sources<'a>,
    config: NowcastConfig,
    interpolator: Box<dyn SparseInterpolator + 'a>,
}

impl<'a> SimulationDriver<'a> {
    pub fn new(sources: Sources<'a>, config: NowcastConfig) -> Self {
        Self {
            sources,
            config,
            interpolator: Box::new(GridTriangulation),
        }
    }

    /// Replaces the weight interpolation backend.
    pub fn with_interpolator(mut self, interpolator: Box<dyn SparseInterpolator + 'a>) -> Self {
        self.interpolator = interpolator;
        self
    }

    pub fn config(&self) -> &NowcastConfig {
        &self.config
    }

    /// Satellite frame times on the coarse schedule between start and end.
    pub fn coarse_times(&self) -> Vec<DateTime<Utc>> {
        let available = self.sources.satellite.frame_times();
        let step = Duration::seconds(self.config.coarse_interval_s);
        let mut out = Vec::new();
        let mut t = self.config.start;
        while t <= self.config.end {
            if available.binary_search(&t).is_ok() {
                out.push(t);
            }
            t += step;
        }
        out
    }

    pub fn run(&self) -> Result<NowcastOutput, PipelineError> {
        self.run_with_callbacks(|_, _, _| {}, |_, _| {})
    }

    /// Runs with progress callbacks.
    ///
    /// # Arguments
    /// * `on_cycle_start` - Called with `(index, total, time)` before each coarse interval
    /// * `on_cycle_complete` - Called with `(index, total)` once its frame is assimilated
    ///
    /// # Returns
    /// The three trajectories and fine timestamps, or the first error hit. Sensor
    /// instants without readings, or with non-finite readings, are skipped.
    pub fn run_with_callbacks<F1, F2>(
        &self,
        mut on_cycle_start: F1,
        mut on_cycle_complete: F2,
    ) -> Result<NowcastOutput, PipelineError>
    where
        F1: FnMut(usize, usize, DateTime<Utc>),
        F2: FnMut(usize, usize),
    {
        self.config.validate()?;
        let coarse = self.coarse_times();
        if coarse.len() < 2 {
            return Err(PipelineError::InsufficientFrames(coarse.len()));
        }

        let axes = self.sources.satellite.axes();
        let grid = Grid::new(axes.lats().len(), axes.lons().len(), self.config.dx, self.config.dy)?;
        let mapper = ObservationMapper::from_axes(axes, self.sources.sensors.sensors())?;
        let corrector = ParallaxCorrector::new(self.config.parallax.clone(), axes)?;
        let geometry = self
            .config
            .letkf
            .localization
            .map(|loc| LocalizationGeometry::new(grid, loc.spacing, loc.radius));
        let template = mask::template(&grid, &self.config.mask);

        let mut q = self.frame(coarse[0], &grid)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut ensemble = Ensemble::perturbed(&q, grid, &self.config.ensemble, &mut rng)?;
        let mut noise = template.clone();

        let mut analysis = Trajectory::new(ensemble.scalar_mean());
        let mut background = Trajectory::new(ensemble.scalar_mean());
        let mut advected = Trajectory::new(q.clone());

        let fine = Duration::seconds(self.config.fine_interval_s);
        let total = coarse.len() - 1;
        info!(
            rows = grid.rows,
            cols = grid.cols,
            members = ensemble.members(),
            sensors = mapper.len(),
            cycles = total,
            "starting nowcast"
        );

        for (index, window) in coarse.windows(2).enumerate() {
            let (t0, t1) = (window[0], window[1]);
            on_cycle_start(index, total, t0);

            let wind = self.wind(t0, &grid)?;
            let plan = SubstepPlan::for_interval(
                self.config.fine_interval_s as f64,
                &wind,
                grid.dx,
                grid.dy,
                self.config.c_max,
            )?;
            let n_fine = ((t1 - t0).num_seconds() / self.config.fine_interval_s).max(0) as usize;
            info!(%t0, %t1, steps = plan.steps, dt = plan.dt, fine_ticks = n_fine, "coarse cycle");

            for n in 0..n_fine {
                let sensor_time = t0 + fine * (n as i32 + 1);

                q = advance_steps(q.view(), plan, &wind, grid.dx, grid.dy)?;
                noise = advance_steps(noise.view(), plan, &wind, grid.dx, grid.dy)?;
                ensemble.advect(plan, &wind)?;

                advected.record(q.clone());
                background.record(ensemble.scalar_mean());

                if !mapper.is_empty() {
                    ensemble = self.assimilate_sensors(ensemble, &mapper, &corrector, sensor_time)?;
                }

                if n + 1 < n_fine {
                    analysis.record(ensemble.scalar_mean());
                }
                debug!(%sensor_time, tick = n, "fine tick");
            }

            let frame = self.frame(t1, &grid)?;
            q = frame.clone();
            let blend = mask::normalize(&noise);
            ensemble.blend_toward(&frame, &blend)?;
            ensemble = self.assimilate_frame(ensemble, &frame, geometry.as_ref())?;
            analysis.record(ensemble.scalar_mean());
            noise = template.clone();

            on_cycle_complete(index, total);
        }

        let mut timestamps = Vec::new();
        let mut t = coarse[0];
        let last = coarse[coarse.len() - 1];
        while t <= last {
            timestamps.push(t);
            t += fine;
        }

        Ok(NowcastOutput {
            analysis,
            background,
            advected,
            timestamps,
        })
    }

    fn frame(&self, time: DateTime<Utc>, grid: &Grid) -> Result<ScalarField, PipelineError> {
        let frame = self
            .sources
            .satellite
            .frame(time)
            .ok_or(PipelineError::MissingFrame(time))?;
        grid.check_field("satellite frame", &frame)?;
        let count = frame.iter().filter(|v| !v.is_finite()).count();
        if count > 0 {
            return Err(PipelineError::NonFiniteFrame { time, count });
        }
        Ok(frame)
    }

    fn wind(&self, time: DateTime<Utc>, grid: &Grid) -> Result<WindField, PipelineError> {
        let wind = self
            .sources
            .wind
            .wind_at(time)
            .ok_or(PipelineError::MissingWind(time))?;
        wind.check_grid(grid)?;
        Ok(wind)
    }

    /// Global update of the whole state from parallax-shifted sensor cells.
    fn assimilate_sensors(
        &self,
        mut ensemble: Ensemble,
        mapper: &ObservationMapper,
        corrector: &ParallaxCorrector,
        time: DateTime<Utc>,
    ) -> Result<Ensemble, PipelineError> {
        let Some(readings) = self.sources.sensors.observations(time) else {
            warn!(%time, "no sensor readings, skipping point assimilation");
            return Ok(ensemble);
        };
        if readings.iter().any(|v| !v.is_finite()) {
            warn!(%time, "non-finite sensor reading, skipping point assimilation");
            return Ok(ensemble);
        }

        let sun = self.sources.sun.solar_position(time);
        let offset = corrector.flat_offset(sun)?;
        let rows: Vec<usize> = mapper
            .shifted(offset)?
            .into_iter()
            .map(|i| i + ensemble.wind_size())
            .collect();
        debug!(%time, offset, azimuth = sun.azimuth_deg, elevation = sun.elevation_deg, "sensor assimilation");

        let sigma = self.config.letkf.sensor_sigma;
        let updated = assimilate_global(
            ensemble.matrix().view(),
            Array1::from(readings).view(),
            &rows,
            &RInverse::Scalar(1.0 / (sigma * sigma)),
            self.config.letkf.inflation,
        )?;
        ensemble.replace_matrix(updated)?;
        Ok(ensemble)
    }

    /// Full-field update of the field rows against a satellite frame.
    fn assimilate_frame(
        &self,
        mut ensemble: Ensemble,
        frame: &ScalarField,
        geometry: Option<&LocalizationGeometry>,
    ) -> Result<Ensemble, PipelineError> {
        let sigma = self.config.letkf.sat_sigma;
        let r_inv = RInverse::Scalar(1.0 / (sigma * sigma));
        let inflation = self.config.letkf.inflation;
        let observations: Array1<f64> = frame.iter().copied().collect();

        let updated = match geometry {
            Some(geometry) => assimilate_local(
                ensemble.scalar_rows(),
                observations.view(),
                &r_inv,
                inflation,
                geometry,
                self.interpolator.as_ref(),
            )?,
            None => {
                let rows: Vec<usize> = (0..observations.len()).collect();
                assimilate_global(ensemble.scalar_rows(), observations.view(), &rows, &r_inv, inflation)?
            }
        };
        ensemble.replace_scalar_rows(updated.view())?;
        Ok(ensemble)
    }
}
