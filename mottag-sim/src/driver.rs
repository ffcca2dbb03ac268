//! Tick driver
//!
//! Sequences one simulation step (motion, observation, estimation) and runs
//! the paced loop that hands every sample to the sinks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use mottag_common::{Error, SimConfig, SimulationTick, TickPacer, TickSchedule, ANTENNA_COUNT};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, trace};

use crate::center4::{Center4Config, Center4Estimator, PositionEstimator};
use crate::geometry::{Antenna, Bounds, Point2};
use crate::motion::{MotionModel, MotionParams, TargetState};
use crate::observation::{observe_all, ObservationVector, PathLossModel};
use crate::rng::SimRng;

/// Source of per-tick timestamps (Unix milliseconds).
pub trait Clock: Send {
    /// Current time in milliseconds
    fn now_ms(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that advances a fixed step on every read.
#[derive(Debug)]
pub struct ManualClock {
    next_ms: AtomicU64,
    step_ms: u64,
}

impl ManualClock {
    /// First read returns `start_ms`, each later read adds `step_ms`.
    pub fn new(start_ms: u64, step_ms: u64) -> Self {
        Self {
            next_ms: AtomicU64::new(start_ms),
            step_ms,
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.next_ms.fetch_add(self.step_ms, Ordering::Relaxed)
    }
}

/// Everything one tick produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickSample {
    /// Tick number, starting at 0
    pub tick: SimulationTick,
    /// Unix timestamp in milliseconds
    pub timestamp_ms: u64,
    /// True target position
    pub true_position: Point2,
    /// True target velocity
    pub true_velocity: Point2,
    /// Estimated position
    pub estimated_position: Point2,
    /// Readings, indexed like the antennas
    pub readings: ObservationVector,
}

impl TickSample {
    /// Distance between estimate and truth
    pub fn position_error(&self) -> f64 {
        self.true_position.distance_to(&self.estimated_position)
    }
}

/// Receives samples from the run loop.
///
/// Implementations must not block: the loop calls this once per tick and
/// does not wait for delivery.
pub trait SampleDispatch {
    /// Hands over a sample; returns how many receivers dropped it.
    fn dispatch(&mut self, sample: &TickSample) -> usize;
}

/// Outcome of [`TickDriver::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Ticks produced
    pub ticks: u64,
    /// Deliveries dropped by full or closed sinks
    pub sink_drops: u64,
    /// True when the loop stopped on the cancellation token
    pub cancelled: bool,
}

/// Owns the simulation state and produces one [`TickSample`] per tick.
pub struct TickDriver {
    antennas: [Antenna; ANTENNA_COUNT],
    motion: MotionModel,
    path_loss: PathLossModel,
    estimator: Box<dyn PositionEstimator>,
    rng: SimRng,
    clock: Box<dyn Clock>,
    pacer: TickPacer,
}

impl std::fmt::Debug for TickDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickDriver")
            .field("antennas", &self.antennas)
            .field("state", &self.motion.state())
            .field("estimator", &self.estimator.name())
            .field("seed", &self.rng.seed())
            .field("tick", &self.pacer.upcoming())
            .finish()
    }
}

impl TickDriver {
    /// Builds a driver from a validated configuration.
    ///
    /// The target starts at rest at the centroid of the antennas.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the configuration is invalid.
    pub fn new(config: &SimConfig, rng: SimRng) -> Result<Self, Error> {
        config.validate()?;

        let mut antennas = [Antenna::new(0, Point2::zero()); ANTENNA_COUNT];
        for (i, (slot, coords)) in antennas.iter_mut().zip(config.antennas.iter()).enumerate() {
            *slot = Antenna::new(i, Point2::from(*coords));
        }

        let bounds = Bounds::from_antennas(&antennas)?;
        let start = Point2::centroid(antennas.iter().map(|a| &a.position))
            .unwrap_or_else(|| bounds.center());
        let motion = MotionModel::new(
            bounds,
            MotionParams::from_config(config),
            TargetState::at_rest(start),
        );

        let pacer = TickPacer::new(TickSchedule::new(
            config.tick_interval(),
            config.max_ticks,
            config.real_time,
        ));

        if bounds.is_degenerate() {
            debug!("Antenna rectangle is degenerate: {:?}", bounds);
        }

        Ok(Self {
            antennas,
            motion,
            path_loss: PathLossModel::from_config(config),
            estimator: Box::new(Center4Estimator::new(Center4Config {
                threshold: config.threshold,
            })),
            rng,
            clock: Box::new(SystemClock),
            pacer,
        })
    }

    /// Replaces the timestamp source.
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the position estimator.
    pub fn with_estimator(mut self, estimator: Box<dyn PositionEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Configured antennas
    pub fn antennas(&self) -> &[Antenna; ANTENNA_COUNT] {
        &self.antennas
    }

    /// Motion boundary
    pub fn bounds(&self) -> &Bounds {
        self.motion.bounds()
    }

    /// Current target state
    pub fn state(&self) -> TargetState {
        self.motion.state()
    }

    /// Next tick to be produced
    pub fn current_tick(&self) -> SimulationTick {
        self.pacer.upcoming()
    }

    /// Seed of the random source
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Runs one tick: motion step, one reading per antenna, estimate.
    pub fn tick(&mut self) -> Result<TickSample, Error> {
        let state = self.motion.step(&mut self.rng);
        let readings = observe_all(state.position, &self.antennas, &self.path_loss, &mut self.rng);
        let positions = self.antennas.map(|a| a.position);
        let estimated_position = self.estimator.estimate(&positions, readings.as_slice())?;

        let tick = self.pacer.advance();

        debug!(
            tick = tick.value(),
            true_x = state.position.x,
            true_y = state.position.y,
            est_x = estimated_position.x,
            est_y = estimated_position.y,
            "tick"
        );
        trace!(tick = tick.value(), readings = %readings, "observations");

        Ok(TickSample {
            tick,
            timestamp_ms: self.clock.now_ms(),
            true_position: state.position,
            true_velocity: state.velocity,
            estimated_position,
            readings,
        })
    }

    /// Ticks until cancelled or until the configured tick limit.
    ///
    /// `shutdown` is checked at the top of every tick boundary and while
    /// waiting for the next one; a tick is never cut short. A dropped
    /// sender counts as cancellation.
    pub async fn run<D: SampleDispatch>(
        &mut self,
        dispatch: &mut D,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary, Error> {
        let mut summary = RunSummary::default();
        if self.pacer.upcoming().is_first() {
            self.pacer.restart_epoch();
        }

        info!(
            "Simulation started: estimator={} seed={} interval={:?}",
            self.estimator.name(),
            self.rng.seed(),
            self.pacer.schedule().interval
        );

        loop {
            if *shutdown.borrow() || shutdown.has_changed().is_err() {
                info!("Cancellation requested, stopping at tick boundary");
                summary.cancelled = true;
                break;
            }
            if self.pacer.is_complete() {
                info!("Tick limit reached");
                break;
            }

            let sample = self.tick()?;
            summary.ticks += 1;
            summary.sink_drops += dispatch.dispatch(&sample) as u64;

            let wait = self.pacer.delay();
            if wait.is_zero() {
                tokio::task::yield_now().await;
                continue;
            }
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        info!("Shutdown sender dropped, stopping");
                        summary.cancelled = true;
                        break;
                    }
                }
            }
        }

        info!(
            "Simulation stopped after {} ticks ({} sink drops)",
            summary.ticks, summary.sink_drops
        );
        Ok(summary)
    }
}
