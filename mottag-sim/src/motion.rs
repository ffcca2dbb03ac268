//! Target motion model
//!
//! A damped random walk on velocity (Ornstein-Uhlenbeck style) whose
//! magnitude is pinned to the nominal speed, integrated into a position that
//! bounces off the walls of the antenna rectangle.

use mottag_common::{SimConfig, MIN_TICK_INTERVAL_S};
use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Point2};
use crate::rng::SimRng;

/// Velocity damping factor applied every step.
pub const DRAG: f64 = 0.15;

/// Acceleration standard deviation per unit of nominal speed.
pub const ACCEL_STD_PER_SPEED: f64 = 3.0;

/// Speeds at or below this are left alone by renormalization.
pub const SPEED_EPSILON: f64 = 1e-6;

/// Position and velocity of the simulated target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetState {
    /// Position
    pub position: Point2,
    /// Velocity (units/s)
    pub velocity: Point2,
}

impl TargetState {
    /// Target resting at `position`.
    pub fn at_rest(position: Point2) -> Self {
        Self {
            position,
            velocity: Point2::zero(),
        }
    }
}

/// Parameters of the motion process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    /// Nominal speed the velocity is renormalized to
    pub nominal_speed: f64,
    /// Standard deviation of the random acceleration
    pub accel_std: f64,
    /// Velocity damping factor
    pub drag: f64,
    /// Time step in seconds (> 0)
    pub dt: f64,
}

impl MotionParams {
    /// Parameters for a given speed and tick interval.
    ///
    /// `dt` values that are not positive are replaced by
    /// [`MIN_TICK_INTERVAL_S`].
    pub fn new(nominal_speed: f64, dt: f64) -> Self {
        Self {
            nominal_speed,
            accel_std: nominal_speed * ACCEL_STD_PER_SPEED,
            drag: DRAG,
            dt: dt.max(MIN_TICK_INTERVAL_S),
        }
    }

    /// Parameters derived from the run configuration.
    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.speed, config.tick_interval_s())
    }
}

/// Damped random-walk velocity update: `v' = (1 - drag) * v + a * dt`.
pub fn smooth_velocity(velocity: Point2, params: &MotionParams, rng: &mut SimRng) -> Point2 {
    let ax = rng.gaussian(0.0, params.accel_std);
    let ay = rng.gaussian(0.0, params.accel_std);
    velocity * (1.0 - params.drag) + Point2::new(ax, ay) * params.dt
}

/// Rescales `velocity` to exactly `speed` unless it is (near) zero.
pub fn renormalize_speed(velocity: Point2, speed: f64) -> Point2 {
    let magnitude = velocity.magnitude();
    if magnitude > SPEED_EPSILON {
        velocity * (speed / magnitude)
    } else {
        velocity
    }
}

/// Advances `state` by one time step inside `bounds`.
///
/// Never fails for finite input; the result always lies within `bounds`.
pub fn step(
    state: TargetState,
    bounds: &Bounds,
    params: &MotionParams,
    rng: &mut SimRng,
) -> TargetState {
    let velocity = smooth_velocity(state.velocity, params, rng);
    let velocity = renormalize_speed(velocity, params.nominal_speed);
    let position = state.position + velocity * params.dt;
    let (position, velocity) = bounds.reflect(position, velocity);
    TargetState { position, velocity }
}

/// Owner of the target state.
///
/// Only [`MotionModel::step`] mutates the state.
#[derive(Debug, Clone)]
pub struct MotionModel {
    bounds: Bounds,
    params: MotionParams,
    state: TargetState,
}

impl MotionModel {
    /// Creates a model starting from `initial`, clamped into `bounds`.
    pub fn new(bounds: Bounds, params: MotionParams, initial: TargetState) -> Self {
        let (position, velocity) = bounds.reflect(initial.position, initial.velocity);
        Self {
            bounds,
            params,
            state: TargetState { position, velocity },
        }
    }

    /// Current target state
    pub fn state(&self) -> TargetState {
        self.state
    }

    /// Motion boundary
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Motion parameters
    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    /// Advances one tick and returns the new state.
    pub fn step(&mut self, rng: &mut SimRng) -> TargetState {
        self.state = step(self.state, &self.bounds, &self.params, rng);
        self.state
    }
}
