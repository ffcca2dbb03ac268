//! Tick numbering and pacing for the simulation loop

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

/// Zero-based index of a simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationTick(u64);

impl SimulationTick {
    /// Wraps a raw tick index
    pub const fn new(tick: u64) -> Self {
        Self(tick)
    }

    /// Raw tick index
    pub const fn value(self) -> u64 {
        self.0
    }

    /// True for the very first step of a run
    pub const fn is_first(self) -> bool {
        self.0 == 0
    }

    fn successor(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for SimulationTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for SimulationTick {
    fn from(tick: u64) -> Self {
        Self(tick)
    }
}

/// When ticks are due and when the run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSchedule {
    /// Spacing between consecutive tick deadlines
    pub interval: Duration,
    /// Stop after this many ticks; `None` runs until cancelled
    pub limit: Option<u64>,
    /// Wait for wall-clock deadlines; when false ticks run back to back
    pub paced: bool,
}

impl TickSchedule {
    /// Builds a schedule
    pub fn new(interval: Duration, limit: Option<u64>, paced: bool) -> Self {
        Self {
            interval,
            limit,
            paced,
        }
    }

    /// Offset of `tick`'s deadline from the start of the run
    pub fn deadline_offset(&self, tick: SimulationTick) -> Duration {
        const NANOS_PER_SEC: u128 = 1_000_000_000;
        let nanos = self
            .interval
            .as_nanos()
            .saturating_mul(u128::from(tick.value()));
        let secs = u64::try_from(nanos / NANOS_PER_SEC).unwrap_or(u64::MAX);
        // remainder is below one second, so it fits and never carries
        Duration::new(secs, (nanos % NANOS_PER_SEC) as u32)
    }
}

/// Hands out tick numbers and says how long to sleep before the next one.
///
/// Deadlines are anchored to the run start, so time spent inside a tick
/// shortens the following wait instead of pushing every later tick back.
#[derive(Debug)]
pub struct TickPacer {
    schedule: TickSchedule,
    upcoming: SimulationTick,
    epoch: Instant,
}

impl TickPacer {
    /// Starts a pacer at tick 0
    pub fn new(schedule: TickSchedule) -> Self {
        Self {
            schedule,
            upcoming: SimulationTick::new(0),
            epoch: Instant::now(),
        }
    }

    /// Schedule in use
    pub fn schedule(&self) -> &TickSchedule {
        &self.schedule
    }

    /// Tick that the next call to [`TickPacer::advance`] returns
    pub fn upcoming(&self) -> SimulationTick {
        self.upcoming
    }

    /// Issues the upcoming tick and moves past it
    pub fn advance(&mut self) -> SimulationTick {
        let issued = self.upcoming;
        self.upcoming = issued.successor();
        issued
    }

    /// True once the tick limit has been issued
    pub fn is_complete(&self) -> bool {
        self.schedule
            .limit
            .is_some_and(|limit| self.upcoming.value() >= limit)
    }

    /// Re-anchors deadlines at the current instant
    pub fn restart_epoch(&mut self) {
        self.epoch = Instant::now();
    }

    /// Time left until the upcoming tick is due; zero when unpaced or late
    pub fn delay(&self) -> Duration {
        if !self.schedule.paced {
            return Duration::ZERO;
        }
        self.schedule
            .deadline_offset(self.upcoming)
            .saturating_sub(self.epoch.elapsed())
    }
}
