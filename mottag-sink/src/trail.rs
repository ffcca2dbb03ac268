//! Visualization trail sink
//!
//! Keeps the most recent true and estimated positions in two bounded
//! histories. A [`TrailHandle`] lets a renderer or a test read them while the
//! sink itself lives on its task.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use mottag_common::Error;
use mottag_sim::{Point2, TickSample};
use serde::Serialize;
use tracing::debug;

use crate::Sink;

#[derive(Debug)]
struct TrailHistory {
    capacity: usize,
    true_positions: VecDeque<Point2>,
    estimated_positions: VecDeque<Point2>,
    last_tick: Option<u64>,
}

impl TrailHistory {
    fn push(&mut self, sample: &TickSample) {
        if self.true_positions.len() == self.capacity {
            self.true_positions.pop_front();
            self.estimated_positions.pop_front();
        }
        self.true_positions.push_back(sample.true_position);
        self.estimated_positions.push_back(sample.estimated_position);
        self.last_tick = Some(sample.tick.value());
    }
}

/// Copy of the trail at one point in time, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrailSnapshot {
    /// True positions
    pub true_positions: Vec<Point2>,
    /// Estimated positions
    pub estimated_positions: Vec<Point2>,
    /// Tick of the newest entry
    pub last_tick: Option<u64>,
}

impl TrailSnapshot {
    /// Number of entries
    pub fn len(&self) -> usize {
        self.true_positions.len()
    }

    /// True when nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.true_positions.is_empty()
    }

    /// Mean distance between true and estimated positions.
    pub fn mean_error(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let total: f64 = self
            .true_positions
            .iter()
            .zip(&self.estimated_positions)
            .map(|(t, e)| t.distance_to(e))
            .sum();
        Some(total / self.len() as f64)
    }
}

/// Read access to a [`TrailSink`]'s history.
#[derive(Debug, Clone)]
pub struct TrailHandle {
    history: Arc<Mutex<TrailHistory>>,
}

impl TrailHandle {
    fn lock(&self) -> MutexGuard<'_, TrailHistory> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Copies the current history.
    pub fn snapshot(&self) -> TrailSnapshot {
        let history = self.lock();
        TrailSnapshot {
            true_positions: history.true_positions.iter().copied().collect(),
            estimated_positions: history.estimated_positions.iter().copied().collect(),
            last_tick: history.last_tick,
        }
    }

    /// Maximum number of entries kept
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }
}

/// Sink that records a bounded position trail.
#[derive(Debug)]
pub struct TrailSink {
    handle: TrailHandle,
}

impl TrailSink {
    /// Creates a trail keeping at most `capacity` entries (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let history = TrailHistory {
            capacity,
            true_positions: VecDeque::with_capacity(capacity),
            estimated_positions: VecDeque::with_capacity(capacity),
            last_tick: None,
        };
        Self {
            handle: TrailHandle {
                history: Arc::new(Mutex::new(history)),
            },
        }
    }

    /// Handle that stays valid after the sink moves to its task.
    pub fn handle(&self) -> TrailHandle {
        self.handle.clone()
    }
}

#[async_trait]
impl Sink for TrailSink {
    fn name(&self) -> &str {
        "trail"
    }

    async fn publish(&mut self, sample: &TickSample) -> Result<(), Error> {
        let mut history = self.handle.lock();
        history.push(sample);
        debug!(
            tick = sample.tick.value(),
            len = history.true_positions.len(),
            "trail updated"
        );
        Ok(())
    }
}
