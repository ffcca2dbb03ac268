//! Mock sink for integration testing
//!
//! Records every sample it receives and reports what happened through an
//! event channel. It can be told to fail on selected ticks or to stall.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mottag_common::Error;
use mottag_sim::TickSample;
use mottag_sink::Sink;
use tokio::sync::mpsc;

/// Events emitted by the mock sink
#[derive(Debug, Clone, PartialEq)]
pub enum MockSinkEvent {
    /// Sample accepted
    Published { tick: u64 },
    /// Sample rejected with a transport error
    Failed { tick: u64 },
    /// `close` was called
    Closed,
}

/// How the mock sink reacts to samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum MockSinkBehavior {
    /// Accept everything
    #[default]
    Accept,
    /// Fail every n-th tick (ticks where `tick % n == 0`)
    FailEvery(u64),
    /// Fail everything
    FailAll,
    /// Sleep this long on every publish
    Slow(Duration),
}

#[derive(Debug, Default)]
struct Recorded {
    samples: Vec<TickSample>,
    failures: u64,
    closed: bool,
}

/// Sink under test control.
pub struct MockSink {
    name: String,
    behavior: MockSinkBehavior,
    recorded: Arc<Mutex<Recorded>>,
    events: mpsc::UnboundedSender<MockSinkEvent>,
}

/// Read side of a [`MockSink`], kept by the test.
pub struct MockSinkRecorder {
    recorded: Arc<Mutex<Recorded>>,
    events: mpsc::UnboundedReceiver<MockSinkEvent>,
}

impl MockSink {
    /// Creates a sink accepting everything.
    pub fn new(name: &str) -> (Self, MockSinkRecorder) {
        Self::with_behavior(name, MockSinkBehavior::Accept)
    }

    /// Creates a sink with the given behavior.
    pub fn with_behavior(name: &str, behavior: MockSinkBehavior) -> (Self, MockSinkRecorder) {
        let recorded = Arc::new(Mutex::new(Recorded::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                name: name.to_string(),
                behavior,
                recorded: recorded.clone(),
                events: tx,
            },
            MockSinkRecorder {
                recorded,
                events: rx,
            },
        )
    }

    fn should_fail(&self, tick: u64) -> bool {
        match self.behavior {
            MockSinkBehavior::FailAll => true,
            MockSinkBehavior::FailEvery(n) if n > 0 => tick % n == 0,
            _ => false,
        }
    }
}

#[async_trait]
impl Sink for MockSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&mut self, sample: &TickSample) -> Result<(), Error> {
        let tick = sample.tick.value();
        if let MockSinkBehavior::Slow(delay) = self.behavior {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail(tick) {
            self.recorded.lock().unwrap().failures += 1;
            let _ = self.events.send(MockSinkEvent::Failed { tick });
            return Err(Error::SinkTransport(format!("mock failure at tick {tick}")));
        }
        self.recorded.lock().unwrap().samples.push(sample.clone());
        let _ = self.events.send(MockSinkEvent::Published { tick });
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Error> {
        self.recorded.lock().unwrap().closed = true;
        let _ = self.events.send(MockSinkEvent::Closed);
        Ok(())
    }
}

impl MockSinkRecorder {
    /// Samples accepted so far
    pub fn samples(&self) -> Vec<TickSample> {
        self.recorded.lock().unwrap().samples.clone()
    }

    /// Ticks accepted so far
    pub fn ticks(&self) -> Vec<u64> {
        self.recorded
            .lock()
            .unwrap()
            .samples
            .iter()
            .map(|s| s.tick.value())
            .collect()
    }

    /// Number of samples accepted
    pub fn published(&self) -> usize {
        self.recorded.lock().unwrap().samples.len()
    }

    /// Number of samples rejected
    pub fn failures(&self) -> u64 {
        self.recorded.lock().unwrap().failures
    }

    /// True once `close` ran
    pub fn is_closed(&self) -> bool {
        self.recorded.lock().unwrap().closed
    }

    /// Next event, or `None` once the sink is gone and the queue is empty.
    pub async fn next_event(&mut self) -> Option<MockSinkEvent> {
        self.events.recv().await
    }

    /// All events emitted so far without waiting.
    pub fn drain_events(&mut self) -> Vec<MockSinkEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mottag_common::SimulationTick;
    use mottag_sim::{ObservationVector, Point2};

    fn sample(tick: u64) -> TickSample {
        TickSample {
            tick: SimulationTick::new(tick),
            timestamp_ms: 0,
            true_position: Point2::zero(),
            true_velocity: Point2::zero(),
            estimated_position: Point2::zero(),
            readings: ObservationVector([-50.0; 4]),
        }
    }

    #[tokio::test]
    async fn test_fail_every() {
        let (mut sink, mut recorder) = MockSink::with_behavior("m", MockSinkBehavior::FailEvery(3));
        for tick in 0..6 {
            let _ = sink.publish(&sample(tick)).await;
        }
        sink.close().await.unwrap();

        assert_eq!(recorder.ticks(), vec![1, 2, 4, 5]);
        assert_eq!(recorder.failures(), 2);
        assert!(recorder.is_closed());
        assert_eq!(recorder.next_event().await, Some(MockSinkEvent::Failed { tick: 0 }));
        assert_eq!(recorder.drain_events().last(), Some(&MockSinkEvent::Closed));
    }
}
