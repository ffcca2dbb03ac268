//! Sink fan-out
//!
//! [`SinkSet`] owns one task per sink, forwards every sample to each of them
//! without waiting, and stops them all within a shared deadline.

use std::time::Duration;

use mottag_common::{Error, SimConfig, SinkMode};
use mottag_sim::{SampleDispatch, TickSample};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::task::{SinkReport, SinkTask, Task, TaskHandle};
use crate::trail::TrailHandle;
use crate::{ConsoleSink, DocumentStoreSink, Sink, TopicSink, TrailSink};

/// Default time allowed for sinks to drain and close on shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(5000);

/// Drops are logged on the first occurrence and then every this many.
const DROP_LOG_EVERY: u64 = 100;

struct SinkEntry {
    name: String,
    handle: TaskHandle<TickSample>,
    join: JoinHandle<SinkReport>,
    drops: u64,
}

/// How a sink task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkExit {
    /// Drained its queue and closed
    Stopped {
        /// Delivery counters
        report: SinkReport,
        /// Samples dropped because the queue was full or closed
        drops: u64,
    },
    /// Did not finish within the grace period and was aborted
    TimedOut {
        /// Sink name
        name: String,
    },
    /// The task panicked
    Panicked {
        /// Sink name
        name: String,
    },
}

impl SinkExit {
    /// Sink name
    pub fn name(&self) -> &str {
        match self {
            SinkExit::Stopped { report, .. } => &report.name,
            SinkExit::TimedOut { name } | SinkExit::Panicked { name } => name,
        }
    }

    /// True when the sink stopped on its own
    pub fn is_clean(&self) -> bool {
        matches!(self, SinkExit::Stopped { .. })
    }
}

/// Fan-out dispatcher over a set of sink tasks.
#[derive(Default)]
pub struct SinkSet {
    entries: Vec<SinkEntry>,
}

impl SinkSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns the sinks a configuration selects.
    ///
    /// The network transport follows `sink.mode`; the console sink is added
    /// when `sink.console` is set and the trail sink when `trail > 0`. The
    /// trail handle is returned so the caller can read the history.
    pub fn from_config(config: &SimConfig) -> Result<(Self, Option<TrailHandle>), Error> {
        let capacity = config.sink.queue_capacity;
        let mut set = Self::new();

        match config.sink.mode {
            SinkMode::None => {}
            SinkMode::DocumentStore => {
                let store = config.sink.document_store.as_ref().ok_or_else(|| {
                    Error::Config("document_store mode requires base_url and device_id".into())
                })?;
                set.spawn(DocumentStoreSink::new(store)?, capacity);
            }
            SinkMode::Topic => {
                let topic = config.sink.topic.as_ref().ok_or_else(|| {
                    Error::Config("topic mode requires broker settings and tag_addr".into())
                })?;
                set.spawn(TopicSink::new(topic), capacity);
            }
        }

        if config.sink.console {
            set.spawn(ConsoleSink::stdout(), capacity);
        }

        let trail = (config.trail > 0).then(|| {
            let sink = TrailSink::new(config.trail);
            let handle = sink.handle();
            set.spawn(sink, capacity);
            handle
        });

        info!(
            "Sinks selected: mode={} [{}]",
            config.sink.mode,
            set.names().join(", ")
        );
        Ok((set, trail))
    }

    /// Spawns `sink` on its own task behind a queue of `capacity` samples.
    pub fn spawn<S: Sink>(&mut self, sink: S, capacity: usize) {
        self.spawn_boxed(Box::new(sink), capacity);
    }

    /// Same as [`spawn`](Self::spawn) for an already boxed sink.
    pub fn spawn_boxed(&mut self, sink: Box<dyn Sink>, capacity: usize) {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let mut task = SinkTask::new(sink);
        let join = tokio::spawn(async move {
            task.run(rx).await;
            task.into_report()
        });
        debug!("Spawned sink task {} (queue {})", name, capacity);
        self.entries.push(SinkEntry {
            name,
            handle: TaskHandle::new(tx),
            join,
            drops: 0,
        });
    }

    /// Number of sinks
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no sink is attached
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sink names in spawn order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    /// Total samples dropped so far across all sinks
    pub fn total_drops(&self) -> u64 {
        self.entries.iter().map(|e| e.drops).sum()
    }

    /// Stops every sink.
    ///
    /// Each task receives a shutdown message after its queued samples and is
    /// awaited against one deadline shared by all sinks; tasks still running
    /// at the deadline are aborted.
    pub async fn shutdown(self, grace: Duration) -> Vec<SinkExit> {
        let deadline = tokio::time::Instant::now() + grace;

        for entry in &self.entries {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if tokio::time::timeout(remaining, entry.handle.shutdown())
                .await
                .is_err()
            {
                warn!("Sink {} queue still full at shutdown", entry.name);
            }
        }

        let mut exits = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            let SinkEntry {
                name,
                handle,
                mut join,
                drops,
            } = entry;
            drop(handle);

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            let exit = match tokio::time::timeout(remaining, &mut join).await {
                Ok(Ok(report)) => SinkExit::Stopped { report, drops },
                Ok(Err(_join_error)) => SinkExit::Panicked { name },
                Err(_timeout) => {
                    join.abort();
                    SinkExit::TimedOut { name }
                }
            };
            match &exit {
                SinkExit::Stopped { .. } => {}
                SinkExit::TimedOut { name } => {
                    warn!("Sink {} did not stop within {:?}, aborted", name, grace)
                }
                SinkExit::Panicked { name } => warn!("Sink {} panicked", name),
            }
            exits.push(exit);
        }

        info!("All sinks stopped");
        exits
    }
}

impl SampleDispatch for SinkSet {
    fn dispatch(&mut self, sample: &TickSample) -> usize {
        let mut dropped = 0;
        for entry in &mut self.entries {
            match entry.handle.try_send(sample.clone()) {
                Ok(()) => {}
                Err(e) => {
                    entry.drops += 1;
                    dropped += 1;
                    if entry.drops == 1 || entry.drops % DROP_LOG_EVERY == 0 {
                        let reason = match e {
                            TrySendError::Full(_) => "queue full",
                            TrySendError::Closed(_) => "task gone",
                        };
                        warn!(
                            sink = %entry.name,
                            tick = sample.tick.value(),
                            drops = entry.drops,
                            "Dropped sample: {}",
                            reason
                        );
                    }
                }
            }
        }
        dropped
    }
}
