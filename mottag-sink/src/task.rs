//! Sink task framework
//!
//! Each sink runs as an independent async actor fed by a bounded channel.
//! The channel carries [`TaskMessage`] envelopes so the owner can request a
//! graceful stop after the last sample.

use async_trait::async_trait;
use mottag_sim::TickSample;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::Sink;

/// Task message envelope wrapping typed messages with control signals.
#[derive(Debug)]
pub enum TaskMessage<T> {
    /// Regular message payload
    Message(T),
    /// Shutdown signal - task should terminate gracefully
    Shutdown,
}

impl<T> TaskMessage<T> {
    /// Returns true if this is a shutdown signal.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, TaskMessage::Shutdown)
    }

    /// Returns the message payload if present, or None for shutdown.
    pub fn into_message(self) -> Option<T> {
        match self {
            TaskMessage::Message(msg) => Some(msg),
            TaskMessage::Shutdown => None,
        }
    }
}

/// An async actor that processes messages from its receive channel.
#[async_trait]
pub trait Task: Send + 'static {
    /// The message type this task processes.
    type Message: Send;

    /// Runs the task's main loop until `TaskMessage::Shutdown` arrives or
    /// every sender is gone.
    async fn run(&mut self, rx: mpsc::Receiver<TaskMessage<Self::Message>>);
}

/// Handle for sending messages to a task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    tx: mpsc::Sender<TaskMessage<T>>,
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> TaskHandle<T> {
    /// Creates a new task handle from a sender.
    pub fn new(tx: mpsc::Sender<TaskMessage<T>>) -> Self {
        Self { tx }
    }

    /// Sends a message without waiting.
    ///
    /// Returns an error if the channel is full or the task has been dropped.
    pub fn try_send(&self, msg: T) -> Result<(), mpsc::error::TrySendError<TaskMessage<T>>> {
        self.tx.try_send(TaskMessage::Message(msg))
    }

    /// Sends a shutdown signal, waiting for queue space.
    pub async fn shutdown(&self) -> Result<(), mpsc::error::SendError<TaskMessage<T>>> {
        self.tx.send(TaskMessage::Shutdown).await
    }

    /// Returns true if the task channel is closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Delivery counters of one sink task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkReport {
    /// Sink name
    pub name: String,
    /// Samples delivered successfully
    pub published: u64,
    /// Samples the sink failed to deliver
    pub failed: u64,
}

/// Drives a [`Sink`] from a sample channel.
pub struct SinkTask {
    sink: Box<dyn Sink>,
    report: SinkReport,
}

impl SinkTask {
    /// Wraps a sink.
    pub fn new(sink: Box<dyn Sink>) -> Self {
        let report = SinkReport {
            name: sink.name().to_string(),
            ..SinkReport::default()
        };
        Self { sink, report }
    }

    /// Counters so far
    pub fn report(&self) -> &SinkReport {
        &self.report
    }

    /// Consumes the task, returning its counters.
    pub fn into_report(self) -> SinkReport {
        self.report
    }
}

#[async_trait]
impl Task for SinkTask {
    type Message = TickSample;

    async fn run(&mut self, mut rx: mpsc::Receiver<TaskMessage<TickSample>>) {
        debug!("Sink task {} started", self.report.name);

        while let Some(msg) = rx.recv().await {
            let Some(sample) = msg.into_message() else {
                break;
            };
            match self.sink.publish(&sample).await {
                Ok(()) => self.report.published += 1,
                Err(e) => {
                    self.report.failed += 1;
                    warn!(
                        sink = %self.report.name,
                        tick = sample.tick.value(),
                        "Publish failed: {}",
                        e
                    );
                }
            }
        }

        if let Err(e) = self.sink.close().await {
            warn!(sink = %self.report.name, "Close failed: {}", e);
        }
        info!(
            "Sink {} stopped: {} published, {} failed",
            self.report.name, self.report.published, self.report.failed
        );
    }
}
