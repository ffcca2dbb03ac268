//! The sink capability

use async_trait::async_trait;
use mottag_common::Error;
use mottag_sim::TickSample;

/// Consumer of tick samples.
///
/// Implementations are driven by a [`SinkTask`](crate::SinkTask) and never
/// see more than one call at a time. Errors are logged by the task and do
/// not stop the simulation.
#[async_trait]
pub trait Sink: Send + 'static {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Delivers one sample.
    async fn publish(&mut self, sample: &TickSample) -> Result<(), Error>;

    /// Releases transport resources. Called once, after the last publish.
    async fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
