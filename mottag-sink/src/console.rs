//! Console sink

use std::io::{self, Write};

use async_trait::async_trait;
use mottag_common::Error;
use mottag_sim::TickSample;

use crate::Sink;

/// Writes one line per tick:
/// `A0: -52.3 dBm | A1: ... | true=(x, y) est=(x, y) err=e`.
pub struct ConsoleSink<W = io::Stdout> {
    out: W,
}

impl ConsoleSink<io::Stdout> {
    /// Console sink on stdout.
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send + 'static> ConsoleSink<W> {
    /// Console sink on an arbitrary writer.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consumes the sink, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Formats the console line for a sample.
pub fn format_line(sample: &TickSample) -> String {
    format!(
        "{} | true=({:.2}, {:.2}) est=({:.2}, {:.2}) err={:.2}",
        sample.readings,
        sample.true_position.x,
        sample.true_position.y,
        sample.estimated_position.x,
        sample.estimated_position.y,
        sample.position_error()
    )
}

#[async_trait]
impl<W: Write + Send + 'static> Sink for ConsoleSink<W> {
    fn name(&self) -> &str {
        "console"
    }

    async fn publish(&mut self, sample: &TickSample) -> Result<(), Error> {
        writeln!(self.out, "{}", format_line(sample))?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Error> {
        self.out.flush()?;
        Ok(())
    }
}
