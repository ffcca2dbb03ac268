//! Sinks for the mottag tick stream
//!
//! Every sink runs as an actor on its own tokio task behind a bounded
//! channel. The driver hands samples over with `try_send`, so a slow or
//! broken transport drops ticks instead of stalling the simulation.
//!
//! # Sinks
//!
//! - [`ConsoleSink`]: one readable line per tick on stdout
//! - [`TrailSink`]: bounded true/estimated position history for plotting
//! - [`DocumentStoreSink`]: HTTP PUT of the latest readings to a REST document store
//! - [`TopicSink`]: one MQTT message per antenna per tick

pub mod console;
pub mod document_store;
pub mod payload;
pub mod set;
pub mod sink;
pub mod task;
pub mod topic;
pub mod trail;

pub use console::ConsoleSink;
pub use document_store::DocumentStoreSink;
pub use set::{SinkExit, SinkSet, DEFAULT_SHUTDOWN_GRACE};
pub use sink::Sink;
pub use task::{SinkReport, SinkTask, Task, TaskHandle, TaskMessage};
pub use topic::TopicSink;
pub use trail::{TrailHandle, TrailSink, TrailSnapshot};
