//! Common types and utilities for mottag
//!
//! This crate provides the shared error type, configuration structures,
//! logging setup and tick pacing used across all mottag crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod sim_tick;

pub use config::{
    DocumentStoreConfig, SimConfig, SinkConfig, SinkMode, TopicConfig, ANTENNA_COUNT,
    DEFAULT_QUEUE_CAPACITY, MAX_TICK_INTERVAL_S, MIN_KEEP_ALIVE_S, MIN_TICK_INTERVAL_S,
};
pub use error::Error;
pub use logging::{default_filter, init_logging, init_logging_with_filter, LogLevel};
pub use sim_tick::{SimulationTick, TickPacer, TickSchedule};
