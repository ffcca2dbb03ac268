//! Tag motion simulator and center4 position estimator
//!
//! Simulates a tag wandering inside the rectangle spanned by four fixed
//! antennas, produces one noisy RSSI reading per antenna per tick and
//! estimates the tag position from those readings.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                           TickDriver                              │
//! │  ┌─────────────┐   ┌──────────────────┐   ┌───────────────────┐  │
//! │  │ MotionModel │──▶│ observe_all      │──▶│ PositionEstimator │  │
//! │  │  • drag     │   │  • log-distance  │   │  • center4        │  │
//! │  │  • reflect  │   │  • gaussian noise│   │  • alpha blend    │  │
//! │  └─────────────┘   └──────────────────┘   └───────────────────┘  │
//! │                              │                                    │
//! │                              ▼                                    │
//! │                  TickSample ──▶ SampleDispatch                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod center4;
pub mod driver;
pub mod geometry;
pub mod motion;
pub mod observation;
pub mod rng;

pub use center4::{
    blend_alpha, estimate_center4, estimate_center4_detailed, Center4Config, Center4Estimate,
    Center4Estimator, PositionEstimator,
};
pub use driver::{
    Clock, ManualClock, RunSummary, SampleDispatch, SystemClock, TickDriver, TickSample,
};
pub use geometry::{Antenna, Bounds, Point2};
pub use motion::{MotionModel, MotionParams, TargetState};
pub use observation::{observe, observe_all, ObservationVector, PathLossModel};
pub use rng::SimRng;
