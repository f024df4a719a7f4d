//! Clocks and the run-scoped deadline queue that drive trial presentation.

pub mod clock;
pub mod schedule;

pub use clock::{CalibrationStats, Clock, MonotonicClock, VirtualClock, ms_to_ns, ns_to_ms};
pub use schedule::{RunToken, Scheduled, Scheduler, TimerId};
