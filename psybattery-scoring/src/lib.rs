//! Turns a completed run's responses into accuracy, reaction-time and
//! signal-detection metrics. Everything here is pure: the same responses
//! always give the same report.

pub mod probit;
pub mod report;
pub mod scorer;
pub mod stats;

pub use probit::{Z_CLIP, inverse_normal_cdf, z_score};
pub use report::{ConditionRt, DetectionScores, InterferenceScores, NetworkScores, ScoreReport};
pub use scorer::{Outcome, classify, score};
