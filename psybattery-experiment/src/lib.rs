pub mod config;
pub mod design;
pub mod recorder;
pub mod run;
pub mod timeline;

pub use config::{
    AttentionFactors, ConfigError, InterferenceFactors, PhaseDurations, TestConfig, TestDesign,
};
pub use recorder::{ResponseRecorder, ResponseWindow, Submission};
pub use run::RunState;
pub use timeline::{Timeline, TimelineEvent};
