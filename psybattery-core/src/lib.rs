pub mod phase;
pub mod stimulus;
pub mod trial;

pub use phase::{RunStatus, TrialPhase};
pub use stimulus::{Congruency, CueType, Direction, InkColor, Placement, Stimulus, StimulusType};
pub use trial::{RecordedResponse, Response, TestKind, TrialSpec};
