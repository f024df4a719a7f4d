use serde::{Deserialize, Serialize};

use crate::stimulus::{Direction, InkColor, Stimulus, StimulusType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// Multi-cue flanker task (ANT).
    Attention,
    /// Spatial n-back.
    Updating,
    /// Color-word Stroop task.
    Interference,
}

impl TestKind {
    pub fn id(self) -> &'static str {
        match self {
            TestKind::Attention => "ant",
            TestKind::Updating => "nback",
            TestKind::Interference => "stroop",
        }
    }

    /// Binary detection tasks are scored with hit/false-alarm rates.
    pub fn is_detection(self) -> bool {
        matches!(self, TestKind::Updating)
    }
}

/// Immutable description of one trial before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub index: usize,
    pub stimulus: StimulusType,
}

impl TrialSpec {
    pub fn new(index: usize, stimulus: StimulusType) -> Self {
        Self { index, stimulus }
    }

    pub fn cue_shown(&self) -> bool {
        self.stimulus.cue_shown()
    }

    pub fn expected_response(&self) -> Option<Response> {
        self.stimulus.expected_response()
    }

    pub fn is_scored(&self) -> bool {
        self.stimulus.is_scored()
    }

    /// `Some(true)` for n-back targets, `Some(false)` for scored non-targets.
    pub fn is_target(&self) -> Option<bool> {
        match self.stimulus {
            StimulusType::Grid { is_target, .. } => is_target,
            _ => None,
        }
    }
}

/// A discrete response emitted by the host on user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Response {
    Direction(Direction),
    Match,
    Color(InkColor),
}

/// Raw outcome of one trial. Exactly one per trial, appended in trial order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedResponse {
    pub trial: TrialSpec,
    pub response: Option<Response>,
    pub correct: bool,
    pub reaction_time_ms: f64,
}

impl RecordedResponse {
    pub fn answered(trial: TrialSpec, response: Response, reaction_time_ms: f64) -> Self {
        let correct = trial.expected_response() == Some(response);
        Self {
            trial,
            response: Some(response),
            correct,
            reaction_time_ms,
        }
    }

    /// No response within the window. Always incorrect at this stage; a
    /// withheld response to an n-back non-target is credited by the scorer.
    pub fn timed_out(trial: TrialSpec, window_ms: f64) -> Self {
        Self {
            trial,
            response: None,
            correct: false,
            reaction_time_ms: window_ms,
        }
    }

    pub fn responded(&self) -> bool {
        self.response.is_some()
    }
}
