use psybattery_core::{RecordedResponse, RunStatus, TestKind, TrialSpec};
use psybattery_timing::RunToken;

/// State of one run, owned by the timeline that created it.
#[derive(Debug, Clone)]
pub struct RunState {
    pub token: RunToken,
    pub test: TestKind,
    trials: Vec<TrialSpec>,
    current: usize,
    responses: Vec<RecordedResponse>,
    status: RunStatus,
}

impl RunState {
    pub fn new(token: RunToken, test: TestKind, trials: Vec<TrialSpec>) -> Self {
        let responses = Vec::with_capacity(trials.len());
        Self {
            token,
            test,
            trials,
            current: 0,
            responses,
            status: RunStatus::Running,
        }
    }

    pub fn trials(&self) -> &[TrialSpec] {
        &self.trials
    }

    pub fn responses(&self) -> &[RecordedResponse] {
        &self.responses
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn is_complete(&self) -> bool {
        self.status == RunStatus::Complete
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// Index of the trial in progress; equals `len()` once every trial ran.
    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_trial(&self) -> Option<&TrialSpec> {
        self.trials.get(self.current)
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Appends the response for the current trial. Responses for any other
    /// trial, or a second response for the same trial, are refused.
    pub(crate) fn push_response(&mut self, response: RecordedResponse) -> bool {
        let expected = self.responses.len();
        if !self.is_running() || response.trial.index != self.current || expected != self.current {
            tracing::warn!(
                trial = response.trial.index,
                current = self.current,
                "dropping out-of-order response"
            );
            return false;
        }
        self.responses.push(response);
        true
    }

    /// Moves past the current trial. Returns the next index.
    pub(crate) fn advance(&mut self) -> usize {
        if self.current < self.trials.len() {
            self.current += 1;
        }
        self.current
    }

    pub(crate) fn finish(&mut self, status: RunStatus) {
        if self.is_running() {
            self.status = status;
        }
    }
}
