use psybattery_core::{RecordedResponse, Response, TrialSpec};
use psybattery_timing::{ms_to_ns, ns_to_ms};

/// The interval during which the current trial accepts a response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseWindow {
    pub trial: TrialSpec,
    pub opened_at: u64,
    pub duration_ms: u64,
}

impl ResponseWindow {
    pub fn closes_at(&self) -> u64 {
        self.opened_at + ms_to_ns(self.duration_ms)
    }

    /// Half-open: the closing instant itself belongs to the timeout.
    pub fn contains(&self, at: u64) -> bool {
        at >= self.opened_at && at < self.closes_at()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Accepted(RecordedResponse),
    Rejected,
}

/// Captures at most one response per opened window. Records what happened;
/// judging hits and rejections is left to the scorer.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    window: Option<ResponseWindow>,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, trial: TrialSpec, at: u64, duration_ms: u64) {
        if let Some(stale) = self.window.replace(ResponseWindow {
            trial,
            opened_at: at,
            duration_ms,
        }) {
            tracing::warn!(trial = stale.trial.index, "response window replaced while open");
        }
    }

    pub fn window(&self) -> Option<&ResponseWindow> {
        self.window.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.window.is_some()
    }

    /// Accepts `response` if `at` falls inside the open window and closes
    /// it. Anything else is rejected and changes nothing.
    pub fn submit(&mut self, response: Response, at: u64) -> Submission {
        match self.window {
            Some(w) if w.contains(at) => {
                self.window = None;
                let rt_ms = ns_to_ms(at - w.opened_at);
                Submission::Accepted(RecordedResponse::answered(w.trial, response, rt_ms))
            }
            _ => Submission::Rejected,
        }
    }

    /// Closes the window with no response; RT is the full window.
    pub fn expire(&mut self) -> Option<RecordedResponse> {
        self.window
            .take()
            .map(|w| RecordedResponse::timed_out(w.trial, w.duration_ms as f64))
    }

    /// Drops the window without producing anything (run aborted).
    pub fn discard(&mut self) {
        self.window = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use psybattery_core::{Congruency, CueType, Direction, Placement, StimulusType};

    fn trial() -> TrialSpec {
        TrialSpec::new(
            4,
            StimulusType::Flanker {
                cue: CueType::Spatial,
                congruency: Congruency::Incongruent,
                direction: Direction::Right,
                placement: Placement::Above,
            },
        )
    }

    const ONSET: u64 = 5_000_000_000;
    const RIGHT: Response = Response::Direction(Direction::Right);

    #[test]
    fn rejects_without_window() {
        let mut rec = ResponseRecorder::new();
        assert_eq!(rec.submit(RIGHT, ONSET), Submission::Rejected);
        assert!(rec.expire().is_none());
    }

    #[test]
    fn response_at_onset_has_zero_rt() {
        let mut rec = ResponseRecorder::new();
        rec.open(trial(), ONSET, 1700);
        let Submission::Accepted(r) = rec.submit(RIGHT, ONSET) else {
            panic!("expected acceptance at onset");
        };
        assert_eq!(r.reaction_time_ms, 0.0);
        assert!(r.correct);
        assert!(!rec.is_open());
    }

    #[test]
    fn response_at_close_is_rejected() {
        let mut rec = ResponseRecorder::new();
        rec.open(trial(), ONSET, 1700);
        assert_eq!(rec.submit(RIGHT, ONSET + ms_to_ns(1700)), Submission::Rejected);
        // The window is still there for the timeout to close.
        assert!(rec.is_open());
        let timed_out = rec.expire().unwrap();
        assert_eq!(timed_out.response, None);
        assert_eq!(timed_out.reaction_time_ms, 1700.0);
        assert!(!timed_out.correct);
    }

    #[test]
    fn early_response_is_rejected_without_side_effect() {
        let mut rec = ResponseRecorder::new();
        rec.open(trial(), ONSET, 1700);
        assert_eq!(rec.submit(RIGHT, ONSET - 1), Submission::Rejected);
        assert_eq!(rec.window().unwrap().opened_at, ONSET);
    }

    #[test]
    fn only_first_response_counts() {
        let mut rec = ResponseRecorder::new();
        rec.open(trial(), ONSET, 1700);
        let first = rec.submit(Response::Direction(Direction::Left), ONSET + ms_to_ns(412));
        let second = rec.submit(RIGHT, ONSET + ms_to_ns(500));

        let Submission::Accepted(r) = first else {
            panic!("first response should be accepted");
        };
        assert_eq!(r.reaction_time_ms, 412.0);
        assert!(!r.correct);
        assert_eq!(second, Submission::Rejected);
    }

    #[test]
    fn discard_fabricates_nothing() {
        let mut rec = ResponseRecorder::new();
        rec.open(trial(), ONSET, 1700);
        rec.discard();
        assert!(rec.expire().is_none());
    }
}
