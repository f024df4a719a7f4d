//! Per-trial presentation state machine driven by one deadline queue.

use psybattery_core::{RecordedResponse, Response, RunStatus, TrialPhase, TrialSpec};
use psybattery_scoring::ScoreReport;
use psybattery_timing::{Clock, RunToken, Scheduler, TimerId, ms_to_ns};
use rand::Rng;
use serde::Serialize;

use crate::config::{ConfigError, PhaseDurations, TestConfig};
use crate::design;
use crate::recorder::{ResponseRecorder, Submission};
use crate::run::RunState;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TimelineEvent {
    PhaseChanged {
        trial: TrialSpec,
        phase: TrialPhase,
        at: u64,
    },
    ResponseRecorded(RecordedResponse),
    /// Emitted once as each trial starts.
    Progress {
        index: usize,
        total: usize,
    },
    RunComplete(ScoreReport),
    Aborted {
        completed: usize,
        total: usize,
    },
}

/// End of `phase` for trial `trial`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PhaseEnd {
    trial: usize,
    phase: TrialPhase,
}

pub struct Timeline<C: Clock> {
    clock: C,
    config: TestConfig,
    durations: PhaseDurations,
    scheduler: Scheduler<PhaseEnd>,
    recorder: ResponseRecorder,
    token: RunToken,
    run: Option<RunState>,
    phase: TrialPhase,
    pending: Option<TimerId>,
    report: Option<ScoreReport>,
}

impl<C: Clock> Timeline<C> {
    pub fn new(config: TestConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let durations = config.durations();
        Ok(Self {
            clock,
            config,
            durations,
            scheduler: Scheduler::new(),
            recorder: ResponseRecorder::new(),
            token: RunToken::default(),
            run: None,
            phase: TrialPhase::default(),
            pending: None,
            report: None,
        })
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn token(&self) -> RunToken {
        self.token
    }

    pub fn run_state(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(RunState::is_running)
    }

    /// Phase of the trial in progress, `None` when no run is active.
    pub fn phase(&self) -> Option<TrialPhase> {
        self.is_running().then_some(self.phase)
    }

    /// Score of the last completed run.
    pub fn report(&self) -> Option<&ScoreReport> {
        self.report.as_ref()
    }

    /// Earliest pending deadline; the host should tick no later than this.
    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    /// Generates a fresh trial sequence and starts presenting it. An active
    /// run is aborted first.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Vec<TimelineEvent>, ConfigError> {
        let trials = design::generate(&self.config.design, rng)?;
        Ok(self.start_with_trials(trials))
    }

    /// Starts a run over a fixed sequence, e.g. one replayed from a
    /// previous session. Trials are renumbered in the given order.
    pub fn start_with_trials(&mut self, trials: Vec<TrialSpec>) -> Vec<TimelineEvent> {
        let mut events = self.abort();

        let trials: Vec<TrialSpec> = trials
            .into_iter()
            .enumerate()
            .map(|(index, trial)| TrialSpec { index, ..trial })
            .collect();

        self.token = self.token.next();
        self.report = None;
        self.pending = None;
        self.run = Some(RunState::new(self.token, self.config.kind(), trials));

        let now = self.clock.now();
        tracing::info!(
            test = self.config.kind().id(),
            run = self.token.0,
            trials = self.run.as_ref().map_or(0, RunState::len),
            "run started"
        );

        if self.run.as_ref().is_some_and(RunState::is_empty) {
            self.complete(&mut events);
        } else {
            self.begin_trial(now, &mut events);
        }
        events
    }

    /// Fires every deadline due at or before the clock's current time.
    pub fn tick(&mut self) -> Vec<TimelineEvent> {
        let mut events = Vec::new();
        self.drain(self.clock.now(), &mut events);
        events
    }

    /// Sleeps on the clock until the next deadline, then ticks. Returns
    /// nothing when no deadline is pending.
    pub fn step(&mut self) -> Vec<TimelineEvent> {
        match self.next_deadline() {
            Some(due) => {
                self.clock.sleep_until(due);
                self.tick()
            }
            None => Vec::new(),
        }
    }

    /// Submits a response stamped with the clock's current time.
    pub fn submit(&mut self, response: Response) -> Vec<TimelineEvent> {
        let at = self.clock.now();
        self.submit_at(response, at)
    }

    /// Submits a response stamped by the host. Deadlines due at or before
    /// `at` fire first, so a response at the exact closing instant loses to
    /// the timeout.
    pub fn submit_at(&mut self, response: Response, at: u64) -> Vec<TimelineEvent> {
        let mut events = Vec::new();
        self.drain(at, &mut events);
        if !self.is_running() {
            return events;
        }

        match self.recorder.submit(response, at) {
            Submission::Accepted(recorded) => {
                if let Some(id) = self.pending.take() {
                    self.scheduler.cancel(id);
                }
                self.record(recorded, &mut events);
                self.enter(TrialPhase::InterTrialInterval, at, &mut events);
            }
            Submission::Rejected => {
                tracing::trace!(?response, at, phase = self.phase.label(), "response ignored");
            }
        }
        events
    }

    /// Stops the active run without recording anything further.
    pub fn abort(&mut self) -> Vec<TimelineEvent> {
        let Some(run) = self.run.as_mut().filter(|r| r.is_running()) else {
            return Vec::new();
        };
        let cancelled = self.scheduler.cancel_run(self.token);
        self.recorder.discard();
        self.pending = None;
        run.finish(RunStatus::Aborted);

        let completed = run.responses().len();
        let total = run.len();
        tracing::info!(run = self.token.0, completed, total, cancelled, "run aborted");
        vec![TimelineEvent::Aborted { completed, total }]
    }

    fn drain(&mut self, now: u64, events: &mut Vec<TimelineEvent>) {
        while let Some(due) = self.scheduler.pop_due(now) {
            let current = self.run.as_ref().map(RunState::current_index);
            if due.token != self.token
                || self.pending != Some(due.id)
                || current != Some(due.payload.trial)
                || due.payload.phase != self.phase
            {
                tracing::trace!(run = due.token.0, trial = due.payload.trial, "stale deadline dropped");
                continue;
            }
            self.pending = None;
            self.phase_ended(due.payload.phase, due.due, events);
        }
    }

    fn phase_ended(&mut self, phase: TrialPhase, at: u64, events: &mut Vec<TimelineEvent>) {
        if phase.is_target() {
            if let Some(timed_out) = self.recorder.expire() {
                self.record(timed_out, events);
            }
        }
        match phase.next(self.cue_shown()) {
            Some(next) => self.enter(next, at, events),
            None => self.finish_trial(at, events),
        }
    }

    fn enter(&mut self, phase: TrialPhase, at: u64, events: &mut Vec<TimelineEvent>) {
        let Some(trial) = self.run.as_ref().and_then(|r| r.current_trial().copied()) else {
            return;
        };
        let cue_shown = trial.cue_shown();

        let mut phase = phase;
        let mut duration_ms = self.durations.for_phase(phase, cue_shown);
        while duration_ms == 0 && !phase.is_target() {
            match phase.next(cue_shown) {
                Some(next) => {
                    phase = next;
                    duration_ms = self.durations.for_phase(phase, cue_shown);
                }
                None => return self.finish_trial(at, events),
            }
        }

        self.phase = phase;
        tracing::debug!(trial = trial.index, phase = phase.label(), at, "phase changed");
        events.push(TimelineEvent::PhaseChanged { trial, phase, at });

        if phase.is_target() {
            self.recorder.open(trial, at, duration_ms);
        }
        self.pending = Some(self.scheduler.schedule(
            at + ms_to_ns(duration_ms),
            self.token,
            PhaseEnd {
                trial: trial.index,
                phase,
            },
        ));
    }

    fn record(&mut self, response: RecordedResponse, events: &mut Vec<TimelineEvent>) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if run.push_response(response.clone()) {
            tracing::debug!(
                trial = response.trial.index,
                correct = response.correct,
                rt_ms = response.reaction_time_ms,
                "response recorded"
            );
            events.push(TimelineEvent::ResponseRecorded(response));
        }
    }

    fn finish_trial(&mut self, at: u64, events: &mut Vec<TimelineEvent>) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if run.advance() >= run.len() {
            self.complete(events);
        } else {
            self.begin_trial(at, events);
        }
    }

    fn begin_trial(&mut self, at: u64, events: &mut Vec<TimelineEvent>) {
        let Some(run) = self.run.as_ref() else {
            return;
        };
        events.push(TimelineEvent::Progress {
            index: run.current_index(),
            total: run.len(),
        });
        self.enter(TrialPhase::Fixation, at, events);
    }

    fn complete(&mut self, events: &mut Vec<TimelineEvent>) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if !run.is_running() {
            return;
        }
        run.finish(RunStatus::Complete);
        self.scheduler.cancel_run(self.token);
        self.pending = None;

        let report = psybattery_scoring::score(run.test, run.responses());
        tracing::info!(
            run = self.token.0,
            trials = run.len(),
            accuracy = report.accuracy,
            mean_rt_ms = report.mean_rt_ms,
            "run complete"
        );
        self.report = Some(report.clone());
        events.push(TimelineEvent::RunComplete(report));
    }

    fn cue_shown(&self) -> bool {
        self.run
            .as_ref()
            .and_then(RunState::current_trial)
            .is_some_and(TrialSpec::cue_shown)
    }
}
