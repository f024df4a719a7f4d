use anyhow::{Context, Result};
use psybattery_core::{RecordedResponse, Response, RunStatus, TestKind, TrialPhase, TrialSpec};
use psybattery_experiment::{TestConfig, Timeline, TimelineEvent};
use psybattery_scoring::ScoreReport;
use psybattery_timing::{Clock, ms_to_ns};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::participant::SimulatedParticipant;

/// Everything written out for one run.
#[derive(Debug, Serialize)]
pub struct SessionRecord {
    pub test: TestKind,
    pub seed: u64,
    pub status: RunStatus,
    pub config: TestConfig,
    pub trials: Vec<TrialSpec>,
    pub responses: Vec<RecordedResponse>,
    pub report: Option<ScoreReport>,
}

pub struct Session<C: Clock> {
    timeline: Timeline<C>,
    participant: SimulatedParticipant,
    seed: u64,
    abort_after: Option<usize>,
}

impl<C: Clock> Session<C> {
    pub fn new(
        config: TestConfig,
        clock: C,
        participant: SimulatedParticipant,
        seed: u64,
    ) -> Result<Self> {
        let timeline = Timeline::new(config, clock).context("invalid test configuration")?;
        Ok(Self {
            timeline,
            participant,
            seed,
            abort_after: None,
        })
    }

    pub fn abort_after(mut self, trials: Option<usize>) -> Self {
        self.abort_after = trials;
        self
    }

    /// Presents the whole run, answering each target through the
    /// participant, and returns the record.
    pub fn run(mut self) -> Result<SessionRecord> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut events = self
            .timeline
            .start(&mut rng)
            .context("failed to generate the trial sequence")?;

        let mut planned: Option<(u64, Response)> = None;
        loop {
            for event in &events {
                match event {
                    TimelineEvent::PhaseChanged {
                        trial,
                        phase: TrialPhase::Target,
                        at,
                    } => {
                        planned = self
                            .participant
                            .respond(trial)
                            .map(|(rt_ms, r)| (at + ms_to_ns(rt_ms), r));
                    }
                    TimelineEvent::Progress { index, total } => {
                        tracing::info!(trial = index, total, "trial started");
                    }
                    _ => {}
                }
            }

            if let Some(limit) = self.abort_after {
                let done = self.timeline.run_state().map_or(0, |r| r.current_index());
                if done >= limit && self.timeline.is_running() {
                    self.timeline.abort();
                }
            }

            let Some(due) = self.timeline.next_deadline() else {
                break;
            };
            events = match planned.take() {
                Some((at, response)) if at <= due => {
                    self.timeline.clock().sleep_until(at);
                    self.timeline.submit_at(response, at)
                }
                later => {
                    planned = later;
                    self.timeline.step()
                }
            };
        }

        let timeline = self.timeline;
        let run = timeline
            .run_state()
            .context("timeline finished without a run")?;
        Ok(SessionRecord {
            test: run.test,
            seed: self.seed,
            status: run.status(),
            config: timeline.config().clone(),
            trials: run.trials().to_vec(),
            responses: run.responses().to_vec(),
            report: timeline.report().cloned(),
        })
    }
}
