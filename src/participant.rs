use anyhow::{Result, ensure};
use psybattery_core::{Congruency, CueType, InkColor, Response, StimulusType, TrialSpec};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Behavioral parameters of a simulated participant.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantProfile {
    pub mean_rt_ms: f64,
    /// Half-width of the uniform RT jitter.
    pub rt_jitter_ms: f64,
    pub accuracy: f64,
    pub lapse_rate: f64,
    /// Extra RT for incongruent stimuli.
    pub conflict_cost_ms: f64,
    /// Extra RT when no warning cue is shown.
    pub alerting_cost_ms: f64,
    /// RT saved by a spatial cue.
    pub orienting_gain_ms: f64,
}

impl Default for ParticipantProfile {
    fn default() -> Self {
        Self {
            mean_rt_ms: 520.0,
            rt_jitter_ms: 120.0,
            accuracy: 0.92,
            lapse_rate: 0.03,
            conflict_cost_ms: 60.0,
            alerting_cost_ms: 40.0,
            orienting_gain_ms: 50.0,
        }
    }
}

const MIN_RT_MS: f64 = 150.0;

pub struct SimulatedParticipant {
    profile: ParticipantProfile,
    rng: StdRng,
}

impl SimulatedParticipant {
    pub fn new(profile: ParticipantProfile, seed: u64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&profile.accuracy),
            "accuracy {} is outside [0, 1]",
            profile.accuracy
        );
        ensure!(
            (0.0..=1.0).contains(&profile.lapse_rate),
            "lapse rate {} is outside [0, 1]",
            profile.lapse_rate
        );
        ensure!(
            profile.mean_rt_ms.is_finite() && profile.mean_rt_ms > 0.0,
            "mean RT must be positive"
        );
        Ok(Self {
            profile,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Decides how to react to a target: `Some((rt_ms, response))`, or
    /// `None` to let the window time out.
    pub fn respond(&mut self, trial: &TrialSpec) -> Option<(u64, Response)> {
        let p = &self.profile;
        let knows = self.rng.random_bool(p.accuracy);

        let response = match trial.stimulus {
            StimulusType::Grid { is_target, .. } => {
                // Saying "match" on a target is a hit; on anything else a false alarm.
                let press = if is_target == Some(true) { knows } else { !knows };
                if !press {
                    return None;
                }
                Response::Match
            }
            StimulusType::Flanker { direction, .. } => {
                if self.rng.random_bool(p.lapse_rate) {
                    return None;
                }
                Response::Direction(if knows { direction } else { direction.opposite() })
            }
            StimulusType::ColorWord { ink, word, .. } => {
                if self.rng.random_bool(p.lapse_rate) {
                    return None;
                }
                Response::Color(match (knows, word) {
                    (true, _) => ink,
                    (false, Some(w)) if w != ink => w,
                    (false, _) => self.other_color(ink),
                })
            }
        };

        let rt = self.reaction_time(&trial.stimulus);
        Some((rt.round() as u64, response))
    }

    fn reaction_time(&mut self, stimulus: &StimulusType) -> f64 {
        let p = &self.profile;
        let mut rt = p.mean_rt_ms;
        match stimulus {
            StimulusType::Flanker {
                cue, congruency, ..
            } => {
                rt += match cue {
                    CueType::None => p.alerting_cost_ms,
                    CueType::Center => 0.0,
                    CueType::Spatial => -p.orienting_gain_ms,
                };
                if *congruency == Congruency::Incongruent {
                    rt += p.conflict_cost_ms;
                }
            }
            StimulusType::ColorWord { congruency, .. } => {
                if *congruency == Congruency::Incongruent {
                    rt += p.conflict_cost_ms;
                }
            }
            StimulusType::Grid { .. } => {}
        }
        if p.rt_jitter_ms > 0.0 {
            rt += self.rng.random_range(-p.rt_jitter_ms..=p.rt_jitter_ms);
        }
        rt.max(MIN_RT_MS)
    }

    fn other_color(&mut self, ink: InkColor) -> InkColor {
        let others: Vec<InkColor> = InkColor::ALL.into_iter().filter(|c| *c != ink).collect();
        others[self.rng.random_range(0..others.len())]
    }
}
