use serde::{Deserialize, Serialize};

/// Phases of a single trial, in presentation order.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialPhase {
    Fixation,
    Cue,
    PreTarget,
    Target,
    InterTrialInterval,
}

impl Default for TrialPhase {
    fn default() -> Self {
        TrialPhase::Fixation
    }
}

impl TrialPhase {
    /// Responses are only accepted while the target is up.
    pub fn allows_input(&self) -> bool {
        matches!(self, Self::Target)
    }

    /// Transition table. `None` after the inter-trial interval means the
    /// trial is finished.
    pub fn next(&self, cue_shown: bool) -> Option<Self> {
        use TrialPhase::*;
        Some(match self {
            Fixation if cue_shown => Cue,
            Fixation => PreTarget,
            Cue => PreTarget,
            PreTarget => Target,
            Target => InterTrialInterval,
            InterTrialInterval => return None,
        })
    }

    pub fn is_target(&self) -> bool {
        matches!(self, TrialPhase::Target)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrialPhase::Fixation => "fixation",
            TrialPhase::Cue => "cue",
            TrialPhase::PreTarget => "pre_target",
            TrialPhase::Target => "target",
            TrialPhase::InterTrialInterval => "inter_trial_interval",
        }
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Complete,
    Aborted,
}

impl RunStatus {
    pub fn is_finished(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(cue_shown: bool) -> Vec<TrialPhase> {
        let mut phases = vec![TrialPhase::Fixation];
        while let Some(next) = phases.last().and_then(|p| p.next(cue_shown)) {
            phases.push(next);
        }
        phases
    }

    #[test]
    fn cued_trial_visits_every_phase() {
        use TrialPhase::*;
        assert_eq!(
            walk(true),
            vec![Fixation, Cue, PreTarget, Target, InterTrialInterval]
        );
    }

    #[test]
    fn uncued_trial_skips_cue() {
        use TrialPhase::*;
        assert_eq!(
            walk(false),
            vec![Fixation, PreTarget, Target, InterTrialInterval]
        );
    }

    #[test]
    fn only_target_allows_input() {
        for phase in walk(true) {
            assert_eq!(phase.allows_input(), phase == TrialPhase::Target);
        }
    }
}
