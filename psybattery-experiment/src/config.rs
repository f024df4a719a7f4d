use psybattery_core::{Congruency, CueType, Direction, InkColor, Placement, TestKind, TrialPhase};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A configuration the generator refuses to run. Raised before any trial exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("factor `{0}` has no levels")]
    EmptyFactor(&'static str),
    #[error("repetitions must be at least 1")]
    ZeroRepetitions,
    #[error("lag level {0} is outside 1..=3")]
    InvalidLag(usize),
    #[error("a sequence of {trials} trials leaves nothing to score at lag {lag}")]
    SequenceTooShort { trials: usize, lag: usize },
    #[error("target probability {0} is outside [0, 1]")]
    InvalidProbability(f64),
    #[error("the grid needs at least two cells, got {0}")]
    GridTooSmall(u8),
    #[error("target duration must be positive")]
    ZeroTargetDuration,
    #[error("cue duration {cue_ms} ms exceeds the cue-target interval of {interval_ms} ms")]
    CueExceedsInterval { cue_ms: u64, interval_ms: u64 },
    #[error("{repetitions} repetitions of the factorial design overflow the trial count")]
    TooManyTrials { repetitions: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDurations {
    pub fixation_ms: u64,
    pub cue_ms: u64,
    /// Cue onset to target onset. Uncued trials wait the whole interval so
    /// the target appears at the same moment in every condition.
    pub cue_target_interval_ms: u64,
    pub target_ms: u64,
    pub inter_trial_interval_ms: u64,
}

impl PhaseDurations {
    pub fn attention() -> Self {
        Self {
            fixation_ms: 400,
            cue_ms: 100,
            cue_target_interval_ms: 400,
            target_ms: 1700,
            inter_trial_interval_ms: 1500,
        }
    }

    pub fn updating() -> Self {
        Self {
            fixation_ms: 500,
            cue_ms: 0,
            cue_target_interval_ms: 0,
            target_ms: 2000,
            inter_trial_interval_ms: 500,
        }
    }

    pub fn interference() -> Self {
        Self {
            fixation_ms: 500,
            cue_ms: 0,
            cue_target_interval_ms: 0,
            target_ms: 2000,
            inter_trial_interval_ms: 1000,
        }
    }

    /// Duration of `phase` in milliseconds. Zero means the phase is skipped.
    pub fn for_phase(&self, phase: TrialPhase, cue_shown: bool) -> u64 {
        match phase {
            TrialPhase::Fixation => self.fixation_ms,
            TrialPhase::Cue => self.cue_ms,
            TrialPhase::PreTarget if cue_shown => {
                self.cue_target_interval_ms.saturating_sub(self.cue_ms)
            }
            TrialPhase::PreTarget => self.cue_target_interval_ms,
            TrialPhase::Target => self.target_ms,
            TrialPhase::InterTrialInterval => self.inter_trial_interval_ms,
        }
    }

    /// Longest possible trial, useful for estimating run length.
    pub fn max_trial_ms(&self) -> u64 {
        self.fixation_ms
            + self.cue_target_interval_ms.max(self.cue_ms)
            + self.target_ms
            + self.inter_trial_interval_ms
    }
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self::attention()
    }
}

/// Factor lists of the attention task. Entries may repeat to weight a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionFactors {
    pub cue_types: Vec<CueType>,
    pub flanking: Vec<Congruency>,
    pub directions: Vec<Direction>,
    pub positions: Vec<Placement>,
}

impl Default for AttentionFactors {
    fn default() -> Self {
        Self {
            cue_types: vec![CueType::None, CueType::Center, CueType::Spatial],
            flanking: vec![
                Congruency::Congruent,
                Congruency::Incongruent,
                Congruency::Neutral,
            ],
            directions: vec![Direction::Left, Direction::Right],
            positions: vec![Placement::Above, Placement::Below],
        }
    }
}

impl AttentionFactors {
    pub fn cardinalities(&self) -> [usize; 4] {
        [
            self.cue_types.len(),
            self.flanking.len(),
            self.directions.len(),
            self.positions.len(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterferenceFactors {
    pub congruency: Vec<Congruency>,
    pub inks: Vec<InkColor>,
}

impl Default for InterferenceFactors {
    fn default() -> Self {
        Self {
            congruency: vec![
                Congruency::Congruent,
                Congruency::Incongruent,
                Congruency::Neutral,
            ],
            inks: InkColor::ALL.to_vec(),
        }
    }
}

impl InterferenceFactors {
    pub fn cardinalities(&self) -> [usize; 2] {
        [self.congruency.len(), self.inks.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum TestDesign {
    Attention {
        #[serde(default)]
        factors: AttentionFactors,
        #[serde(default = "TestDesign::default_repetitions")]
        repetitions: usize,
    },
    Updating {
        #[serde(default = "TestDesign::default_lag")]
        lag: usize,
        #[serde(default = "TestDesign::default_updating_trials")]
        trials: usize,
        #[serde(default = "TestDesign::default_target_probability")]
        target_probability: f64,
        #[serde(default = "TestDesign::default_grid_cells")]
        grid_cells: u8,
    },
    Interference {
        #[serde(default)]
        factors: InterferenceFactors,
        #[serde(default = "TestDesign::default_repetitions")]
        repetitions: usize,
    },
}

impl TestDesign {
    fn default_repetitions() -> usize {
        2
    }
    fn default_lag() -> usize {
        2
    }
    fn default_updating_trials() -> usize {
        40
    }
    fn default_target_probability() -> f64 {
        0.3
    }
    fn default_grid_cells() -> u8 {
        9
    }

    pub fn kind(&self) -> TestKind {
        match self {
            TestDesign::Attention { .. } => TestKind::Attention,
            TestDesign::Updating { .. } => TestKind::Updating,
            TestDesign::Interference { .. } => TestKind::Interference,
        }
    }

    pub fn default_durations(&self) -> PhaseDurations {
        match self.kind() {
            TestKind::Attention => PhaseDurations::attention(),
            TestKind::Updating => PhaseDurations::updating(),
            TestKind::Interference => PhaseDurations::interference(),
        }
    }

    /// Number of trials a valid design produces. Saturates at `usize::MAX`
    /// for designs that `validate` refuses as too large.
    pub fn planned_trials(&self) -> usize {
        match self {
            TestDesign::Attention {
                factors,
                repetitions,
            } => trial_count(&factors.cardinalities(), *repetitions).unwrap_or(usize::MAX),
            TestDesign::Updating { trials, .. } => *trials,
            TestDesign::Interference {
                factors,
                repetitions,
            } => trial_count(&factors.cardinalities(), *repetitions).unwrap_or(usize::MAX),
        }
    }

    fn uses_cue(&self) -> bool {
        match self {
            TestDesign::Attention { factors, .. } => {
                factors.cue_types.iter().any(|c| *c != CueType::None)
            }
            _ => false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            TestDesign::Attention {
                factors,
                repetitions,
            } => {
                non_empty("cue_types", &factors.cue_types)?;
                non_empty("flanking", &factors.flanking)?;
                non_empty("directions", &factors.directions)?;
                non_empty("positions", &factors.positions)?;
                positive_repetitions(*repetitions)?;
                fits(&factors.cardinalities(), *repetitions)
            }
            TestDesign::Interference {
                factors,
                repetitions,
            } => {
                non_empty("congruency", &factors.congruency)?;
                non_empty("inks", &factors.inks)?;
                positive_repetitions(*repetitions)?;
                fits(&factors.cardinalities(), *repetitions)
            }
            TestDesign::Updating {
                lag,
                trials,
                target_probability,
                grid_cells,
            } => {
                if !(1..=3).contains(lag) {
                    return Err(ConfigError::InvalidLag(*lag));
                }
                if trials <= lag {
                    return Err(ConfigError::SequenceTooShort {
                        trials: *trials,
                        lag: *lag,
                    });
                }
                check_stream(*target_probability, *grid_cells)
            }
        }
    }
}

fn non_empty<T>(name: &'static str, levels: &[T]) -> Result<(), ConfigError> {
    if levels.is_empty() {
        Err(ConfigError::EmptyFactor(name))
    } else {
        Ok(())
    }
}

fn positive_repetitions(repetitions: usize) -> Result<(), ConfigError> {
    if repetitions == 0 {
        Err(ConfigError::ZeroRepetitions)
    } else {
        Ok(())
    }
}

/// Product of the factor sizes times `repetitions`, or `None` on overflow.
pub(crate) fn trial_count(cardinalities: &[usize], repetitions: usize) -> Option<usize> {
    cardinalities
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))?
        .checked_mul(repetitions)
}

fn fits(cardinalities: &[usize], repetitions: usize) -> Result<(), ConfigError> {
    match trial_count(cardinalities, repetitions) {
        Some(_) => Ok(()),
        None => Err(ConfigError::TooManyTrials { repetitions }),
    }
}

/// Parameters every n-back stream needs, NaN probabilities included.
pub(crate) fn check_stream(target_probability: f64, grid_cells: u8) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&target_probability) {
        return Err(ConfigError::InvalidProbability(target_probability));
    }
    if grid_cells < 2 {
        return Err(ConfigError::GridTooSmall(grid_cells));
    }
    Ok(())
}

/// Everything a run needs from the host, supplied once at start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestConfig {
    #[serde(flatten)]
    pub design: TestDesign,
    /// Falls back to the test's standard timing when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub durations: Option<PhaseDurations>,
}

impl TestConfig {
    pub fn new(design: TestDesign) -> Self {
        Self {
            design,
            durations: None,
        }
    }

    pub fn attention() -> Self {
        Self::new(TestDesign::Attention {
            factors: AttentionFactors::default(),
            repetitions: TestDesign::default_repetitions(),
        })
    }

    pub fn updating(lag: usize) -> Self {
        Self::new(TestDesign::Updating {
            lag,
            trials: TestDesign::default_updating_trials(),
            target_probability: TestDesign::default_target_probability(),
            grid_cells: TestDesign::default_grid_cells(),
        })
    }

    pub fn interference() -> Self {
        Self::new(TestDesign::Interference {
            factors: InterferenceFactors::default(),
            repetitions: TestDesign::default_repetitions(),
        })
    }

    pub fn with_durations(mut self, durations: PhaseDurations) -> Self {
        self.durations = Some(durations);
        self
    }

    pub fn kind(&self) -> TestKind {
        self.design.kind()
    }

    pub fn durations(&self) -> PhaseDurations {
        self.durations
            .clone()
            .unwrap_or_else(|| self.design.default_durations())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.design.validate()?;
        let durations = self.durations();
        if durations.target_ms == 0 {
            return Err(ConfigError::ZeroTargetDuration);
        }
        if self.design.uses_cue() && durations.cue_ms > durations.cue_target_interval_ms {
            return Err(ConfigError::CueExceedsInterval {
                cue_ms: durations.cue_ms,
                interval_ms: durations.cue_target_interval_ms,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        for config in [
            TestConfig::attention(),
            TestConfig::updating(1),
            TestConfig::updating(3),
            TestConfig::interference(),
        ] {
            assert_eq!(config.validate(), Ok(()), "{config:?}");
        }
        assert_eq!(TestConfig::attention().design.planned_trials(), 72);
        assert_eq!(TestConfig::interference().design.planned_trials(), 24);
    }

    #[test]
    fn empty_factor_is_rejected() {
        let mut config = TestConfig::attention();
        if let TestDesign::Attention { factors, .. } = &mut config.design {
            factors.flanking.clear();
        }
        assert_eq!(config.validate(), Err(ConfigError::EmptyFactor("flanking")));
    }

    #[test]
    fn zero_repetitions_rejected() {
        let config = TestConfig::new(TestDesign::Interference {
            factors: InterferenceFactors::default(),
            repetitions: 0,
        });
        assert_eq!(config.validate(), Err(ConfigError::ZeroRepetitions));
    }

    #[test]
    fn overflowing_repetitions_rejected() {
        let repetitions = usize::MAX / 8;
        let config = TestConfig::new(TestDesign::Attention {
            factors: AttentionFactors::default(),
            repetitions,
        });
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooManyTrials { repetitions })
        );
        assert_eq!(config.design.planned_trials(), usize::MAX);
    }

    #[test]
    fn lag_outside_range_rejected() {
        assert_eq!(
            TestConfig::updating(0).validate(),
            Err(ConfigError::InvalidLag(0))
        );
        assert_eq!(
            TestConfig::updating(4).validate(),
            Err(ConfigError::InvalidLag(4))
        );
    }

    #[test]
    fn updating_parameters_checked() {
        let design = |trials, target_probability, grid_cells| {
            TestConfig::new(TestDesign::Updating {
                lag: 2,
                trials,
                target_probability,
                grid_cells,
            })
        };
        assert_eq!(
            design(2, 0.3, 9).validate(),
            Err(ConfigError::SequenceTooShort { trials: 2, lag: 2 })
        );
        assert_eq!(
            design(20, 1.5, 9).validate(),
            Err(ConfigError::InvalidProbability(1.5))
        );
        assert!(matches!(
            design(20, f64::NAN, 9).validate(),
            Err(ConfigError::InvalidProbability(_))
        ));
        assert_eq!(design(20, 0.3, 1).validate(), Err(ConfigError::GridTooSmall(1)));
    }

    #[test]
    fn timing_is_checked() {
        let mut durations = PhaseDurations::attention();
        durations.cue_ms = 500;
        assert_eq!(
            TestConfig::attention().with_durations(durations).validate(),
            Err(ConfigError::CueExceedsInterval {
                cue_ms: 500,
                interval_ms: 400
            })
        );

        let mut durations = PhaseDurations::interference();
        durations.target_ms = 0;
        assert_eq!(
            TestConfig::interference().with_durations(durations).validate(),
            Err(ConfigError::ZeroTargetDuration)
        );
    }

    #[test]
    fn pre_target_completes_the_cue_target_interval() {
        let d = PhaseDurations::attention();
        assert_eq!(d.for_phase(TrialPhase::PreTarget, true), 300);
        assert_eq!(d.for_phase(TrialPhase::PreTarget, false), 400);
        assert_eq!(
            d.for_phase(TrialPhase::Cue, true) + d.for_phase(TrialPhase::PreTarget, true),
            d.for_phase(TrialPhase::PreTarget, false)
        );
        assert_eq!(d.for_phase(TrialPhase::Target, false), 1700);
    }

    #[test]
    fn parses_partial_json_with_defaults() {
        let config: TestConfig = serde_json::from_str(
            r#"{
                "test": "attention",
                "factors": { "cue_types": ["none", "center", "spatial", "spatial"] },
                "repetitions": 1
            }"#,
        )
        .unwrap();
        assert_eq!(config.kind(), TestKind::Attention);
        assert_eq!(config.design.planned_trials(), 48);
        assert_eq!(config.durations(), PhaseDurations::attention());

        let config: TestConfig = serde_json::from_str(
            r#"{ "test": "updating", "lag": 3,
                 "durations": { "fixation_ms": 0, "cue_ms": 0, "cue_target_interval_ms": 0,
                                "target_ms": 1500, "inter_trial_interval_ms": 500 } }"#,
        )
        .unwrap();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.durations().target_ms, 1500);
        assert_eq!(config.design.planned_trials(), 40);
    }
}
