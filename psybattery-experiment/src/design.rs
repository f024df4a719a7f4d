//! Trial design: counterbalanced factorial sequences and n-back streams.

use psybattery_core::{Congruency, InkColor, StimulusType, TrialSpec};
use rand::Rng;
use rand::seq::SliceRandom;

use crate::config::{
    AttentionFactors, ConfigError, InterferenceFactors, TestDesign, check_stream, trial_count,
};

/// Every combination of factor indices, `repetitions` times over, in
/// odometer order (last factor varies fastest). Each factor is
/// `(name, number of entries)`.
pub fn counterbalance(
    factors: &[(&'static str, usize)],
    repetitions: usize,
) -> Result<Vec<Vec<usize>>, ConfigError> {
    if let Some((name, _)) = factors.iter().find(|(_, n)| *n == 0) {
        return Err(ConfigError::EmptyFactor(*name));
    }
    if repetitions == 0 {
        return Err(ConfigError::ZeroRepetitions);
    }

    let sizes: Vec<usize> = factors.iter().map(|(_, n)| *n).collect();
    let total =
        trial_count(&sizes, repetitions).ok_or(ConfigError::TooManyTrials { repetitions })?;
    let cells = total / repetitions;
    let mut out = Vec::with_capacity(total);
    for _ in 0..repetitions {
        let mut combo = vec![0; factors.len()];
        for _ in 0..cells {
            out.push(combo.clone());
            for (digit, (_, n)) in combo.iter_mut().zip(factors).rev() {
                *digit += 1;
                if *digit < *n {
                    break;
                }
                *digit = 0;
            }
        }
    }
    Ok(out)
}

/// Builds the full, shuffled trial list for a design.
pub fn generate<R: Rng + ?Sized>(
    design: &TestDesign,
    rng: &mut R,
) -> Result<Vec<TrialSpec>, ConfigError> {
    design.validate()?;
    let trials = match design {
        TestDesign::Attention {
            factors,
            repetitions,
        } => attention_trials(factors, *repetitions, rng)?,
        TestDesign::Interference {
            factors,
            repetitions,
        } => interference_trials(factors, *repetitions, rng)?,
        TestDesign::Updating {
            lag,
            trials,
            target_probability,
            grid_cells,
        } => {
            let positions =
                updating_positions(*trials, *lag, *target_probability, *grid_cells, rng)?;
            trials_from_positions(&positions, *lag)
        }
    };
    tracing::debug!(test = design.kind().id(), trials = trials.len(), "generated design");
    Ok(trials)
}

pub fn attention_trials<R: Rng + ?Sized>(
    factors: &AttentionFactors,
    repetitions: usize,
    rng: &mut R,
) -> Result<Vec<TrialSpec>, ConfigError> {
    let [cues, flanking, directions, positions] = factors.cardinalities();
    let mut cells = counterbalance(
        &[
            ("cue_types", cues),
            ("flanking", flanking),
            ("directions", directions),
            ("positions", positions),
        ],
        repetitions,
    )?;
    cells.shuffle(rng);

    Ok(cells
        .iter()
        .enumerate()
        .map(|(index, c)| {
            TrialSpec::new(
                index,
                StimulusType::Flanker {
                    cue: factors.cue_types[c[0]],
                    congruency: factors.flanking[c[1]],
                    direction: factors.directions[c[2]],
                    placement: factors.positions[c[3]],
                },
            )
        })
        .collect())
}

pub fn interference_trials<R: Rng + ?Sized>(
    factors: &InterferenceFactors,
    repetitions: usize,
    rng: &mut R,
) -> Result<Vec<TrialSpec>, ConfigError> {
    let [congruency, inks] = factors.cardinalities();
    let mut cells = counterbalance(&[("congruency", congruency), ("inks", inks)], repetitions)?;
    cells.shuffle(rng);

    Ok(cells
        .iter()
        .enumerate()
        .map(|(index, c)| {
            let congruency = factors.congruency[c[0]];
            let ink = factors.inks[c[1]];
            let word = match congruency {
                Congruency::Congruent => Some(ink),
                Congruency::Incongruent => Some(other_color(ink, rng)),
                Congruency::Neutral => None,
            };
            TrialSpec::new(
                index,
                StimulusType::ColorWord {
                    congruency,
                    ink,
                    word,
                },
            )
        })
        .collect())
}

fn other_color<R: Rng + ?Sized>(ink: InkColor, rng: &mut R) -> InkColor {
    let others: Vec<InkColor> = InkColor::ALL.into_iter().filter(|c| *c != ink).collect();
    others[rng.random_range(0..others.len())]
}

/// Grid positions for an n-back stream. The first `lag` positions are
/// independent draws; after that each position repeats the one `lag` back
/// with probability `target_probability` and otherwise differs from it.
pub fn updating_positions<R: Rng + ?Sized>(
    trials: usize,
    lag: usize,
    target_probability: f64,
    grid_cells: u8,
    rng: &mut R,
) -> Result<Vec<u8>, ConfigError> {
    check_stream(target_probability, grid_cells)?;
    let mut seq: Vec<u8> = Vec::with_capacity(trials);
    for i in 0..trials {
        let position = if i < lag {
            rng.random_range(0..grid_cells)
        } else {
            let back = seq[i - lag];
            if rng.random_bool(target_probability) {
                back
            } else {
                let drawn = rng.random_range(0..grid_cells - 1);
                if drawn >= back { drawn + 1 } else { drawn }
            }
        };
        seq.push(position);
    }
    Ok(seq)
}

/// Target status of each element: `None` inside the lag, then whether it
/// equals the element `lag` positions back.
pub fn classify_targets<T: PartialEq>(sequence: &[T], lag: usize) -> Vec<Option<bool>> {
    (0..sequence.len())
        .map(|i| (i >= lag).then(|| sequence[i] == sequence[i - lag]))
        .collect()
}

pub fn trials_from_positions(positions: &[u8], lag: usize) -> Vec<TrialSpec> {
    positions
        .iter()
        .zip(classify_targets(positions, lag))
        .enumerate()
        .map(|(index, (&position, is_target))| {
            TrialSpec::new(
                index,
                StimulusType::Grid {
                    position,
                    is_target,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use psybattery_core::{CueType, Stimulus};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    #[test]
    fn counterbalance_covers_every_cell_equally() {
        let cells = counterbalance(&[("a", 3), ("b", 2), ("c", 4)], 3).unwrap();
        assert_eq!(cells.len(), 3 * 2 * 4 * 3);

        let mut counts: HashMap<Vec<usize>, usize> = HashMap::new();
        for c in &cells {
            *counts.entry(c.clone()).or_default() += 1;
        }
        assert_eq!(counts.len(), 24);
        assert!(counts.values().all(|&n| n == 3));
    }

    #[test]
    fn counterbalance_rejects_empty_factor_and_zero_repetitions() {
        assert_eq!(
            counterbalance(&[("cue_types", 3), ("flanking", 0)], 1),
            Err(ConfigError::EmptyFactor("flanking"))
        );
        assert_eq!(
            counterbalance(&[("cue_types", 3)], 0),
            Err(ConfigError::ZeroRepetitions)
        );
    }

    #[test]
    fn weighted_cue_list_generates_48_trials() {
        let factors = AttentionFactors {
            cue_types: vec![CueType::None, CueType::Center, CueType::Spatial, CueType::Spatial],
            ..AttentionFactors::default()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let trials = attention_trials(&factors, 1, &mut rng).unwrap();
        assert_eq!(trials.len(), 4 * 3 * 2 * 2);

        let spatial = trials
            .iter()
            .filter(|t| matches!(t.stimulus, StimulusType::Flanker { cue: CueType::Spatial, .. }))
            .count();
        assert_eq!(spatial, 24);
        for (i, t) in trials.iter().enumerate() {
            assert_eq!(t.index, i);
        }
    }

    #[test]
    fn attention_design_is_balanced_after_shuffle() {
        let design = TestDesign::Attention {
            factors: AttentionFactors::default(),
            repetitions: 4,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let trials = generate(&design, &mut rng).unwrap();
        assert_eq!(trials.len(), 36 * 4);

        let mut counts: HashMap<Vec<(&str, &str)>, usize> = HashMap::new();
        for t in &trials {
            *counts.entry(t.stimulus.conditions()).or_default() += 1;
        }
        assert_eq!(counts.len(), 36);
        assert!(counts.values().all(|&n| n == 4));
    }

    #[test]
    fn same_seed_same_sequence() {
        let design = crate::config::TestConfig::attention().design;
        let a = generate(&design, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = generate(&design, &mut StdRng::seed_from_u64(99)).unwrap();
        let c = generate(&design, &mut StdRng::seed_from_u64(100)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn lag_two_sequence_is_classified_exactly() {
        let trials = trials_from_positions(&[3, 7, 3, 1, 7], 2);
        let status: Vec<_> = trials.iter().map(|t| t.is_target()).collect();
        assert_eq!(status, vec![None, None, Some(true), Some(false), Some(false)]);
        assert!(!trials[0].is_scored());
        assert!(trials[2].is_scored());
    }

    #[test]
    fn updating_stream_respects_back_reference() {
        let mut rng = StdRng::seed_from_u64(2024);
        let lag = 3;
        let positions = updating_positions(400, lag, 0.3, 9, &mut rng).unwrap();
        assert_eq!(positions.len(), 400);
        assert!(positions.iter().all(|&p| p < 9));

        let status = classify_targets(&positions, lag);
        assert!(status[..lag].iter().all(Option::is_none));
        let targets = status.iter().filter(|s| **s == Some(true)).count();
        // 397 Bernoulli(0.3) draws; generous bounds around 119.
        assert!((70..=170).contains(&targets), "targets={targets}");
    }

    #[test]
    fn updating_extremes() {
        let mut rng = StdRng::seed_from_u64(5);
        let all = classify_targets(&updating_positions(30, 1, 1.0, 4, &mut rng).unwrap(), 1);
        assert!(all[1..].iter().all(|s| *s == Some(true)));

        let none = classify_targets(&updating_positions(30, 2, 0.0, 2, &mut rng).unwrap(), 2);
        assert!(none[2..].iter().all(|s| *s == Some(false)));
    }

    #[test]
    fn updating_stream_refuses_degenerate_parameters() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(
            updating_positions(10, 1, 0.3, 1, &mut rng),
            Err(ConfigError::GridTooSmall(1))
        );
        assert_eq!(
            updating_positions(10, 1, 0.3, 0, &mut rng),
            Err(ConfigError::GridTooSmall(0))
        );
        assert!(matches!(
            updating_positions(10, 1, f64::NAN, 9, &mut rng),
            Err(ConfigError::InvalidProbability(p)) if p.is_nan()
        ));
        assert!(matches!(
            updating_positions(10, 1, 1.5, 9, &mut rng),
            Err(ConfigError::InvalidProbability(_))
        ));
    }

    #[test]
    fn oversized_design_is_an_error() {
        assert_eq!(
            counterbalance(&[("a", 3), ("b", 2)], usize::MAX),
            Err(ConfigError::TooManyTrials {
                repetitions: usize::MAX
            })
        );
        assert_eq!(
            counterbalance(&[("a", usize::MAX), ("b", 2)], 1),
            Err(ConfigError::TooManyTrials { repetitions: 1 })
        );

        let design = TestDesign::Interference {
            factors: InterferenceFactors::default(),
            repetitions: usize::MAX,
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            generate(&design, &mut rng),
            Err(ConfigError::TooManyTrials {
                repetitions: usize::MAX
            })
        );
        assert_eq!(design.planned_trials(), usize::MAX);
    }

    #[test]
    fn interference_words_follow_congruency() {
        let mut rng = StdRng::seed_from_u64(8);
        let trials = interference_trials(&InterferenceFactors::default(), 3, &mut rng).unwrap();
        assert_eq!(trials.len(), 3 * 4 * 3);
        for t in trials {
            let StimulusType::ColorWord {
                congruency,
                ink,
                word,
            } = t.stimulus
            else {
                panic!("expected a color word");
            };
            match congruency {
                Congruency::Congruent => assert_eq!(word, Some(ink)),
                Congruency::Incongruent => assert!(word.is_some_and(|w| w != ink)),
                Congruency::Neutral => assert_eq!(word, None),
            }
        }
    }

    #[test]
    fn invalid_design_fails_before_generation() {
        let design = TestDesign::Attention {
            factors: AttentionFactors {
                directions: Vec::new(),
                ..AttentionFactors::default()
            },
            repetitions: 1,
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            generate(&design, &mut rng),
            Err(ConfigError::EmptyFactor("directions"))
        );
    }
}
