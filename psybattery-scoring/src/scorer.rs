use std::collections::BTreeMap;

use psybattery_core::{RecordedResponse, Stimulus, TestKind};

use crate::probit::z_score;
use crate::report::{
    ConditionRt, DetectionScores, InterferenceScores, NetworkScores, ScoreReport,
};
use crate::stats::{mean, median, ratio, std_dev};

/// Signal-detection outcome of a binary detection trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
    FalseAlarm,
    CorrectRejection,
}

/// Classifies a detection trial. `None` when the trial has no target status
/// (non-detection tasks and the n-back warm-up).
pub fn classify(response: &RecordedResponse) -> Option<Outcome> {
    let is_target = response.trial.is_target()?;
    Some(match (is_target, response.responded()) {
        (true, true) => Outcome::Hit,
        (true, false) => Outcome::Miss,
        (false, true) => Outcome::FalseAlarm,
        (false, false) => Outcome::CorrectRejection,
    })
}

#[derive(Default)]
struct ConditionAcc {
    trials: usize,
    correct: usize,
    rts: Vec<f64>,
}

/// Scores a completed run. Only scored trials count; RT statistics use
/// correct responses only.
pub fn score(test: TestKind, responses: &[RecordedResponse]) -> ScoreReport {
    let mut report = ScoreReport::empty(test);
    report.total_trials = responses.len();

    let scored: Vec<&RecordedResponse> =
        responses.iter().filter(|r| r.trial.is_scored()).collect();
    report.scored_trials = scored.len();

    let mut correct_rts = Vec::new();
    let mut by_condition: BTreeMap<(&'static str, &'static str), ConditionAcc> = BTreeMap::new();

    for r in &scored {
        let correct = judged_correct(test, r);
        // A correct rejection is right but carries no timing signal.
        let timed = correct && r.responded();
        if correct {
            report.correct += 1;
        }
        if timed {
            correct_rts.push(r.reaction_time_ms);
        }
        for key in r.trial.stimulus.conditions() {
            let acc = by_condition.entry(key).or_default();
            acc.trials += 1;
            if correct {
                acc.correct += 1;
            }
            if timed {
                acc.rts.push(r.reaction_time_ms);
            }
        }
    }

    report.accuracy = ratio(report.correct, report.scored_trials);
    report.mean_rt_ms = mean(&correct_rts);
    report.median_rt_ms = median(&correct_rts);
    report.sd_rt_ms = std_dev(&correct_rts, report.mean_rt_ms);
    report.conditions = by_condition
        .into_iter()
        .map(|((factor, level), acc)| ConditionRt {
            factor: factor.to_string(),
            level: level.to_string(),
            trials: acc.trials,
            correct: acc.correct,
            accuracy: ratio(acc.correct, acc.trials),
            timed: acc.rts.len(),
            mean_rt_ms: mean(&acc.rts),
        })
        .collect();

    match test {
        TestKind::Updating => report.detection = Some(detection_scores(&scored)),
        TestKind::Attention => report.networks = Some(network_scores(&report)),
        TestKind::Interference => report.interference = Some(interference_scores(&report)),
    }

    tracing::debug!(
        test = test.id(),
        scored = report.scored_trials,
        accuracy = report.accuracy,
        mean_rt_ms = report.mean_rt_ms,
        "scored run"
    );
    report
}

fn judged_correct(test: TestKind, r: &RecordedResponse) -> bool {
    if test.is_detection() {
        matches!(
            classify(r),
            Some(Outcome::Hit | Outcome::CorrectRejection)
        )
    } else {
        r.correct
    }
}

fn detection_scores(scored: &[&RecordedResponse]) -> DetectionScores {
    let mut d = DetectionScores::default();
    for r in scored {
        match classify(r) {
            Some(Outcome::Hit) => d.hits += 1,
            Some(Outcome::Miss) => d.misses += 1,
            Some(Outcome::FalseAlarm) => d.false_alarms += 1,
            Some(Outcome::CorrectRejection) => d.correct_rejections += 1,
            None => {}
        }
    }
    d.targets = d.hits + d.misses;
    d.non_targets = d.false_alarms + d.correct_rejections;
    d.hit_rate = ratio(d.hits, d.targets);
    d.false_alarm_rate = ratio(d.false_alarms, d.non_targets);

    if d.targets + d.non_targets == 0 {
        return d;
    }
    d.z_hit = z_score(d.hit_rate);
    d.z_false_alarm = z_score(d.false_alarm_rate);
    d.d_prime = d.z_hit - d.z_false_alarm;
    d.sensitivity = d.d_prime.max(0.0);
    d.criterion = -0.5 * (d.z_hit + d.z_false_alarm);
    d
}

fn network_scores(report: &ScoreReport) -> NetworkScores {
    let alerting_ms = report.rt_difference("cue", "none", "center");
    let orienting_ms = report.rt_difference("cue", "center", "spatial");
    let executive_ms = report.rt_difference("flanker", "incongruent", "congruent");
    NetworkScores {
        alerting_ms,
        orienting_ms,
        executive_ms,
        alerting: alerting_ms.max(0.0),
        orienting: orienting_ms.max(0.0),
        executive: executive_ms.max(0.0),
    }
}

fn interference_scores(report: &ScoreReport) -> InterferenceScores {
    let interference_ms = report.rt_difference("congruency", "incongruent", "congruent");
    let accuracy = |level: &str| {
        report
            .condition("congruency", level)
            .map_or(0.0, |c| c.accuracy)
    };
    InterferenceScores {
        interference_ms,
        interference: interference_ms.max(0.0),
        congruent_accuracy: accuracy("congruent"),
        incongruent_accuracy: accuracy("incongruent"),
    }
}
