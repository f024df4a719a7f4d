use psybattery_core::TestKind;
use serde::{Deserialize, Serialize};

/// Accuracy and mean correct RT for one level of one factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRt {
    pub factor: String,
    pub level: String,
    pub trials: usize,
    pub correct: usize,
    pub accuracy: f64,
    /// Responses behind `mean_rt_ms`.
    pub timed: usize,
    pub mean_rt_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionScores {
    pub targets: usize,
    pub non_targets: usize,
    pub hits: usize,
    pub misses: usize,
    pub false_alarms: usize,
    pub correct_rejections: usize,
    pub hit_rate: f64,
    pub false_alarm_rate: f64,
    pub z_hit: f64,
    pub z_false_alarm: f64,
    /// Signed d′.
    pub d_prime: f64,
    /// d′ clamped at zero.
    pub sensitivity: f64,
    /// Response bias c = −(z(H) + z(F)) / 2.
    pub criterion: f64,
}

/// Attention network scores. The `_ms` fields are signed RT differences; the
/// bare fields are the same differences clamped at zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NetworkScores {
    pub alerting_ms: f64,
    pub orienting_ms: f64,
    pub executive_ms: f64,
    pub alerting: f64,
    pub orienting: f64,
    pub executive: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InterferenceScores {
    /// RT(incongruent) − RT(congruent), signed.
    pub interference_ms: f64,
    /// `interference_ms` clamped at zero.
    pub interference: f64,
    pub congruent_accuracy: f64,
    pub incongruent_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub test: TestKind,
    pub total_trials: usize,
    pub scored_trials: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub mean_rt_ms: f64,
    pub median_rt_ms: f64,
    pub sd_rt_ms: f64,
    pub conditions: Vec<ConditionRt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection: Option<DetectionScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<NetworkScores>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interference: Option<InterferenceScores>,
}

impl ScoreReport {
    pub fn empty(test: TestKind) -> Self {
        Self {
            test,
            total_trials: 0,
            scored_trials: 0,
            correct: 0,
            accuracy: 0.0,
            mean_rt_ms: 0.0,
            median_rt_ms: 0.0,
            sd_rt_ms: 0.0,
            conditions: Vec::new(),
            detection: None,
            networks: None,
            interference: None,
        }
    }

    pub fn condition(&self, factor: &str, level: &str) -> Option<&ConditionRt> {
        self.conditions
            .iter()
            .find(|c| c.factor == factor && c.level == level)
    }

    /// Mean correct RT of a condition, 0 if it never produced a correct response.
    pub fn mean_rt(&self, factor: &str, level: &str) -> f64 {
        self.condition(factor, level).map_or(0.0, |c| c.mean_rt_ms)
    }

    /// `mean_rt(slow) - mean_rt(fast)` within one factor, or 0 when either
    /// level has no timed correct response.
    pub fn rt_difference(&self, factor: &str, slow: &str, fast: &str) -> f64 {
        let timed = |level: &str| self.condition(factor, level).filter(|c| c.timed > 0);
        match (timed(slow), timed(fast)) {
            (Some(s), Some(f)) => s.mean_rt_ms - f.mean_rt_ms,
            _ => 0.0,
        }
    }

    /// Every float in the report, for finiteness checks.
    pub fn values(&self) -> Vec<f64> {
        let mut out = vec![
            self.accuracy,
            self.mean_rt_ms,
            self.median_rt_ms,
            self.sd_rt_ms,
        ];
        for c in &self.conditions {
            out.extend([c.accuracy, c.mean_rt_ms]);
        }
        if let Some(d) = &self.detection {
            out.extend([
                d.hit_rate,
                d.false_alarm_rate,
                d.z_hit,
                d.z_false_alarm,
                d.d_prime,
                d.sensitivity,
                d.criterion,
            ]);
        }
        if let Some(n) = &self.networks {
            out.extend([
                n.alerting_ms,
                n.orienting_ms,
                n.executive_ms,
                n.alerting,
                n.orienting,
                n.executive,
            ]);
        }
        if let Some(i) = &self.interference {
            out.extend([
                i.interference_ms,
                i.interference,
                i.congruent_accuracy,
                i.incongruent_accuracy,
            ]);
        }
        out
    }
}
