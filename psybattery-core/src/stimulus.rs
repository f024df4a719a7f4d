use serde::{Deserialize, Serialize};

use crate::trial::Response;

/// Describes what a trial presents and what it expects back.
pub trait Stimulus: Clone + Send + Sync + std::fmt::Debug {
    /// Whether the Cue phase is shown before the target.
    fn cue_shown(&self) -> bool;
    /// The single response that counts as correct, or `None` when the
    /// correct behaviour is to withhold.
    fn expected_response(&self) -> Option<Response>;
    /// Trials without a ground truth (n-back warm-up) are excluded from scoring.
    fn is_scored(&self) -> bool;
    /// `(factor, level)` pairs used to group reaction times.
    fn conditions(&self) -> Vec<(&'static str, &'static str)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CueType {
    None,
    Center,
    Spatial,
}

impl CueType {
    pub fn label(self) -> &'static str {
        match self {
            CueType::None => "none",
            CueType::Center => "center",
            CueType::Spatial => "spatial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Congruency {
    Congruent,
    Incongruent,
    Neutral,
}

impl Congruency {
    pub fn label(self) -> &'static str {
        match self {
            Congruency::Congruent => "congruent",
            Congruency::Incongruent => "incongruent",
            Congruency::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Vertical placement of the target row relative to fixation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Above,
    Below,
}

impl Placement {
    pub fn label(self) -> &'static str {
        match self {
            Placement::Above => "above",
            Placement::Below => "below",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InkColor {
    Red,
    Green,
    Blue,
    Yellow,
}

impl InkColor {
    pub const ALL: [InkColor; 4] = [
        InkColor::Red,
        InkColor::Green,
        InkColor::Blue,
        InkColor::Yellow,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InkColor::Red => "red",
            InkColor::Green => "green",
            InkColor::Blue => "blue",
            InkColor::Yellow => "yellow",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StimulusType {
    /// Flanker row preceded by an optional warning cue.
    Flanker {
        cue: CueType,
        congruency: Congruency,
        direction: Direction,
        placement: Placement,
    },
    /// One highlighted cell of the n-back grid.
    Grid {
        position: u8,
        /// `None` while the sequence is still shorter than the lag.
        is_target: Option<bool>,
    },
    /// Color word printed in an ink color. `word` is `None` for a neutral
    /// (non-color) word.
    ColorWord {
        congruency: Congruency,
        ink: InkColor,
        word: Option<InkColor>,
    },
}

impl Stimulus for StimulusType {
    fn cue_shown(&self) -> bool {
        matches!(self, StimulusType::Flanker { cue, .. } if *cue != CueType::None)
    }

    fn expected_response(&self) -> Option<Response> {
        match self {
            StimulusType::Flanker { direction, .. } => Some(Response::Direction(*direction)),
            StimulusType::Grid { is_target, .. } => {
                is_target.unwrap_or(false).then_some(Response::Match)
            }
            StimulusType::ColorWord { ink, .. } => Some(Response::Color(*ink)),
        }
    }

    fn is_scored(&self) -> bool {
        !matches!(self, StimulusType::Grid { is_target: None, .. })
    }

    fn conditions(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            StimulusType::Flanker {
                cue,
                congruency,
                direction,
                placement,
            } => vec![
                ("cue", cue.label()),
                ("flanker", congruency.label()),
                ("direction", direction.label()),
                ("placement", placement.label()),
            ],
            StimulusType::Grid { is_target, .. } => match is_target {
                Some(true) => vec![("target", "target")],
                Some(false) => vec![("target", "non_target")],
                None => Vec::new(),
            },
            StimulusType::ColorWord {
                congruency, ink, ..
            } => vec![("congruency", congruency.label()), ("ink", ink.label())],
        }
    }
}
