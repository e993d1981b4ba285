use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::error::EngineError;

/// A full-time score (or a predicted one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

impl Score {
    pub fn new(home: u32, away: u32) -> Self {
        Self { home, away }
    }

    /// Validate raw input at the submission boundary.
    pub fn try_new(home: i64, away: i64) -> Result<Self, EngineError> {
        match (u32::try_from(home), u32::try_from(away)) {
            (Ok(h), Ok(a)) => Ok(Self::new(h, a)),
            _ => Err(EngineError::InvalidScoreValue { home, away }),
        }
    }

    /// A score exists only when both halves are present.
    pub fn from_halves(home: Option<u32>, away: Option<u32>) -> Option<Self> {
        Some(Self::new(home?, away?))
    }

    pub fn goal_difference(&self) -> i64 {
        i64::from(self.home) - i64::from(self.away)
    }

    /// Win/draw/loss from the home side's point of view.
    pub fn direction(&self) -> Ordering {
        self.home.cmp(&self.away)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} : {}", self.home, self.away)
    }
}

/// Result of a fixture: either both halves are known or none is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "score", rename_all = "snake_case")]
pub enum MatchOutcome {
    #[default]
    Undecided,
    Decided(Score),
}

impl MatchOutcome {
    pub fn score(&self) -> Option<Score> {
        match self {
            MatchOutcome::Decided(score) => Some(*score),
            MatchOutcome::Undecided => None,
        }
    }
}

impl From<Option<Score>> for MatchOutcome {
    fn from(score: Option<Score>) -> Self {
        score.map_or(MatchOutcome::Undecided, MatchOutcome::Decided)
    }
}

impl fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOutcome::Decided(score) => score.fmt(f),
            MatchOutcome::Undecided => f.write_str("-"),
        }
    }
}
