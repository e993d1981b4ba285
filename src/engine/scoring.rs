//! Fixture prediction scoring.
//!
//! A prediction is placed in exactly one accuracy tier, checked in order:
//!   1. exact score
//!   2. same goal difference (a predicted draw on a drawn match lands here)
//!   3. same win/draw/loss direction
//!   4. miss
//! Only the first matching tier is paid out; tiers are never summed.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::EngineError;
use super::outcome::{MatchOutcome, Score};
use super::rules::{RuleTable, StagePoints};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitKind {
    Exact,
    GoalDifference,
    Direction,
    Miss,
}

impl HitKind {
    pub fn points(self, row: &StagePoints) -> u32 {
        match self {
            HitKind::Exact => row.exact,
            HitKind::GoalDifference => row.goal_diff,
            HitKind::Direction => row.direction,
            HitKind::Miss => 0,
        }
    }
}

/// Place a predicted score in its accuracy tier against the actual score.
pub fn classify(actual: Score, predicted: Score) -> HitKind {
    if actual == predicted {
        HitKind::Exact
    } else if actual.goal_difference() == predicted.goal_difference() {
        HitKind::GoalDifference
    } else if actual.direction() == predicted.direction() {
        HitKind::Direction
    } else {
        HitKind::Miss
    }
}

/// Points for one prediction on a fixture played in `stage`.
///
/// Undecided fixtures and absent predictions score 0 without consulting
/// the rule table.
pub fn score_bet(
    outcome: &MatchOutcome,
    predicted: Option<Score>,
    stage: &str,
    rules: &RuleTable,
) -> Result<u32, EngineError> {
    let (actual, predicted) = match (outcome.score(), predicted) {
        (Some(actual), Some(predicted)) => (actual, predicted),
        _ => return Ok(0),
    };

    let row = rules.lookup(stage)?;
    let hit = classify(actual, predicted);
    let points = hit.points(row);
    debug!(%actual, %predicted, stage, ?hit, points, "scored prediction");
    Ok(points)
}
