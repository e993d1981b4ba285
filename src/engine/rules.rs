use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::EngineError;

/// Point values awarded for one competition stage.
///
/// `other` is only meaningful for the bonus rows (see [`BonusKind`]); real
/// fixture stages carry `other == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePoints {
    pub exact: u32,
    pub goal_diff: u32,
    pub direction: u32,
    pub other: u32,
}

/// Season-long bonus categories, each backed by a named RuleTable row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BonusKind {
    Goal,
    TopScorer,
    WorldChampion,
}

impl BonusKind {
    pub const ALL: [BonusKind; 3] = [BonusKind::Goal, BonusKind::TopScorer, BonusKind::WorldChampion];

    /// Stage name under which the bonus row is stored.
    pub fn stage_name(self) -> &'static str {
        match self {
            BonusKind::Goal => "Goal",
            BonusKind::TopScorer => "Top Scorer",
            BonusKind::WorldChampion => "World Champion",
        }
    }

    pub fn from_stage_name(stage: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.stage_name() == stage)
    }
}

/// Snapshot of every scoring row, keyed by stage name.
///
/// A scoring pass works against one snapshot, so a rule edited while the
/// pass runs is never observed halfway through.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rows: HashMap<String, StagePoints>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stage: impl Into<String>, points: StagePoints) {
        self.rows.insert(stage.into(), points);
    }

    pub fn lookup(&self, stage: &str) -> Result<&StagePoints, EngineError> {
        self.rows
            .get(stage)
            .ok_or_else(|| EngineError::RuleNotFound(stage.to_string()))
    }

    /// Bonus value (`other`) of the row backing `kind`.
    pub fn bonus(&self, kind: BonusKind) -> Result<u32, EngineError> {
        self.lookup(kind.stage_name()).map(|row| row.other)
    }

    /// Bonus kinds with no backing row, for start-up configuration checks.
    pub fn missing_bonus_rows(&self) -> Vec<BonusKind> {
        BonusKind::ALL
            .into_iter()
            .filter(|kind| !self.rows.contains_key(kind.stage_name()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
