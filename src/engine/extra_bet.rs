use serde::{Deserialize, Serialize};

use super::error::EngineError;
use super::rules::{BonusKind, RuleTable};

/// Season-end facts about the footballer and team chosen in one season
/// prediction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonFacts {
    /// Goals recorded for the chosen footballer so far.
    pub goal_count: u32,
    pub is_top_scorer: bool,
    pub is_champion: bool,
}

/// Bonus total for a season prediction:
///   goals * Goal + Top Scorer (if flagged) + World Champion (if flagged).
///
/// All three bonus rows are required, even when a flag is unset.
pub fn score_extra_bet(facts: SeasonFacts, rules: &RuleTable) -> Result<u32, EngineError> {
    let per_goal = rules.bonus(BonusKind::Goal)?;
    let top_scorer = rules.bonus(BonusKind::TopScorer)?;
    let champion = rules.bonus(BonusKind::WorldChampion)?;

    let mut points = facts.goal_count.checked_mul(per_goal);
    if facts.is_top_scorer {
        points = points.and_then(|p| p.checked_add(top_scorer));
    }
    if facts.is_champion {
        points = points.and_then(|p| p.checked_add(champion));
    }
    points.ok_or(EngineError::PointsOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::rules::StagePoints;

    fn bonus_rules() -> RuleTable {
        let mut rules = RuleTable::new();
        for (kind, other) in [
            (BonusKind::Goal, 2),
            (BonusKind::TopScorer, 10),
            (BonusKind::WorldChampion, 15),
        ] {
            rules.insert(
                kind.stage_name(),
                StagePoints {
                    other,
                    ..Default::default()
                },
            );
        }
        rules
    }

    #[test]
    fn test_goals_plus_top_scorer() {
        let facts = SeasonFacts {
            goal_count: 3,
            is_top_scorer: true,
            is_champion: false,
        };
        assert_eq!(score_extra_bet(facts, &bonus_rules()), Ok(16));
    }

    #[test]
    fn test_all_bonuses() {
        let facts = SeasonFacts {
            goal_count: 1,
            is_top_scorer: true,
            is_champion: true,
        };
        assert_eq!(score_extra_bet(facts, &bonus_rules()), Ok(27));
    }

    #[test]
    fn test_nothing_earned() {
        assert_eq!(score_extra_bet(SeasonFacts::default(), &bonus_rules()), Ok(0));
    }

    #[test]
    fn test_missing_bonus_row_fails_even_if_flag_unset() {
        let mut rules = RuleTable::new();
        rules.insert("Goal", StagePoints { other: 2, ..Default::default() });
        rules.insert("Top Scorer", StagePoints { other: 10, ..Default::default() });
        let err = score_extra_bet(SeasonFacts::default(), &rules).unwrap_err();
        assert_eq!(err, EngineError::RuleNotFound("World Champion".into()));
    }

    #[test]
    fn test_huge_goal_bonus_reports_overflow() {
        let mut rules = bonus_rules();
        rules.insert(
            "Goal",
            StagePoints {
                other: 3_000_000_000,
                ..Default::default()
            },
        );
        let facts = SeasonFacts {
            goal_count: 2,
            ..Default::default()
        };
        assert_eq!(score_extra_bet(facts, &rules), Err(EngineError::PointsOverflow));
    }

    #[test]
    fn test_bonus_sum_overflow_is_reported() {
        let mut rules = bonus_rules();
        rules.insert(
            "World Champion",
            StagePoints {
                other: u32::MAX,
                ..Default::default()
            },
        );
        let facts = SeasonFacts {
            goal_count: 1,
            is_top_scorer: false,
            is_champion: true,
        };
        assert_eq!(score_extra_bet(facts, &rules), Err(EngineError::PointsOverflow));
    }

    #[test]
    fn test_repeatable() {
        let facts = SeasonFacts {
            goal_count: 4,
            is_top_scorer: false,
            is_champion: true,
        };
        let rules = bonus_rules();
        assert_eq!(score_extra_bet(facts, &rules), score_extra_bet(facts, &rules));
    }
}
