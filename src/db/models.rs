use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::availability::Schedulable;
use crate::engine::{MatchOutcome, Score};

/// A pool participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    /// Three-letter code, e.g. "ARG"
    pub short_name: String,
    pub is_champion: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Footballer {
    pub id: i64,
    pub name: String,
    pub team_id: i64,
    pub is_top_scorer: bool,
}

/// A scheduled match between two teams
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub id: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub kickoff: DateTime<Utc>,
    /// Stage name, keys into the rule table
    pub stage: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
}

impl Fixture {
    pub fn outcome(&self) -> MatchOutcome {
        Score::from_halves(self.home_score, self.away_score).into()
    }
}

impl Schedulable for Fixture {
    fn fixture_id(&self) -> i64 {
        self.id
    }

    fn home_team_id(&self) -> i64 {
        self.home_team_id
    }

    fn away_team_id(&self) -> i64 {
        self.away_team_id
    }

    fn kickoff(&self) -> DateTime<Utc> {
        self.kickoff
    }
}

/// A player's predicted score for one fixture
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: i64,
    pub fixture_id: i64,
    pub player_id: i64,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    /// Derived; rewritten on every recompute
    pub points: u32,
    pub updated_at: DateTime<Utc>,
}

impl Bet {
    pub fn prediction(&self) -> Option<Score> {
        Score::from_halves(self.home_score, self.away_score)
    }
}

/// A player's season-long prediction (top scorer pick + champion pick)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraBet {
    pub id: i64,
    pub player_id: i64,
    pub footballer_id: i64,
    pub team_id: i64,
    pub points: u32,
    pub updated_at: DateTime<Utc>,
}
