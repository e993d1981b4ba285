pub mod availability;
pub mod error;
pub mod extra_bet;
pub mod outcome;
pub mod rules;
pub mod scoring;
pub mod standings;

pub use availability::{is_fixture_available, season_bets_open, select_available_fixtures};
pub use error::EngineError;
pub use extra_bet::{score_extra_bet, SeasonFacts};
pub use outcome::{MatchOutcome, Score};
pub use rules::{RuleTable, StagePoints};
pub use scoring::score_bet;
pub use standings::{compute_standings, Standing};
