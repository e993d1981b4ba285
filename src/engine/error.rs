use thiserror::Error;

/// Failures raised by the scoring engine and by the validation boundary
/// where fixtures, goals and predictions enter the system.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// No scoring row exists for the stage or bonus key.
    #[error("no scoring rule for stage '{0}'")]
    RuleNotFound(String),

    #[error("invalid fixture: {0}")]
    InvalidFixture(String),

    /// The scoring footballer's team did not play in the fixture.
    #[error("footballer {footballer_id} did not play in fixture {fixture_id}")]
    InvalidGoalEvent { footballer_id: i64, fixture_id: i64 },

    #[error("score values must be non-negative (got {home} : {away})")]
    InvalidScoreValue { home: i64, away: i64 },

    #[error("fixture {0} is not open for predictions")]
    FixtureNotAvailable(i64),

    #[error("season predictions are closed")]
    SeasonBetsClosed,

    /// A points total does not fit the stored integer width.
    #[error("points total overflows")]
    PointsOverflow,

    /// A unique name or code is already taken.
    #[error("{0} already exists")]
    Duplicate(String),

    #[error("{0} {1} not found")]
    NotFound(&'static str, i64),
}
