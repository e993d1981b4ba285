//! Which fixtures currently accept predictions.
//!
//! A fixture is a candidate while `now < kickoff <= now + lookahead`.
//! Candidates are then walked in kickoff order and each team may hold at
//! most one open fixture: the earliest one claims both of its teams and any
//! later candidate touching a claimed team is dropped.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use tracing::debug;

pub const DEFAULT_LOOKAHEAD_DAYS: i64 = 3;

/// Anything with a kickoff and a team pair can be scheduled for betting.
pub trait Schedulable {
    fn fixture_id(&self) -> i64;
    fn home_team_id(&self) -> i64;
    fn away_team_id(&self) -> i64;
    fn kickoff(&self) -> DateTime<Utc>;
}

fn inside_window(kickoff: DateTime<Utc>, now: DateTime<Utc>, lookahead: Duration) -> bool {
    kickoff > now && kickoff <= now + lookahead
}

/// Fixtures open for prediction, in ascending kickoff order.
///
/// Kickoff ties are broken by fixture id so the result never depends on
/// the order the caller happened to load fixtures in.
pub fn select_available_fixtures<F: Schedulable>(
    fixtures: &[F],
    now: DateTime<Utc>,
    lookahead: Duration,
) -> Vec<&F> {
    let mut ordered: Vec<&F> = fixtures.iter().collect();
    ordered.sort_by_key(|f| (f.kickoff(), f.fixture_id()));

    let mut claimed: HashSet<i64> = HashSet::new();
    let mut open = Vec::new();
    for fixture in ordered {
        if !inside_window(fixture.kickoff(), now, lookahead) {
            continue;
        }
        let (home, away) = (fixture.home_team_id(), fixture.away_team_id());
        if claimed.contains(&home) || claimed.contains(&away) {
            debug!(fixture_id = fixture.fixture_id(), "fixture shares a team with an earlier one");
            continue;
        }
        claimed.insert(home);
        claimed.insert(away);
        open.push(fixture);
    }
    open
}

/// Whether `fixture_id` is in the current open set, evaluated against the
/// full fixture list every time.
pub fn is_fixture_available<F: Schedulable>(
    fixture_id: i64,
    fixtures: &[F],
    now: DateTime<Utc>,
    lookahead: Duration,
) -> bool {
    select_available_fixtures(fixtures, now, lookahead)
        .iter()
        .any(|f| f.fixture_id() == fixture_id)
}

/// Season predictions stay editable until the first fixture kicks off.
pub fn season_bets_open<F: Schedulable>(fixtures: &[F], now: DateTime<Utc>) -> bool {
    fixtures
        .iter()
        .map(Schedulable::kickoff)
        .min()
        .map_or(true, |first| now < first)
}
