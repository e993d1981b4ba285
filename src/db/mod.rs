use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

pub mod models;
use models::*;

use crate::engine::rules::BonusKind;
use crate::engine::{
    self, score_bet, score_extra_bet, EngineError, RuleTable, Score, SeasonFacts, StagePoints,
    Standing,
};

/// Thread-safe SQLite connection pool (single connection with mutex)
///
/// Every operation that changes a scoring fact recomputes the dependent
/// points inside the same transaction, so stored points never lag behind
/// results, goals or flags.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database mutex poisoned"))
    }

    // ── Scoring rules ────────────────────────────────────────────────────────

    /// Insert or replace a stage row and rescore everything scored against it.
    ///
    /// Editing a bonus row rescores every season prediction; editing a
    /// fixture stage rescores the predictions on that stage's fixtures.
    pub fn upsert_rule(&self, stage: &str, points: StagePoints) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO stages (name, exact, goal_diff, direction, other)
             VALUES (?1,?2,?3,?4,?5)
             ON CONFLICT(name) DO UPDATE SET
                exact=excluded.exact,
                goal_diff=excluded.goal_diff,
                direction=excluded.direction,
                other=excluded.other",
            params![
                stage,
                points.exact,
                points.goal_diff,
                points.direction,
                points.other
            ],
        )?;
        let rules = load_rules(&tx)?;
        let rescored = if BonusKind::from_stage_name(stage).is_some() {
            rescore_extra_bets(&tx, ExtraBetFilter::All, &rules)?
        } else {
            let mut rescored = 0;
            for fixture in load_fixtures(&tx)?.iter().filter(|f| f.stage == stage) {
                rescored += rescore_fixture_bets(&tx, fixture, &rules)?;
            }
            rescored
        };
        tx.commit()?;
        info!(stage, rescored, "scoring rule updated");
        Ok(rescored)
    }

    /// Snapshot of the full rule table
    pub fn rule_table(&self) -> Result<RuleTable> {
        let conn = self.conn()?;
        load_rules(&conn)
    }

    // ── Participants ─────────────────────────────────────────────────────────

    pub fn add_player(&self, name: &str, email: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO players (name, email) VALUES (?1, ?2)",
            params![name, email],
        )
        .map_err(|e| unique_violation(e, "player with this email"))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn add_team(&self, name: &str, short_name: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO teams (name, short_name) VALUES (?1, ?2)",
            params![name, short_name],
        )
        .map_err(|e| unique_violation(e, "team with this name or code"))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn add_footballer(&self, name: &str, team_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        load_team(&conn, team_id)?;
        conn.execute(
            "INSERT INTO footballers (name, team_id) VALUES (?1, ?2)",
            params![name, team_id],
        )
        .map_err(|e| unique_violation(e, "footballer with this name"))?;
        Ok(conn.last_insert_rowid())
    }

    // ── Fixtures ─────────────────────────────────────────────────────────────

    /// Create a fixture after checking the team pair and stage row
    pub fn add_fixture(
        &self,
        home_team_id: i64,
        away_team_id: i64,
        kickoff: DateTime<Utc>,
        stage: &str,
    ) -> Result<i64> {
        if home_team_id == away_team_id {
            return Err(EngineError::InvalidFixture(
                "home team must be different from away team".into(),
            )
            .into());
        }
        let conn = self.conn()?;
        load_team(&conn, home_team_id)?;
        load_team(&conn, away_team_id)?;

        let rules = load_rules(&conn)?;
        if rules.lookup(stage)?.other != 0 {
            return Err(EngineError::InvalidFixture(format!(
                "'{stage}' is a bonus row, not a fixture stage"
            ))
            .into());
        }

        conn.execute(
            "INSERT INTO fixtures (home_team_id, away_team_id, kickoff, stage)
             VALUES (?1,?2,?3,?4)",
            params![home_team_id, away_team_id, kickoff, stage],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All fixtures in kickoff order
    pub fn list_fixtures(&self) -> Result<Vec<Fixture>> {
        let conn = self.conn()?;
        load_fixtures(&conn)
    }

    pub fn get_fixture(&self, id: i64) -> Result<Fixture> {
        let conn = self.conn()?;
        load_fixture(&conn, id)
    }

    /// Fixtures currently open for predictions
    pub fn available_fixtures(&self, now: DateTime<Utc>, lookahead: Duration) -> Result<Vec<Fixture>> {
        let fixtures = self.list_fixtures()?;
        Ok(engine::select_available_fixtures(&fixtures, now, lookahead)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn fixture_available(&self, id: i64, now: DateTime<Utc>, lookahead: Duration) -> Result<bool> {
        let conn = self.conn()?;
        load_fixture(&conn, id)?;
        let fixtures = load_fixtures(&conn)?;
        Ok(engine::is_fixture_available(id, &fixtures, now, lookahead))
    }

    /// Record a final score and rescore every prediction on the fixture.
    ///
    /// Returns the number of predictions rescored. Nothing is written if any
    /// prediction fails to score.
    pub fn record_result(&self, fixture_id: i64, score: Score) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        load_fixture(&tx, fixture_id)?;
        tx.execute(
            "UPDATE fixtures SET home_score=?1, away_score=?2 WHERE id=?3",
            params![score.home, score.away, fixture_id],
        )?;
        let fixture = load_fixture(&tx, fixture_id)?;
        let rules = load_rules(&tx)?;
        let rescored = rescore_fixture_bets(&tx, &fixture, &rules)?;
        tx.commit()?;
        info!(fixture_id, %score, rescored, "result recorded");
        Ok(rescored)
    }

    // ── Goals and season flags ───────────────────────────────────────────────

    /// Record a goal and rescore season predictions picking the scorer
    pub fn record_goal(&self, footballer_id: i64, fixture_id: i64, now: DateTime<Utc>) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let footballer = load_footballer(&tx, footballer_id)?;
        let fixture = load_fixture(&tx, fixture_id)?;
        if footballer.team_id != fixture.home_team_id && footballer.team_id != fixture.away_team_id {
            return Err(EngineError::InvalidGoalEvent {
                footballer_id,
                fixture_id,
            }
            .into());
        }
        tx.execute(
            "INSERT INTO goals (footballer_id, fixture_id, recorded_at) VALUES (?1,?2,?3)",
            params![footballer_id, fixture_id, now],
        )?;
        let rules = load_rules(&tx)?;
        let rescored = rescore_extra_bets(&tx, ExtraBetFilter::Footballer(footballer_id), &rules)?;
        tx.commit()?;
        info!(footballer_id, fixture_id, rescored, "goal recorded");
        Ok(rescored)
    }

    pub fn set_top_scorer(&self, footballer_id: i64, is_top_scorer: bool) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        load_footballer(&tx, footballer_id)?;
        tx.execute(
            "UPDATE footballers SET is_top_scorer=?1 WHERE id=?2",
            params![is_top_scorer, footballer_id],
        )?;
        let rules = load_rules(&tx)?;
        let rescored = rescore_extra_bets(&tx, ExtraBetFilter::Footballer(footballer_id), &rules)?;
        tx.commit()?;
        info!(footballer_id, is_top_scorer, rescored, "top scorer flag updated");
        Ok(rescored)
    }

    pub fn set_champion(&self, team_id: i64, is_champion: bool) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        load_team(&tx, team_id)?;
        tx.execute(
            "UPDATE teams SET is_champion=?1 WHERE id=?2",
            params![is_champion, team_id],
        )?;
        let rules = load_rules(&tx)?;
        let rescored = rescore_extra_bets(&tx, ExtraBetFilter::Team(team_id), &rules)?;
        tx.commit()?;
        info!(team_id, is_champion, rescored, "champion flag updated");
        Ok(rescored)
    }

    // ── Predictions ──────────────────────────────────────────────────────────

    /// Create or replace a player's prediction on an open fixture
    pub fn place_bet(
        &self,
        player_id: i64,
        fixture_id: i64,
        prediction: Option<Score>,
        now: DateTime<Utc>,
        lookahead: Duration,
    ) -> Result<Bet> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        load_player(&tx, player_id)?;
        let fixture = load_fixture(&tx, fixture_id)?;
        let fixtures = load_fixtures(&tx)?;
        if !engine::is_fixture_available(fixture_id, &fixtures, now, lookahead) {
            warn!(player_id, fixture_id, "prediction rejected, fixture not open");
            return Err(EngineError::FixtureNotAvailable(fixture_id).into());
        }

        let rules = load_rules(&tx)?;
        let points = score_bet(&fixture.outcome(), prediction, &fixture.stage, &rules)?;
        tx.execute(
            "INSERT INTO bets (fixture_id, player_id, home_score, away_score, points, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6)
             ON CONFLICT(fixture_id, player_id) DO UPDATE SET
                home_score=excluded.home_score,
                away_score=excluded.away_score,
                points=excluded.points,
                updated_at=excluded.updated_at",
            params![
                fixture_id,
                player_id,
                prediction.map(|s| s.home),
                prediction.map(|s| s.away),
                points,
                now,
            ],
        )?;
        let bet = tx.query_row(
            "SELECT id, fixture_id, player_id, home_score, away_score, points, updated_at
             FROM bets WHERE fixture_id=?1 AND player_id=?2",
            params![fixture_id, player_id],
            map_bet,
        )?;
        tx.commit()?;
        Ok(bet)
    }

    /// Create or replace a player's season prediction before the first kickoff
    pub fn place_extra_bet(
        &self,
        player_id: i64,
        footballer_id: i64,
        team_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ExtraBet> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        load_player(&tx, player_id)?;
        let footballer = load_footballer(&tx, footballer_id)?;
        let team = load_team(&tx, team_id)?;
        let fixtures = load_fixtures(&tx)?;
        if !engine::season_bets_open(&fixtures, now) {
            warn!(player_id, "season prediction rejected, tournament started");
            return Err(EngineError::SeasonBetsClosed.into());
        }

        let rules = load_rules(&tx)?;
        let facts = SeasonFacts {
            goal_count: count_goals(&tx, footballer_id)?,
            is_top_scorer: footballer.is_top_scorer,
            is_champion: team.is_champion,
        };
        let points = score_extra_bet(facts, &rules)?;
        tx.execute(
            "INSERT INTO extra_bets (player_id, footballer_id, team_id, points, updated_at)
             VALUES (?1,?2,?3,?4,?5)
             ON CONFLICT(player_id) DO UPDATE SET
                footballer_id=excluded.footballer_id,
                team_id=excluded.team_id,
                points=excluded.points,
                updated_at=excluded.updated_at",
            params![player_id, footballer_id, team_id, points, now],
        )?;
        let extra = tx.query_row(
            "SELECT id, player_id, footballer_id, team_id, points, updated_at
             FROM extra_bets WHERE player_id=?1",
            params![player_id],
            map_extra_bet,
        )?;
        tx.commit()?;
        Ok(extra)
    }

    pub fn list_player_bets(&self, player_id: i64) -> Result<Vec<Bet>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT b.id, b.fixture_id, b.player_id, b.home_score, b.away_score, b.points, b.updated_at
             FROM bets b JOIN fixtures f ON f.id = b.fixture_id
             WHERE b.player_id=?1 ORDER BY f.kickoff, b.id",
        )?;
        let bets = stmt
            .query_map(params![player_id], map_bet)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(bets)
    }

    // ── Standings ────────────────────────────────────────────────────────────

    pub fn standings(&self) -> Result<Vec<Standing>> {
        let conn = self.conn()?;
        let players = conn
            .prepare("SELECT id, name FROM players")?
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<(i64, String)>>>()?;
        let bet_points = conn
            .prepare("SELECT player_id, points FROM bets")?
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<(i64, u32)>>>()?;
        let extra_points = conn
            .prepare("SELECT player_id, points FROM extra_bets")?
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<(i64, u32)>>>()?;
        Ok(engine::compute_standings(&players, &bet_points, &extra_points))
    }
}

// ── Recompute passes ──────────────────────────────────────────────────────────

enum ExtraBetFilter {
    Footballer(i64),
    Team(i64),
    All,
}

/// Rescore all predictions on a fixture. Points are computed for every bet
/// before the first write, so a missing rule leaves all of them untouched.
fn rescore_fixture_bets(conn: &Connection, fixture: &Fixture, rules: &RuleTable) -> Result<usize> {
    let mut stmt = conn.prepare(
        "SELECT id, fixture_id, player_id, home_score, away_score, points, updated_at
         FROM bets WHERE fixture_id=?1",
    )?;
    let bets = stmt
        .query_map(params![fixture.id], map_bet)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let outcome = fixture.outcome();
    let rescored = bets
        .iter()
        .map(|bet| Ok((bet.id, score_bet(&outcome, bet.prediction(), &fixture.stage, rules)?)))
        .collect::<Result<Vec<(i64, u32)>, EngineError>>()?;

    for (id, points) in &rescored {
        conn.execute("UPDATE bets SET points=?1 WHERE id=?2", params![points, id])?;
    }
    Ok(rescored.len())
}

/// Rescore every season prediction that picked the given footballer or team
/// (or all of them).
fn rescore_extra_bets(conn: &Connection, filter: ExtraBetFilter, rules: &RuleTable) -> Result<usize> {
    const SELECT_SEASON_ROWS: &str = "SELECT e.id, f.id, f.is_top_scorer, t.is_champion
         FROM extra_bets e
         JOIN footballers f ON f.id = e.footballer_id
         JOIN teams t ON t.id = e.team_id";
    let mut stmt;
    let rows = match filter {
        ExtraBetFilter::Footballer(id) => {
            stmt = conn.prepare(&format!("{SELECT_SEASON_ROWS} WHERE e.footballer_id=?1"))?;
            stmt.query_map(params![id], map_season_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        }
        ExtraBetFilter::Team(id) => {
            stmt = conn.prepare(&format!("{SELECT_SEASON_ROWS} WHERE e.team_id=?1"))?;
            stmt.query_map(params![id], map_season_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        }
        ExtraBetFilter::All => {
            stmt = conn.prepare(SELECT_SEASON_ROWS)?;
            stmt.query_map([], map_season_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?
        }
    };

    let mut rescored = Vec::with_capacity(rows.len());
    for (extra_id, footballer_id, is_top_scorer, is_champion) in rows {
        let facts = SeasonFacts {
            goal_count: count_goals(conn, footballer_id)?,
            is_top_scorer,
            is_champion,
        };
        rescored.push((extra_id, score_extra_bet(facts, rules)?));
    }

    for (id, points) in &rescored {
        conn.execute("UPDATE extra_bets SET points=?1 WHERE id=?2", params![points, id])?;
    }
    Ok(rescored.len())
}

// ── SQL helpers ────────────────────────────────────────────────────────────────

fn load_rules(conn: &Connection) -> Result<RuleTable> {
    let mut stmt = conn.prepare("SELECT name, exact, goal_diff, direction, other FROM stages")?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                StagePoints {
                    exact: row.get(1)?,
                    goal_diff: row.get(2)?,
                    direction: row.get(3)?,
                    other: row.get(4)?,
                },
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut rules = RuleTable::new();
    for (stage, points) in rows {
        rules.insert(stage, points);
    }
    Ok(rules)
}

/// Report a UNIQUE violation as a validation failure naming what clashed.
fn unique_violation(err: rusqlite::Error, what: &str) -> anyhow::Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            EngineError::Duplicate(what.to_string()).into()
        }
        _ => err.into(),
    }
}

fn count_goals(conn: &Connection, footballer_id: i64) -> Result<u32> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM goals WHERE footballer_id=?1",
        params![footballer_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

fn load_fixtures(conn: &Connection) -> Result<Vec<Fixture>> {
    let mut stmt = conn.prepare(
        "SELECT id, home_team_id, away_team_id, kickoff, stage, home_score, away_score
         FROM fixtures ORDER BY kickoff, id",
    )?;
    let fixtures = stmt
        .query_map([], map_fixture)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(fixtures)
}

fn load_fixture(conn: &Connection, id: i64) -> Result<Fixture> {
    conn.query_row(
        "SELECT id, home_team_id, away_team_id, kickoff, stage, home_score, away_score
         FROM fixtures WHERE id=?1",
        params![id],
        map_fixture,
    )
    .optional()?
    .ok_or_else(|| EngineError::NotFound("fixture", id).into())
}

fn load_team(conn: &Connection, id: i64) -> Result<Team> {
    conn.query_row(
        "SELECT id, name, short_name, is_champion FROM teams WHERE id=?1",
        params![id],
        |row| {
            Ok(Team {
                id: row.get(0)?,
                name: row.get(1)?,
                short_name: row.get(2)?,
                is_champion: row.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| EngineError::NotFound("team", id).into())
}

fn load_footballer(conn: &Connection, id: i64) -> Result<Footballer> {
    conn.query_row(
        "SELECT id, name, team_id, is_top_scorer FROM footballers WHERE id=?1",
        params![id],
        |row| {
            Ok(Footballer {
                id: row.get(0)?,
                name: row.get(1)?,
                team_id: row.get(2)?,
                is_top_scorer: row.get(3)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| EngineError::NotFound("footballer", id).into())
}

fn load_player(conn: &Connection, id: i64) -> Result<Player> {
    conn.query_row(
        "SELECT id, name, email FROM players WHERE id=?1",
        params![id],
        |row| {
            Ok(Player {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| EngineError::NotFound("player", id).into())
}

fn map_season_row(row: &rusqlite::Row) -> rusqlite::Result<(i64, i64, bool, bool)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn map_fixture(row: &rusqlite::Row) -> rusqlite::Result<Fixture> {
    Ok(Fixture {
        id: row.get(0)?,
        home_team_id: row.get(1)?,
        away_team_id: row.get(2)?,
        kickoff: row.get(3)?,
        stage: row.get(4)?,
        home_score: row.get(5)?,
        away_score: row.get(6)?,
    })
}

fn map_bet(row: &rusqlite::Row) -> rusqlite::Result<Bet> {
    Ok(Bet {
        id: row.get(0)?,
        fixture_id: row.get(1)?,
        player_id: row.get(2)?,
        home_score: row.get(3)?,
        away_score: row.get(4)?,
        points: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn map_extra_bet(row: &rusqlite::Row) -> rusqlite::Result<ExtraBet> {
    Ok(ExtraBet {
        id: row.get(0)?,
        player_id: row.get(1)?,
        footballer_id: row.get(2)?,
        team_id: row.get(3)?,
        points: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS stages (
    name        TEXT    PRIMARY KEY,
    exact       INTEGER NOT NULL DEFAULT 0 CHECK (exact >= 0),
    goal_diff   INTEGER NOT NULL DEFAULT 0 CHECK (goal_diff >= 0),
    direction   INTEGER NOT NULL DEFAULT 0 CHECK (direction >= 0),
    other       INTEGER NOT NULL DEFAULT 0 CHECK (other >= 0)
);

CREATE TABLE IF NOT EXISTS players (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL,
    email       TEXT    NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS teams (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL UNIQUE,
    short_name  TEXT    NOT NULL UNIQUE,
    is_champion INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS footballers (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    name          TEXT    NOT NULL UNIQUE,
    team_id       INTEGER NOT NULL,
    is_top_scorer INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (team_id) REFERENCES teams(id)
);

CREATE TABLE IF NOT EXISTS fixtures (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    home_team_id INTEGER NOT NULL,
    away_team_id INTEGER NOT NULL,
    kickoff      TEXT    NOT NULL,
    stage        TEXT    NOT NULL,
    home_score   INTEGER CHECK (home_score >= 0),
    away_score   INTEGER CHECK (away_score >= 0),
    CHECK (home_team_id != away_team_id),
    CHECK ((home_score IS NULL) = (away_score IS NULL)),
    FOREIGN KEY (home_team_id) REFERENCES teams(id),
    FOREIGN KEY (away_team_id) REFERENCES teams(id),
    FOREIGN KEY (stage) REFERENCES stages(name)
);

CREATE TABLE IF NOT EXISTS goals (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    footballer_id INTEGER NOT NULL,
    fixture_id    INTEGER NOT NULL,
    recorded_at   TEXT    NOT NULL,
    FOREIGN KEY (footballer_id) REFERENCES footballers(id),
    FOREIGN KEY (fixture_id) REFERENCES fixtures(id)
);

CREATE TABLE IF NOT EXISTS bets (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    fixture_id  INTEGER NOT NULL,
    player_id   INTEGER NOT NULL,
    home_score  INTEGER CHECK (home_score >= 0),
    away_score  INTEGER CHECK (away_score >= 0),
    points      INTEGER NOT NULL DEFAULT 0,
    updated_at  TEXT    NOT NULL,
    UNIQUE (fixture_id, player_id),
    FOREIGN KEY (fixture_id) REFERENCES fixtures(id),
    FOREIGN KEY (player_id) REFERENCES players(id)
);

CREATE TABLE IF NOT EXISTS extra_bets (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    player_id     INTEGER NOT NULL UNIQUE,
    footballer_id INTEGER NOT NULL,
    team_id       INTEGER NOT NULL,
    points        INTEGER NOT NULL DEFAULT 0,
    updated_at    TEXT    NOT NULL,
    FOREIGN KEY (player_id) REFERENCES players(id),
    FOREIGN KEY (footballer_id) REFERENCES footballers(id),
    FOREIGN KEY (team_id) REFERENCES teams(id)
);

CREATE INDEX IF NOT EXISTS idx_fixtures_kickoff ON fixtures(kickoff);
CREATE INDEX IF NOT EXISTS idx_bets_fixture ON bets(fixture_id);
CREATE INDEX IF NOT EXISTS idx_goals_footballer ON goals(footballer_id);
CREATE INDEX IF NOT EXISTS idx_extra_bets_footballer ON extra_bets(footballer_id);
CREATE INDEX IF NOT EXISTS idx_extra_bets_team ON extra_bets(team_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 11, 12, 0, 0).unwrap()
    }

    fn lookahead() -> Duration {
        Duration::days(3)
    }

    fn bonus(other: u32) -> StagePoints {
        StagePoints {
            other,
            ..Default::default()
        }
    }

    struct Seeded {
        db: Database,
        arg: i64,
        fra: i64,
        bra: i64,
        messi: i64,
        mbappe: i64,
        alice: i64,
        bob: i64,
    }

    fn seed() -> Seeded {
        let db = Database::open(":memory:").unwrap();
        db.upsert_rule(
            "Group Stage",
            StagePoints {
                exact: 5,
                goal_diff: 3,
                direction: 1,
                other: 0,
            },
        )
        .unwrap();
        db.upsert_rule("Goal", bonus(2)).unwrap();
        db.upsert_rule("Top Scorer", bonus(10)).unwrap();
        db.upsert_rule("World Champion", bonus(15)).unwrap();

        let arg = db.add_team("Argentina", "ARG").unwrap();
        let fra = db.add_team("France", "FRA").unwrap();
        let bra = db.add_team("Brazil", "BRA").unwrap();
        let messi = db.add_footballer("Messi", arg).unwrap();
        let mbappe = db.add_footballer("Mbappe", fra).unwrap();
        let alice = db.add_player("alice", "alice@example.com").unwrap();
        let bob = db.add_player("bob", "bob@example.com").unwrap();
        Seeded {
            db,
            arg,
            fra,
            bra,
            messi,
            mbappe,
            alice,
            bob,
        }
    }

    #[test]
    fn test_fixture_teams_must_differ() {
        let s = seed();
        let err = s
            .db
            .add_fixture(s.arg, s.arg, now() + Duration::days(1), "Group Stage")
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::InvalidFixture(_))
        ));
    }

    #[test]
    fn test_fixture_rejects_bonus_stage() {
        let s = seed();
        let err = s
            .db
            .add_fixture(s.arg, s.fra, now() + Duration::days(1), "Goal")
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::InvalidFixture(_))
        ));
    }

    #[test]
    fn test_result_rescores_all_bets() {
        let s = seed();
        let fixture = s
            .db
            .add_fixture(s.arg, s.fra, now() + Duration::days(1), "Group Stage")
            .unwrap();
        let bet = s
            .db
            .place_bet(s.alice, fixture, Some(Score::new(3, 3)), now(), lookahead())
            .unwrap();
        assert_eq!(bet.points, 0);
        s.db
            .place_bet(s.bob, fixture, Some(Score::new(1, 0)), now(), lookahead())
            .unwrap();

        assert_eq!(s.db.record_result(fixture, Score::new(3, 3)).unwrap(), 2);
        let alice_bets = s.db.list_player_bets(s.alice).unwrap();
        let bob_bets = s.db.list_player_bets(s.bob).unwrap();
        assert_eq!(alice_bets[0].points, 5);
        assert_eq!(bob_bets[0].points, 0);

        // Correcting the result rescores again.
        s.db.record_result(fixture, Score::new(2, 1)).unwrap();
        assert_eq!(s.db.list_player_bets(s.alice).unwrap()[0].points, 0);
        assert_eq!(s.db.list_player_bets(s.bob).unwrap()[0].points, 3);
    }

    #[test]
    fn test_bet_rejected_outside_window() {
        let s = seed();
        let fixture = s
            .db
            .add_fixture(s.arg, s.fra, now() + Duration::days(4), "Group Stage")
            .unwrap();
        let err = s
            .db
            .place_bet(s.alice, fixture, Some(Score::new(1, 0)), now(), lookahead())
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::FixtureNotAvailable(fixture))
        );
    }

    #[test]
    fn test_availability_uses_team_exclusivity() {
        let s = seed();
        let first = s
            .db
            .add_fixture(s.arg, s.fra, now() + Duration::days(1), "Group Stage")
            .unwrap();
        let second = s
            .db
            .add_fixture(s.fra, s.bra, now() + Duration::days(2), "Group Stage")
            .unwrap();
        let open = s.db.available_fixtures(now(), lookahead()).unwrap();
        assert_eq!(open.iter().map(|f| f.id).collect::<Vec<_>>(), vec![first]);
        assert!(!s.db.fixture_available(second, now(), lookahead()).unwrap());
    }

    #[test]
    fn test_missing_rule_leaves_points_unchanged() {
        let s = seed();
        s.db.upsert_rule("Final", StagePoints { exact: 8, goal_diff: 4, direction: 2, other: 0 })
            .unwrap();
        let fixture = s
            .db
            .add_fixture(s.arg, s.fra, now() + Duration::days(1), "Final")
            .unwrap();
        s.db
            .place_bet(s.alice, fixture, Some(Score::new(1, 0)), now(), lookahead())
            .unwrap();
        s.db.record_result(fixture, Score::new(1, 0)).unwrap();
        assert_eq!(s.db.list_player_bets(s.alice).unwrap()[0].points, 8);

        // Drop the row behind the stage's back and try to rescore.
        {
            let conn = s.db.conn().unwrap();
            conn.execute_batch("PRAGMA foreign_keys=OFF; DELETE FROM stages WHERE name='Final';")
                .unwrap();
        }
        let err = s.db.record_result(fixture, Score::new(0, 1)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::RuleNotFound("Final".into()))
        );
        assert_eq!(s.db.list_player_bets(s.alice).unwrap()[0].points, 8);
        assert_eq!(s.db.get_fixture(fixture).unwrap().home_score, Some(1));
    }

    #[test]
    fn test_goal_must_involve_fixture_team() {
        let s = seed();
        let fixture = s
            .db
            .add_fixture(s.fra, s.bra, now() + Duration::days(1), "Group Stage")
            .unwrap();
        let err = s.db.record_goal(s.messi, fixture, now()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::InvalidGoalEvent { .. })
        ));
    }

    #[test]
    fn test_season_facts_rescore_every_dependent_prediction() {
        let s = seed();
        let fixture = s
            .db
            .add_fixture(s.arg, s.fra, now() + Duration::days(1), "Group Stage")
            .unwrap();
        s.db.place_extra_bet(s.alice, s.messi, s.arg, now()).unwrap();
        s.db.place_extra_bet(s.bob, s.messi, s.fra, now()).unwrap();

        for _ in 0..3 {
            assert_eq!(s.db.record_goal(s.messi, fixture, now()).unwrap(), 2);
        }
        assert_eq!(s.db.set_top_scorer(s.messi, true).unwrap(), 2);
        assert_eq!(s.db.set_champion(s.arg, true).unwrap(), 1);

        let standings = s.db.standings().unwrap();
        let alice = standings.iter().find(|r| r.player_id == s.alice).unwrap();
        let bob = standings.iter().find(|r| r.player_id == s.bob).unwrap();
        assert_eq!(alice.extra_points, 3 * 2 + 10 + 15);
        assert_eq!(bob.extra_points, 3 * 2 + 10);
        assert_eq!(standings[0].player_id, s.alice);
    }

    #[test]
    fn test_season_bets_close_at_first_kickoff() {
        let s = seed();
        s.db
            .add_fixture(s.arg, s.fra, now() + Duration::days(1), "Group Stage")
            .unwrap();
        let err = s
            .db
            .place_extra_bet(s.alice, s.mbappe, s.fra, now() + Duration::days(2))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::SeasonBetsClosed)
        );
    }

    #[test]
    fn test_stage_rule_edit_rescores_its_fixtures() {
        let s = seed();
        let fixture = s
            .db
            .add_fixture(s.arg, s.fra, now() + Duration::days(1), "Group Stage")
            .unwrap();
        s.db
            .place_bet(s.alice, fixture, Some(Score::new(2, 0)), now(), lookahead())
            .unwrap();
        s.db.record_result(fixture, Score::new(2, 0)).unwrap();
        assert_eq!(s.db.list_player_bets(s.alice).unwrap()[0].points, 5);

        let rescored = s
            .db
            .upsert_rule(
                "Group Stage",
                StagePoints {
                    exact: 9,
                    goal_diff: 3,
                    direction: 1,
                    other: 0,
                },
            )
            .unwrap();
        assert_eq!(rescored, 1);
        assert_eq!(s.db.list_player_bets(s.alice).unwrap()[0].points, 9);
    }

    #[test]
    fn test_bonus_rule_edit_rescores_season_predictions() {
        let s = seed();
        let fixture = s
            .db
            .add_fixture(s.arg, s.fra, now() + Duration::days(1), "Group Stage")
            .unwrap();
        s.db.place_extra_bet(s.alice, s.messi, s.arg, now()).unwrap();
        s.db.place_extra_bet(s.bob, s.mbappe, s.fra, now()).unwrap();
        s.db.record_goal(s.messi, fixture, now()).unwrap();
        s.db.record_goal(s.messi, fixture, now()).unwrap();

        assert_eq!(s.db.upsert_rule("Goal", bonus(4)).unwrap(), 2);
        let standings = s.db.standings().unwrap();
        let alice = standings.iter().find(|r| r.player_id == s.alice).unwrap();
        assert_eq!(alice.extra_points, 2 * 4);
    }

    #[test]
    fn test_failed_rule_edit_is_rolled_back() {
        let s = seed();
        s.db.place_extra_bet(s.alice, s.messi, s.arg, now()).unwrap();
        {
            let conn = s.db.conn().unwrap();
            conn.execute("DELETE FROM stages WHERE name='World Champion'", [])
                .unwrap();
        }
        let err = s.db.upsert_rule("Goal", bonus(7)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::RuleNotFound("World Champion".into()))
        );
        let conn = s.db.conn().unwrap();
        let goal: u32 = conn
            .query_row("SELECT other FROM stages WHERE name='Goal'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(goal, 2);
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let s = seed();
        let err = s.db.add_team("Argentina", "ARX").unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::Duplicate("team with this name or code".into()))
        );
        let err = s.db.add_player("alice 2", "alice@example.com").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::Duplicate(_))
        ));
    }

    #[test]
    fn test_unknown_fixture_is_not_found() {
        let s = seed();
        let err = s.db.record_result(99, Score::new(1, 0)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<EngineError>(),
            Some(&EngineError::NotFound("fixture", 99))
        );
    }
}
