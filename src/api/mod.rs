use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::db::Database;
use crate::engine::{EngineError, Score, StagePoints};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Availability window applied to every prediction request
    pub lookahead: Duration,
}

type ApiError = (StatusCode, String);

/// Build the Axum router for the pool API.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/fixtures", get(fixtures_handler).post(create_fixture_handler))
        .route("/api/fixtures/available", get(available_fixtures_handler))
        .route("/api/fixtures/:id", get(fixture_handler))
        .route("/api/fixtures/:id/available", get(fixture_available_handler))
        .route("/api/fixtures/:id/result", post(record_result_handler))
        .route("/api/goals", post(record_goal_handler))
        .route("/api/bets", post(place_bet_handler))
        .route("/api/extra-bets", post(place_extra_bet_handler))
        .route("/api/players", post(create_player_handler))
        .route("/api/players/:id/bets", get(player_bets_handler))
        .route("/api/teams", post(create_team_handler))
        .route("/api/teams/:id/champion", post(set_champion_handler))
        .route("/api/footballers", post(create_footballer_handler))
        .route("/api/footballers/:id/top-scorer", post(set_top_scorer_handler))
        .route("/api/rules/:stage", put(upsert_rule_handler))
        .route("/api/standings", get(standings_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Validation failures surface as 422, unknown ids as 404, the rest as 500.
fn error_response(err: anyhow::Error) -> ApiError {
    let status = match err.downcast_ref::<EngineError>() {
        Some(EngineError::NotFound(..)) => StatusCode::NOT_FOUND,
        Some(_) => StatusCode::UNPROCESSABLE_ENTITY,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status != StatusCode::NOT_FOUND {
        warn!("request failed: {:#}", err);
    }
    (status, err.to_string())
}

fn invalid(err: EngineError) -> ApiError {
    error_response(err.into())
}

#[derive(Debug, Deserialize)]
pub struct NewFixture {
    pub home_team_id: i64,
    pub away_team_id: i64,
    pub kickoff: DateTime<Utc>,
    pub stage: String,
}

#[derive(Debug, Deserialize)]
pub struct ResultBody {
    pub home_score: i64,
    pub away_score: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewGoal {
    pub footballer_id: i64,
    pub fixture_id: i64,
}

/// A prediction; leaving either half out submits "no prediction".
#[derive(Debug, Deserialize)]
pub struct NewBet {
    pub player_id: i64,
    pub fixture_id: i64,
    pub home_score: Option<i64>,
    pub away_score: Option<i64>,
}

impl NewBet {
    fn prediction(&self) -> Result<Option<Score>, EngineError> {
        match (self.home_score, self.away_score) {
            (Some(home), Some(away)) => Score::try_new(home, away).map(Some),
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewExtraBet {
    pub player_id: i64,
    pub footballer_id: i64,
    pub team_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewPlayer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct NewTeam {
    pub name: String,
    pub short_name: String,
}

#[derive(Debug, Deserialize)]
pub struct NewFootballer {
    pub name: String,
    pub team_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct FlagBody {
    pub value: bool,
}

#[derive(Debug, Serialize)]
pub struct Created {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct Rescored {
    pub rescored: usize,
}

#[derive(Debug, Serialize)]
pub struct Availability {
    pub fixture_id: i64,
    pub available: bool,
}

/// GET /api/fixtures
async fn fixtures_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.list_fixtures().map(Json).map_err(error_response)
}

/// GET /api/fixtures/available
async fn available_fixtures_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .available_fixtures(Utc::now(), state.lookahead)
        .map(Json)
        .map_err(error_response)
}

/// GET /api/fixtures/:id
async fn fixture_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.get_fixture(id).map(Json).map_err(error_response)
}

/// GET /api/fixtures/:id/available
async fn fixture_available_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .fixture_available(id, Utc::now(), state.lookahead)
        .map(|available| {
            Json(Availability {
                fixture_id: id,
                available,
            })
        })
        .map_err(error_response)
}

/// POST /api/fixtures
async fn create_fixture_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewFixture>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .add_fixture(body.home_team_id, body.away_team_id, body.kickoff, &body.stage)
        .map(|id| (StatusCode::CREATED, Json(Created { id })))
        .map_err(error_response)
}

/// POST /api/fixtures/:id/result
async fn record_result_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<ResultBody>,
) -> Result<impl IntoResponse, ApiError> {
    let score = Score::try_new(body.home_score, body.away_score).map_err(invalid)?;
    state
        .db
        .record_result(id, score)
        .map(|rescored| Json(Rescored { rescored }))
        .map_err(error_response)
}

/// POST /api/goals
async fn record_goal_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewGoal>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .record_goal(body.footballer_id, body.fixture_id, Utc::now())
        .map(|rescored| Json(Rescored { rescored }))
        .map_err(error_response)
}

/// POST /api/bets
async fn place_bet_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewBet>,
) -> Result<impl IntoResponse, ApiError> {
    let prediction = body.prediction().map_err(invalid)?;
    state
        .db
        .place_bet(
            body.player_id,
            body.fixture_id,
            prediction,
            Utc::now(),
            state.lookahead,
        )
        .map(Json)
        .map_err(error_response)
}

/// POST /api/extra-bets
async fn place_extra_bet_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewExtraBet>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .place_extra_bet(body.player_id, body.footballer_id, body.team_id, Utc::now())
        .map(Json)
        .map_err(error_response)
}

/// POST /api/players
async fn create_player_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewPlayer>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .add_player(&body.name, &body.email)
        .map(|id| (StatusCode::CREATED, Json(Created { id })))
        .map_err(error_response)
}

/// GET /api/players/:id/bets
async fn player_bets_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.list_player_bets(id).map(Json).map_err(error_response)
}

/// POST /api/teams
async fn create_team_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewTeam>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .add_team(&body.name, &body.short_name)
        .map(|id| (StatusCode::CREATED, Json(Created { id })))
        .map_err(error_response)
}

/// POST /api/teams/:id/champion
async fn set_champion_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<FlagBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .set_champion(id, body.value)
        .map(|rescored| Json(Rescored { rescored }))
        .map_err(error_response)
}

/// POST /api/footballers
async fn create_footballer_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewFootballer>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .add_footballer(&body.name, body.team_id)
        .map(|id| (StatusCode::CREATED, Json(Created { id })))
        .map_err(error_response)
}

/// POST /api/footballers/:id/top-scorer
async fn set_top_scorer_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<FlagBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .set_top_scorer(id, body.value)
        .map(|rescored| Json(Rescored { rescored }))
        .map_err(error_response)
}

/// PUT /api/rules/:stage
async fn upsert_rule_handler(
    State(state): State<Arc<AppState>>,
    Path(stage): Path<String>,
    Json(points): Json<StagePoints>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .upsert_rule(&stage, points)
        .map(|rescored| Json(Rescored { rescored }))
        .map_err(error_response)
}

/// GET /api/standings
async fn standings_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.standings().map(Json).map_err(error_response)
}
