//! JSON API and minimal HTML dashboard over the prediction cache and
//! outcome tracker.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::cache::PredictionCache;
use crate::db::models::{
    AccuracyStats, LeaderboardEntry, PredictionOutcome, StoredPrediction, WeeklyAccuracy,
};
use crate::tracker::OutcomeTracker;

#[derive(Clone)]
pub struct AppState {
    pub cache: PredictionCache,
    pub tracker: OutcomeTracker,
    pub week: i32,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/predictions", get(all_predictions))
        .route("/api/predictions/:game_id", get(one_prediction))
        .route("/api/stats", get(stats))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/outcomes", get(outcomes))
        .route("/api/weekly", get(weekly))
        .route("/api/refresh", post(refresh))
        .route("/api/results", post(submit_result))
        .route("/api/clear", post(clear))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn internal(e: anyhow::Error) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn all_predictions(
    State(state): State<AppState>,
) -> Result<Json<Vec<StoredPrediction>>, ApiError> {
    state
        .cache
        .get_all_predictions()
        .map(Json)
        .map_err(internal)
}

async fn one_prediction(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<StoredPrediction>, ApiError> {
    match state.cache.get_prediction(&game_id).map_err(internal)? {
        Some(prediction) => Ok(Json(prediction)),
        None => Err((
            StatusCode::NOT_FOUND,
            format!("no prediction for game '{game_id}'"),
        )),
    }
}

async fn stats(State(state): State<AppState>) -> Result<Json<AccuracyStats>, ApiError> {
    state.tracker.get_stats().map(Json).map_err(internal)
}

async fn leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    state.tracker.get_leaderboard().map(Json).map_err(internal)
}

async fn outcomes(
    State(state): State<AppState>,
) -> Result<Json<Vec<PredictionOutcome>>, ApiError> {
    state.tracker.get_outcomes().map(Json).map_err(internal)
}

async fn weekly(State(state): State<AppState>) -> Result<Json<Vec<WeeklyAccuracy>>, ApiError> {
    state.tracker.get_weekly().map(Json).map_err(internal)
}

#[derive(Serialize)]
struct RefreshResponse {
    started: bool,
}

async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshResponse>, ApiError> {
    info!("Manual refresh requested");
    let started = state
        .cache
        .refresh_now(state.week)
        .await
        .map_err(internal)?;
    Ok(Json(RefreshResponse { started }))
}

#[derive(Deserialize)]
struct ResultBody {
    game_id: String,
    winner: String,
}

async fn submit_result(
    State(state): State<AppState>,
    Json(body): Json<ResultBody>,
) -> Result<StatusCode, ApiError> {
    state
        .tracker
        .update_result(&body.game_id, &body.winner)
        .map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.cache.clear().map_err(internal)?;
    state.tracker.clear().map_err(internal)?;
    Ok(StatusCode::NO_CONTENT)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Gridcast</title>
<style>
body { font-family: monospace; background: #101418; color: #d8dee9; margin: 2em; }
h1 { color: #88c0d0; }
table { border-collapse: collapse; margin-bottom: 2em; }
td, th { border: 1px solid #2e3440; padding: 4px 10px; text-align: left; }
.bar { background: #1b2128; height: 8px; }
.bar > div { background: #a3be8c; height: 8px; }
button { background: #2e3440; color: #d8dee9; border: 1px solid #4c566a; padding: 4px 12px; cursor: pointer; }
</style>
</head>
<body>
<h1>Gridcast</h1>
<p id="summary">loading…</p>
<button onclick="refresh()">Refresh predictions</button>
<h2>Predictions</h2>
<table id="predictions"><tr><th>Game</th><th>Home</th><th>Away</th><th>Conf</th><th>Top factor</th></tr></table>
<h2>Accuracy</h2>
<table id="leaderboard"><tr><th>Model</th><th>Accuracy</th><th>Record</th><th>Streak</th><th>Badge</th></tr></table>
<script>
async function load() {
  const preds = await (await fetch('/api/predictions')).json();
  const stats = await (await fetch('/api/stats')).json();
  const board = await (await fetch('/api/leaderboard')).json();
  document.getElementById('summary').textContent =
    preds.length + ' cached predictions · ' + stats.correct + '/' + stats.total + ' correct';
  const pt = document.getElementById('predictions');
  pt.querySelectorAll('tr:not(:first-child)').forEach(r => r.remove());
  for (const p of preds) {
    const row = pt.insertRow();
    const top = p.prediction.factors.length ? p.prediction.factors[0].text : '';
    row.innerHTML = '<td>' + p.home_team + ' vs ' + p.away_team + '</td><td>' +
      p.prediction.home_win_probability + '%</td><td>' + p.prediction.away_win_probability +
      '%</td><td>' + p.prediction.confidence + '</td><td>' + top + '</td>';
  }
  const lt = document.getElementById('leaderboard');
  lt.querySelectorAll('tr:not(:first-child)').forEach(r => r.remove());
  for (const e of board) {
    const row = lt.insertRow();
    row.innerHTML = '<td>' + e.model_name + '</td><td>' + e.accuracy.toFixed(1) +
      '%</td><td>' + e.correct_predictions + '/' + e.total_predictions + '</td><td>' +
      e.streak + '</td><td>' + (e.badge || '') + '</td>';
  }
}
async function refresh() {
  await fetch('/api/refresh', { method: 'POST' });
  setTimeout(load, 1500);
}
load();
setInterval(load, 30000);
</script>
</body>
</html>
"#;
