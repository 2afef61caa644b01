use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tracing::debug;

use crate::db::models::{Game, InjuryRecord, InjuryStatus, PositionCode, TeamMetrics};

use super::{MetricsProvider, ProviderError};

/// Team-metrics provider backed by a JSON stats API.
///
/// Expected endpoints:
/// - `GET {base}/teams/{id}/stats`     → season statistics object
/// - `GET {base}/teams/{id}/injuries`  → `{"injuries": [...]}`
/// - `GET {base}/schedule?week={week}` → `{"games": [...]}`
pub struct HttpMetricsProvider {
    http: Client,
    /// Base URL; overridable so tests can point at a local server.
    base_url: String,
}

impl HttpMetricsProvider {
    pub fn new(base_url: &str) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(HttpMetricsProvider {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, ProviderError> {
        debug!("Fetching {}", url);
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(ProviderError::Status(resp.status()));
        }
        Ok(resp.json().await?)
    }

    fn position_from_str(s: &str) -> Option<PositionCode> {
        // Feeds report sub-positions; fold them onto the weight classes.
        match s.to_uppercase().as_str() {
            "QB" => Some(PositionCode::QB),
            "RB" | "FB" => Some(PositionCode::RB),
            "WR" => Some(PositionCode::WR),
            "TE" => Some(PositionCode::TE),
            "OL" | "OT" | "OG" | "C" => Some(PositionCode::OL),
            "DL" | "DE" | "DT" | "NT" => Some(PositionCode::DL),
            "LB" | "ILB" | "OLB" | "MLB" => Some(PositionCode::LB),
            "DB" | "CB" | "S" | "FS" | "SS" => Some(PositionCode::DB),
            "K" | "PK" => Some(PositionCode::K),
            "P" => Some(PositionCode::P),
            _ => None,
        }
    }

    fn status_from_str(s: &str) -> InjuryStatus {
        match s.to_lowercase().as_str() {
            "out" | "ir" | "injured reserve" => InjuryStatus::Out,
            "doubtful" => InjuryStatus::Doubtful,
            "questionable" => InjuryStatus::Questionable,
            _ => InjuryStatus::Probable,
        }
    }
}

#[async_trait]
impl MetricsProvider for HttpMetricsProvider {
    async fn team_metrics(&self, team_id: &str) -> Result<TeamMetrics, ProviderError> {
        let url = format!("{}/teams/{}/stats", self.base_url, team_id);
        let raw = self.fetch_json(&url).await?;
        if raw.is_null() {
            return Err(ProviderError::UnknownTeam(team_id.to_string()));
        }
        Ok(TeamMetrics {
            points_per_game: raw["pointsPerGame"].as_f64().unwrap_or(0.0),
            points_allowed: raw["pointsAllowed"].as_f64().unwrap_or(0.0),
            total_yards: raw["totalYards"].as_f64().unwrap_or(0.0),
            yards_allowed: raw["yardsAllowed"].as_f64().unwrap_or(0.0),
            turnover_diff: raw["turnoverDiff"].as_f64().unwrap_or(0.0),
            strength_of_schedule: raw["strengthOfSchedule"].as_f64(),
        })
    }

    async fn injuries(&self, team_id: &str) -> Result<Vec<InjuryRecord>, ProviderError> {
        let url = format!("{}/teams/{}/injuries", self.base_url, team_id);
        let raw = self.fetch_json(&url).await?;
        let entries = match raw["injuries"].as_array() {
            Some(a) => a,
            None => return Ok(vec![]),
        };
        let records = entries
            .iter()
            .filter_map(|entry| {
                let position = Self::position_from_str(entry["position"].as_str()?)?;
                let severity = entry["severity"].as_u64().unwrap_or(1).clamp(1, 5) as u8;
                let status =
                    Self::status_from_str(entry["status"].as_str().unwrap_or("probable"));
                Some(InjuryRecord {
                    position,
                    severity,
                    status,
                })
            })
            .collect();
        Ok(records)
    }

    async fn schedule(&self, week: i32) -> Result<Vec<Game>, ProviderError> {
        let url = format!("{}/schedule?week={}", self.base_url, week);
        let raw = self.fetch_json(&url).await?;
        let entries = match raw["games"].as_array() {
            Some(a) => a,
            None => return Ok(vec![]),
        };
        let games = entries
            .iter()
            .filter_map(|entry| {
                let id = entry["id"].as_str()?.to_string();
                let home_team = entry["homeTeamId"].as_str()?.to_string();
                let away_team = entry["awayTeamId"].as_str()?.to_string();
                let kickoff = entry["kickoff"]
                    .as_str()
                    .and_then(|s| s.parse::<DateTime<Utc>>().ok())
                    .unwrap_or_else(Utc::now);
                Some(Game {
                    id,
                    week: entry["week"].as_i64().unwrap_or(week as i64) as i32,
                    home_team,
                    away_team,
                    is_completed: entry["isCompleted"].as_bool().unwrap_or(false),
                    kickoff,
                })
            })
            .collect();
        Ok(games)
    }

    fn name(&self) -> &str {
        "http-stats"
    }
}
