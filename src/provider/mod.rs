use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::db::models::{Game, InjuryRecord, TeamMetrics};

pub mod http;

pub use http::HttpMetricsProvider;

/// Failure taxonomy for the stats/injury/schedule feed. Callers inside a
/// generation batch log these and skip the affected game; nothing here is
/// fatal to the process.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("stats request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("stats feed returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed stats response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unknown team '{0}'")]
    UnknownTeam(String),
}

/// Trait that every team-metrics provider must implement.
#[async_trait]
pub trait MetricsProvider: Send + Sync {
    /// Season-to-date statistics for one team.
    async fn team_metrics(&self, team_id: &str) -> Result<TeamMetrics, ProviderError>;

    /// Current injury report for one team (empty when healthy).
    async fn injuries(&self, team_id: &str) -> Result<Vec<InjuryRecord>, ProviderError>;

    /// All games scheduled for the given week (negative = preseason).
    async fn schedule(&self, week: i32) -> Result<Vec<Game>, ProviderError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}

/// Fixture provider serving pre-loaded data; used by tests and offline runs.
#[derive(Default)]
pub struct StaticProvider {
    metrics: HashMap<String, TeamMetrics>,
    injuries: HashMap<String, Vec<InjuryRecord>>,
    games: Vec<Game>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_team(
        mut self,
        team_id: &str,
        metrics: TeamMetrics,
        injuries: Vec<InjuryRecord>,
    ) -> Self {
        self.metrics.insert(team_id.to_string(), metrics);
        self.injuries.insert(team_id.to_string(), injuries);
        self
    }

    pub fn with_games(mut self, games: Vec<Game>) -> Self {
        self.games = games;
        self
    }
}

#[async_trait]
impl MetricsProvider for StaticProvider {
    async fn team_metrics(&self, team_id: &str) -> Result<TeamMetrics, ProviderError> {
        self.metrics
            .get(team_id)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownTeam(team_id.to_string()))
    }

    async fn injuries(&self, team_id: &str) -> Result<Vec<InjuryRecord>, ProviderError> {
        // A team absent from the fixture simply has no report.
        Ok(self.injuries.get(team_id).cloned().unwrap_or_default())
    }

    async fn schedule(&self, week: i32) -> Result<Vec<Game>, ProviderError> {
        Ok(self
            .games
            .iter()
            .filter(|g| g.week == week)
            .cloned()
            .collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}
