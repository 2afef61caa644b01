use anyhow::{bail, Result};
use clap::Parser;
use std::net::SocketAddr;

/// Runtime configuration, from CLI flags with environment fallbacks.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "gridcast",
    about = "NFL game outcome predictor with accuracy tracking",
    allow_negative_numbers = true
)]
pub struct Config {
    /// SQLite database path
    #[arg(long, env = "DATABASE_PATH", default_value = "gridcast.db")]
    pub database_path: String,

    /// Dashboard bind address
    #[arg(long, env = "DASHBOARD_ADDR", default_value = "0.0.0.0:8080")]
    pub dashboard_addr: String,

    /// Base URL of the team stats API
    #[arg(long, env = "METRICS_API_URL")]
    pub metrics_api_url: String,

    /// Season year
    #[arg(long, env = "SEASON", default_value_t = 2025)]
    pub season: i32,

    /// Active week (negative = preseason)
    #[arg(long, env = "WEEK", default_value_t = 1)]
    pub week: i32,

    /// Cached predictions older than this are regenerated
    #[arg(long, env = "STALENESS_HOURS", default_value_t = 12)]
    pub staleness_hours: i64,

    /// How often the background scheduler re-checks the cache
    #[arg(long, env = "REGEN_HOURS", default_value_t = 12)]
    pub regen_hours: u64,

    /// Pause between per-game provider calls during generation
    #[arg(long, env = "INTER_GAME_DELAY_MS", default_value_t = 250)]
    pub inter_game_delay_ms: u64,

    /// Name shown on the accuracy leaderboard
    #[arg(long, env = "MODEL_NAME", default_value = "gridcast-v2")]
    pub model_name: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.dashboard_addr.parse::<SocketAddr>().is_err() {
            bail!("invalid dashboard address '{}'", self.dashboard_addr);
        }
        if !self.metrics_api_url.starts_with("http://")
            && !self.metrics_api_url.starts_with("https://")
        {
            bail!("metrics API URL must be http(s): '{}'", self.metrics_api_url);
        }
        if self.week == 0 || !(-4..=23).contains(&self.week) {
            bail!("week {} is outside the NFL calendar", self.week);
        }
        if self.staleness_hours <= 0 {
            bail!("staleness window must be positive");
        }
        if self.regen_hours == 0 {
            bail!("regeneration period must be positive");
        }
        if self.model_name.trim().is_empty() {
            bail!("model name must not be empty");
        }
        Ok(())
    }

    pub fn is_preseason(&self) -> bool {
        self.week < 0
    }

    pub fn staleness(&self) -> chrono::Duration {
        chrono::Duration::hours(self.staleness_hours)
    }

    pub fn regen_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.regen_hours * 3600)
    }

    pub fn inter_game_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.inter_game_delay_ms)
    }
}
