use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Season-to-date statistics for one team, snapshotted per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMetrics {
    pub points_per_game: f64,
    pub points_allowed: f64,
    pub total_yards: f64,
    pub yards_allowed: f64,
    /// Takeaways minus giveaways, season to date.
    pub turnover_diff: f64,
    /// 0.0–1.0; None when the stats feed has not published it yet.
    pub strength_of_schedule: Option<f64>,
}

/// Roster position codes as reported on the official injury report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionCode {
    QB,
    RB,
    WR,
    TE,
    OL,
    DL,
    LB,
    DB,
    K,
    P,
}

/// Game-status designation from the weekly injury report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InjuryStatus {
    Out,
    Doubtful,
    Questionable,
    Probable,
}

/// One entry on a team's injury report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryRecord {
    pub position: PositionCode,
    /// 1 (minor) through 5 (season-threatening).
    pub severity: u8,
    pub status: InjuryStatus,
}

/// A scheduled game as reported by the schedule feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub week: i32,
    pub home_team: String,
    pub away_team: String,
    pub is_completed: bool,
    pub kickoff: DateTime<Utc>,
}

/// One human-readable contributor to a prediction, in rule-evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionFactor {
    pub text: String,
    /// Data-source label shown in the UI, e.g. "Season statistics".
    pub source: String,
    pub reference: String,
}

/// Immutable output of the prediction engine for one matchup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Integer percentage; always sums to 100 with `away_win_probability`.
    pub home_win_probability: u8,
    pub away_win_probability: u8,
    /// 45–92; how decisively the internal scores diverged, not a
    /// calibrated probability.
    pub confidence: u8,
    /// At most 6 entries, insertion order = evaluation order.
    pub factors: Vec<PredictionFactor>,
}

/// A prediction persisted by the cache, with generation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPrediction {
    pub id: String,
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub generated_at: DateTime<Utc>,
    pub prediction: PredictionResult,
}

impl StoredPrediction {
    /// The side the engine favours: home on ties.
    pub fn predicted_winner(&self) -> &str {
        if self.prediction.home_win_probability >= self.prediction.away_win_probability {
            &self.home_team
        } else {
            &self.away_team
        }
    }

    pub fn predicted_probability(&self) -> u8 {
        self.prediction
            .home_win_probability
            .max(self.prediction.away_win_probability)
    }
}

/// The single live cache record; replaced wholesale on each generation batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionCacheEntry {
    /// Week number; negative values denote preseason weeks.
    pub week: i32,
    pub last_generated: DateTime<Utc>,
    pub predictions: Vec<StoredPrediction>,
}

impl PredictionCacheEntry {
    /// Staleness is derived at read time and never persisted.
    pub fn is_stale(&self, now: DateTime<Utc>, staleness_window: Duration) -> bool {
        now - self.last_generated > staleness_window
    }
}

/// A prediction paired with its (possibly still-unknown) real-world result.
///
/// Created pending when a prediction is generated; mutated exactly once when
/// the true winner becomes known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOutcome {
    pub prediction_id: String,
    pub game_id: String,
    pub home_team: String,
    pub away_team: String,
    pub predicted_winner: String,
    pub predicted_probability: u8,
    pub confidence: u8,
    pub actual_winner: Option<String>,
    /// Non-None iff `actual_winner` is non-None.
    pub is_correct: Option<bool>,
    pub week: i32,
    pub season: i32,
    pub is_preseason: bool,
    pub game_date: DateTime<Utc>,
    pub result_updated: Option<DateTime<Utc>>,
}

impl PredictionOutcome {
    pub fn is_decided(&self) -> bool {
        self.actual_winner.is_some()
    }
}

/// Aggregate accuracy for one (week, season, preseason) bucket, recomputed
/// from scratch whenever a result in that bucket changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyAccuracy {
    pub week: i32,
    pub season: i32,
    pub is_preseason: bool,
    pub total: u32,
    pub correct: u32,
    pub accuracy: f64,
    pub average_confidence: f64,
    /// Decided outcomes predicted with confidence >= 80.
    pub high_confidence_total: u32,
    pub high_confidence_correct: u32,
    /// Decided outcomes predicted with confidence < 60.
    pub low_confidence_total: u32,
    pub low_confidence_correct: u32,
}

/// Accuracy within one confidence band.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfidenceBucket {
    pub total: u32,
    pub correct: u32,
    pub accuracy: f64,
}

/// Run-length statistics over outcomes ordered by game date, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreakStats {
    /// Length of the leading same-correctness run.
    pub current: u32,
    /// Whether the leading run is a run of correct predictions.
    pub is_winning: bool,
    /// Longest same-correctness run anywhere in the sequence.
    pub longest: u32,
}

/// Accuracy over the most recent outcomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentTrend {
    pub last_5_accuracy: f64,
    pub last_10_accuracy: f64,
    /// Accuracy over outcomes whose game date falls within the last 7 days.
    pub last_7_days_accuracy: f64,
    pub last_7_days_total: u32,
}

/// Full accuracy report computed fresh from all decided outcomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub total: u32,
    pub correct: u32,
    pub accuracy: f64,
    pub average_confidence: f64,
    pub high_confidence: ConfidenceBucket,
    pub medium_confidence: ConfidenceBucket,
    pub low_confidence: ConfidenceBucket,
    pub streak: StreakStats,
    pub recent: RecentTrend,
}

/// One row of the (single-model) leaderboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub model_name: String,
    pub accuracy: f64,
    pub total_predictions: u32,
    pub correct_predictions: u32,
    pub average_confidence: f64,
    pub streak: u32,
    pub badge: Option<String>,
}
