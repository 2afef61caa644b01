//! Outcome tracking: every generated prediction becomes a pending outcome,
//! real results flip outcomes to decided, and aggregate accuracy is always
//! recomputed fresh from the decided set — nothing is maintained
//! incrementally, so a late result correction can never leave a stale
//! aggregate behind.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::models::{
    AccuracyStats, ConfidenceBucket, Game, LeaderboardEntry, PredictionOutcome, RecentTrend,
    StoredPrediction, StreakStats, WeeklyAccuracy,
};
use crate::db::{self, keys, Store};

/// Confidence band boundaries shared by the stats report and the weekly
/// aggregates.
const HIGH_CONFIDENCE: u8 = 80;
const LOW_CONFIDENCE: u8 = 60;

/// Records predictions as pending outcomes and derives accuracy statistics.
#[derive(Clone)]
pub struct OutcomeTracker {
    store: Arc<dyn Store>,
    model_name: String,
    season: i32,
    is_preseason: bool,
}

impl OutcomeTracker {
    pub fn new(store: Arc<dyn Store>, model_name: &str, season: i32, is_preseason: bool) -> Self {
        OutcomeTracker {
            store,
            model_name: model_name.to_string(),
            season,
            is_preseason,
        }
    }

    /// Upsert (by prediction id) a pending outcome for a freshly generated
    /// prediction.
    pub fn record_outcome(&self, prediction: &StoredPrediction, game: &Game) -> Result<()> {
        let outcome = PredictionOutcome {
            prediction_id: prediction.id.clone(),
            game_id: prediction.game_id.clone(),
            home_team: prediction.home_team.clone(),
            away_team: prediction.away_team.clone(),
            predicted_winner: prediction.predicted_winner().to_string(),
            predicted_probability: prediction.predicted_probability(),
            confidence: prediction.prediction.confidence,
            actual_winner: None,
            is_correct: None,
            week: game.week,
            season: self.season,
            is_preseason: game.week < 0,
            game_date: game.kickoff,
            result_updated: None,
        };

        let mut outcomes = self.load_outcomes()?;
        match outcomes
            .iter_mut()
            .find(|o| o.prediction_id == outcome.prediction_id)
        {
            Some(existing) => *existing = outcome,
            None => outcomes.push(outcome),
        }
        db::write_record(self.store.as_ref(), keys::PREDICTION_OUTCOMES, &outcomes)?;
        Ok(())
    }

    /// Settle every outcome for the given game. Unknown game ids are a
    /// no-op; repeating the same call is a fixpoint.
    pub fn update_result(&self, game_id: &str, actual_winner: &str) -> Result<()> {
        let mut outcomes = self.load_outcomes()?;
        let now = Utc::now();
        let mut touched_buckets: Vec<(i32, i32, bool)> = Vec::new();

        for outcome in outcomes.iter_mut().filter(|o| o.game_id == game_id) {
            outcome.actual_winner = Some(actual_winner.to_string());
            outcome.is_correct = Some(outcome.predicted_winner == actual_winner);
            outcome.result_updated = Some(now);
            let bucket = (outcome.week, outcome.season, outcome.is_preseason);
            if !touched_buckets.contains(&bucket) {
                touched_buckets.push(bucket);
            }
        }

        if touched_buckets.is_empty() {
            debug!("No outcome recorded for game {}, ignoring result", game_id);
            return Ok(());
        }

        db::write_record(self.store.as_ref(), keys::PREDICTION_OUTCOMES, &outcomes)?;
        for (week, season, is_preseason) in touched_buckets {
            self.recompute_weekly(&outcomes, week, season, is_preseason)?;
        }
        info!("Result recorded for game {}: {}", game_id, actual_winner);
        Ok(())
    }

    /// Fresh accuracy report over all decided outcomes.
    pub fn get_stats(&self) -> Result<AccuracyStats> {
        let outcomes = self.load_outcomes()?;
        Ok(compute_stats(&outcomes, Utc::now()))
    }

    /// Single-entry leaderboard derived from the current stats; the
    /// persisted record is replaced on every call.
    pub fn get_leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let stats = self.get_stats()?;
        let entry = LeaderboardEntry {
            rank: 1,
            model_name: self.model_name.clone(),
            accuracy: stats.accuracy,
            total_predictions: stats.total,
            correct_predictions: stats.correct,
            average_confidence: stats.average_confidence,
            streak: stats.streak.current,
            badge: assign_badge(stats.accuracy, stats.total, stats.streak.longest),
        };
        let board = vec![entry];

        let mut boards: HashMap<String, Vec<LeaderboardEntry>> =
            db::read_record(self.store.as_ref(), keys::LEADERBOARD)?.unwrap_or_default();
        boards.insert(
            format!("{}:{}", self.season, self.is_preseason),
            board.clone(),
        );
        db::write_record(self.store.as_ref(), keys::LEADERBOARD, &boards)?;
        Ok(board)
    }

    /// All recorded outcomes, pending and decided, newest game first.
    pub fn get_outcomes(&self) -> Result<Vec<PredictionOutcome>> {
        let mut outcomes = self.load_outcomes()?;
        outcomes.sort_by(|a, b| b.game_date.cmp(&a.game_date));
        Ok(outcomes)
    }

    /// Weekly aggregates, every bucket recorded so far.
    pub fn get_weekly(&self) -> Result<Vec<WeeklyAccuracy>> {
        let buckets: HashMap<String, WeeklyAccuracy> =
            db::read_record(self.store.as_ref(), keys::WEEKLY_ACCURACY)?.unwrap_or_default();
        let mut weeks: Vec<WeeklyAccuracy> = buckets.into_values().collect();
        weeks.sort_by_key(|w| (w.season, w.is_preseason, w.week));
        Ok(weeks)
    }

    /// Discard all outcomes, weekly aggregates and leaderboard entries.
    pub fn clear(&self) -> Result<()> {
        self.store.delete(keys::PREDICTION_OUTCOMES)?;
        self.store.delete(keys::WEEKLY_ACCURACY)?;
        self.store.delete(keys::LEADERBOARD)?;
        info!("Outcome history cleared");
        Ok(())
    }

    fn load_outcomes(&self) -> Result<Vec<PredictionOutcome>> {
        Ok(db::read_record(self.store.as_ref(), keys::PREDICTION_OUTCOMES)?.unwrap_or_default())
    }

    /// Rebuild one (week, season, preseason) aggregate from scratch.
    fn recompute_weekly(
        &self,
        outcomes: &[PredictionOutcome],
        week: i32,
        season: i32,
        is_preseason: bool,
    ) -> Result<()> {
        let decided: Vec<&PredictionOutcome> = outcomes
            .iter()
            .filter(|o| {
                o.is_decided()
                    && o.week == week
                    && o.season == season
                    && o.is_preseason == is_preseason
            })
            .collect();

        let total = decided.len() as u32;
        let correct = decided
            .iter()
            .filter(|o| o.is_correct == Some(true))
            .count() as u32;
        let high: Vec<_> = decided
            .iter()
            .filter(|o| o.confidence >= HIGH_CONFIDENCE)
            .collect();
        let low: Vec<_> = decided
            .iter()
            .filter(|o| o.confidence < LOW_CONFIDENCE)
            .collect();

        let weekly = WeeklyAccuracy {
            week,
            season,
            is_preseason,
            total,
            correct,
            accuracy: percentage(correct, total),
            average_confidence: if decided.is_empty() {
                0.0
            } else {
                decided.iter().map(|o| f64::from(o.confidence)).sum::<f64>()
                    / decided.len() as f64
            },
            high_confidence_total: high.len() as u32,
            high_confidence_correct: high
                .iter()
                .filter(|o| o.is_correct == Some(true))
                .count() as u32,
            low_confidence_total: low.len() as u32,
            low_confidence_correct: low.iter().filter(|o| o.is_correct == Some(true)).count()
                as u32,
        };

        let mut buckets: HashMap<String, WeeklyAccuracy> =
            db::read_record(self.store.as_ref(), keys::WEEKLY_ACCURACY)?.unwrap_or_default();
        buckets.insert(format!("{}:{}:{}", week, season, is_preseason), weekly);
        db::write_record(self.store.as_ref(), keys::WEEKLY_ACCURACY, &buckets)?;
        Ok(())
    }
}

/// Ordered badge rules; the first rule whose thresholds are all met wins.
struct BadgeRule {
    min_predictions: u32,
    min_accuracy: f64,
    min_longest_streak: u32,
    label: &'static str,
}

const BADGE_RULES: &[BadgeRule] = &[
    BadgeRule { min_predictions: 50, min_accuracy: 80.0, min_longest_streak: 0, label: "Elite" },
    BadgeRule { min_predictions: 25, min_accuracy: 75.0, min_longest_streak: 0, label: "Gold" },
    BadgeRule { min_predictions: 10, min_accuracy: 70.0, min_longest_streak: 0, label: "Silver" },
    BadgeRule { min_predictions: 0, min_accuracy: 0.0, min_longest_streak: 10, label: "Hot Streak" },
    BadgeRule { min_predictions: 0, min_accuracy: 0.0, min_longest_streak: 5, label: "Streak Master" },
    BadgeRule { min_predictions: 20, min_accuracy: 0.0, min_longest_streak: 0, label: "Veteran" },
    BadgeRule { min_predictions: 5, min_accuracy: 0.0, min_longest_streak: 0, label: "Rising Star" },
];

/// Pure badge selection over (accuracy, total predictions, longest streak).
pub fn assign_badge(accuracy: f64, total_predictions: u32, longest_streak: u32) -> Option<String> {
    BADGE_RULES
        .iter()
        .find(|rule| {
            total_predictions >= rule.min_predictions
                && accuracy >= rule.min_accuracy
                && longest_streak >= rule.min_longest_streak
        })
        .map(|rule| rule.label.to_string())
}

fn percentage(correct: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(correct) / f64::from(total) * 100.0
    }
}

fn accuracy_over<'a, I>(outcomes: I) -> (u32, u32)
where
    I: IntoIterator<Item = &'a PredictionOutcome>,
{
    let mut total = 0;
    let mut correct = 0;
    for outcome in outcomes {
        total += 1;
        if outcome.is_correct == Some(true) {
            correct += 1;
        }
    }
    (correct, total)
}

/// Compute the full accuracy report from all outcomes. Pure so the streak
/// and trend logic is testable without a store.
pub fn compute_stats(outcomes: &[PredictionOutcome], now: DateTime<Utc>) -> AccuracyStats {
    let mut decided: Vec<&PredictionOutcome> =
        outcomes.iter().filter(|o| o.is_decided()).collect();
    if decided.is_empty() {
        return AccuracyStats::default();
    }
    // Newest game first; streaks and trend windows walk this order.
    decided.sort_by(|a, b| b.game_date.cmp(&a.game_date));

    let (correct, total) = accuracy_over(decided.iter().copied());
    let average_confidence =
        decided.iter().map(|o| f64::from(o.confidence)).sum::<f64>() / decided.len() as f64;

    let bucket = |lo: Option<u8>, hi: Option<u8>| -> ConfidenceBucket {
        let members = decided.iter().copied().filter(|o| {
            lo.map_or(true, |lo| o.confidence >= lo) && hi.map_or(true, |hi| o.confidence < hi)
        });
        let (correct, total) = accuracy_over(members);
        ConfidenceBucket {
            total,
            correct,
            accuracy: percentage(correct, total),
        }
    };

    let week_ago = now - Duration::days(7);
    let recent_window = |n: usize| {
        let (correct, total) = accuracy_over(decided.iter().copied().take(n));
        percentage(correct, total)
    };
    let (week_correct, week_total) =
        accuracy_over(decided.iter().copied().filter(|o| o.game_date >= week_ago));

    AccuracyStats {
        total,
        correct,
        accuracy: percentage(correct, total),
        average_confidence,
        high_confidence: bucket(Some(HIGH_CONFIDENCE), None),
        medium_confidence: bucket(Some(LOW_CONFIDENCE), Some(HIGH_CONFIDENCE)),
        low_confidence: bucket(None, Some(LOW_CONFIDENCE)),
        streak: compute_streaks(&decided),
        recent: RecentTrend {
            last_5_accuracy: recent_window(5),
            last_10_accuracy: recent_window(10),
            last_7_days_accuracy: percentage(week_correct, week_total),
            last_7_days_total: week_total,
        },
    }
}

/// Walk decided outcomes (newest first) and extract run-length stats.
///
/// The current streak is the maximal leading run of equal correctness; the
/// longest streak is the longest run anywhere (first occurrence wins ties).
fn compute_streaks(decided: &[&PredictionOutcome]) -> StreakStats {
    let Some(first) = decided.first() else {
        return StreakStats::default();
    };

    let leading = first.is_correct == Some(true);
    let mut current = 0u32;
    for outcome in decided {
        if (outcome.is_correct == Some(true)) == leading {
            current += 1;
        } else {
            break;
        }
    }

    let mut longest = 0u32;
    let mut run = 0u32;
    let mut run_correct = leading;
    for outcome in decided {
        let is_correct = outcome.is_correct == Some(true);
        if run > 0 && is_correct == run_correct {
            run += 1;
        } else {
            run = 1;
            run_correct = is_correct;
        }
        // Strict comparison keeps the first run on ties.
        if run > longest {
            longest = run;
        }
    }

    StreakStats {
        current,
        is_winning: leading,
        longest,
    }
}
